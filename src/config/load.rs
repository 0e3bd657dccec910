use super::{ConfigError, Settings};
use std::path::PathBuf;

pub const CONFIG_PATH_ENV: &str = "NOMIKAI_CONFIG";

/// Switches recognise exactly `1`/`true` and `0`/`false`; any other value
/// leaves the setting as it was.
fn parse_switch(raw: &str) -> Option<bool> {
    match raw {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            expected: "a positive number of milliseconds",
        })
}

/// Overlays environment values onto `settings`. Blank values count as unset.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(value) = get("SLACK_BOT_TOKEN") {
        settings.slack.bot_token = Some(value);
    }
    if let Some(value) = get("SLACK_APP_TOKEN") {
        settings.slack.app_token = Some(value);
    }
    if let Some(value) = get("SLACK_SIGNING_SECRET") {
        settings.slack.signing_secret = Some(value);
    }
    if let Some(value) = get("PLANNER_REPO_DIR").or_else(|| get("CODEX_WORKDIR")) {
        settings.tool.workdir = Some(PathBuf::from(value));
    }
    if let Some(value) = get("CODEX_BIN") {
        settings.tool.binary = value;
    }
    if let Some(value) = get("CODEX_TIMEOUT_MS") {
        settings.tool.timeout_ms = parse_millis("CODEX_TIMEOUT_MS", &value)?;
    }
    if let Some(flag) = get("CODEX_WEB_SEARCH").and_then(|value| parse_switch(&value)) {
        settings.tool.web_search = Some(flag);
    }
    if let Some(value) = get("CODEX_MODEL") {
        settings.tool.model = Some(value.trim().to_string());
    }
    if let Some(value) = get("CODEX_REASONING_EFFORT") {
        settings.tool.reasoning_effort = Some(value.trim().to_string());
    }
    if let Some(flag) = get("PLANNER_DEBUG").and_then(|value| parse_switch(&value)) {
        settings.verbose_diagnostics = flag;
    }
    if let Some(value) = get("NOMIKAI_COMMAND") {
        settings.command_name = value.trim().to_string();
    }
    if let Some(value) = get("NOMIKAI_STATE_DIR") {
        settings.state_dir = PathBuf::from(value);
    }
    Ok(())
}

/// Optional YAML file named by `NOMIKAI_CONFIG`, then the process environment.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let mut settings = match std::env::var_os(CONFIG_PATH_ENV) {
        Some(path) if !path.is_empty() => Settings::from_path(&PathBuf::from(path))?,
        _ => Settings::default(),
    };
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    settings.validate()?;
    Ok(settings)
}
