use super::ConfigError;
use crate::orchestration::PipelineOptions;
use crate::provider::{ToolOptions, ToolRunner, DEFAULT_TOOL_BINARY, DEFAULT_TOOL_TIMEOUT_MS};
use crate::runtime::{StatePaths, DEFAULT_STATE_ROOT_DIR};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_COMMAND_NAME: &str = "/nomikai";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SlackSettings {
    pub bot_token: Option<String>,
    pub app_token: Option<String>,
    /// Only needed by HTTP event delivery; Socket Mode ignores it.
    pub signing_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolSettings {
    pub binary: String,
    pub workdir: Option<PathBuf>,
    pub timeout_ms: u64,
    pub web_search: Option<bool>,
    pub model: Option<String>,
    pub reasoning_effort: Option<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            binary: DEFAULT_TOOL_BINARY.to_string(),
            workdir: None,
            timeout_ms: DEFAULT_TOOL_TIMEOUT_MS,
            web_search: None,
            model: None,
            reasoning_effort: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub slack: SlackSettings,
    pub tool: ToolSettings,
    pub verbose_diagnostics: bool,
    pub command_name: String,
    pub state_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            slack: SlackSettings::default(),
            tool: ToolSettings::default(),
            verbose_diagnostics: false,
            command_name: DEFAULT_COMMAND_NAME.to_string(),
            state_dir: PathBuf::from(DEFAULT_STATE_ROOT_DIR),
        }
    }
}

/// Credentials the Socket Mode bot cannot start without.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupCredentials {
    pub bot_token: String,
    pub app_token: String,
}

fn required(value: Option<&String>, key: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::MissingCredential { key })
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tool.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tool.timeout_ms".to_string(),
                value: "0".to_string(),
                expected: "a positive number of milliseconds",
            });
        }
        if !self.command_name.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                key: "command_name".to_string(),
                value: self.command_name.clone(),
                expected: "a slash command such as `/nomikai`",
            });
        }
        Ok(())
    }

    pub fn startup_credentials(&self) -> Result<StartupCredentials, ConfigError> {
        Ok(StartupCredentials {
            bot_token: required(self.slack.bot_token.as_ref(), "SLACK_BOT_TOKEN")?,
            app_token: required(self.slack.app_token.as_ref(), "SLACK_APP_TOKEN")?,
        })
    }

    pub fn tool_runner(&self) -> ToolRunner {
        let cwd = self
            .tool
            .workdir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        ToolRunner {
            binary: self.tool.binary.clone(),
            cwd,
            timeout: Duration::from_millis(self.tool.timeout_ms),
            options: ToolOptions {
                web_search: self.tool.web_search,
                model: self.tool.model.clone(),
                reasoning_effort: self.tool.reasoning_effort.clone(),
            },
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            verbose_diagnostics: self.verbose_diagnostics,
            command_name: self.command_name.clone(),
        }
    }

    pub fn state_paths(&self) -> StatePaths {
        StatePaths::new(&self.state_dir)
    }
}
