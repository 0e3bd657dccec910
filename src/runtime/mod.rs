use crate::channels::slack::{run_socket_mode, SlackApiClient, SlackError};
use crate::config::{ConfigError, Settings};
use serde_json::json;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

pub mod handlers;
pub mod logging;
pub mod state_paths;

pub use handlers::{spawn_handler, RequestHandler};
pub use logging::append_runtime_log;
pub use state_paths::{bootstrap_state_root, StatePaths, DEFAULT_STATE_ROOT_DIR};

pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to create runtime path {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Slack(#[from] SlackError),
}

/// Connects over Socket Mode and serves requests until `stop` is set or the
/// connection fails permanently.
pub fn run_bot(settings: &Settings, stop: &AtomicBool) -> Result<(), RuntimeError> {
    let credentials = settings.startup_credentials()?;
    let paths = settings.state_paths();
    bootstrap_state_root(&paths)?;

    let bot_client = SlackApiClient::new(credentials.bot_token);
    let app_client = SlackApiClient::new(credentials.app_token);
    let runner = settings.tool_runner();
    append_runtime_log(
        &paths,
        "info",
        "runtime.started",
        json!({
            "command": settings.command_name,
            "tool": runner.binary,
            "workdir": runner.cwd.display().to_string(),
        }),
    );

    let handler = Arc::new(RequestHandler {
        context_source: Some(bot_client.clone()),
        poster: bot_client,
        runner,
        paths: paths.clone(),
        options: settings.pipeline_options(),
    });
    run_socket_mode(&app_client, &paths, RECONNECT_BACKOFF, stop, |event| {
        spawn_handler(&handler, event);
    })?;
    Ok(())
}
