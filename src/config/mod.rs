pub mod error;
pub mod load;
pub mod settings;

pub use error::ConfigError;
pub use load::{apply_env_overrides, load_settings, CONFIG_PATH_ENV};
pub use settings::{
    Settings, SlackSettings, StartupCredentials, ToolSettings, DEFAULT_COMMAND_NAME,
};
