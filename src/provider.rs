use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod invocation;
pub mod output_parse;
pub mod runner;

pub use invocation::build_invocation;
pub use output_parse::{extract_json_payload, parse_text_reply, ParseError};
pub use runner::{run_tool, PromptRunner, ToolRunner};

pub const DEFAULT_TOOL_BINARY: &str = "codex";
pub const DEFAULT_TOOL_TIMEOUT_MS: u64 = 180_000;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("spawn {binary} failed: tool binary not found")]
    LaunchFailed {
        binary: String,
        log: Box<InvocationLog>,
    },
    #[error("{binary} exec timed out after {timeout_ms}ms")]
    Timeout {
        binary: String,
        timeout_ms: u64,
        stdout: String,
        stderr: String,
        log: Box<InvocationLog>,
    },
    #[error("{binary} command failed with exit code: {exit_code}")]
    ExecutionFailed {
        binary: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
        log: Box<InvocationLog>,
    },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProviderError {
    pub fn stdout(&self) -> Option<&str> {
        match self {
            Self::Timeout { stdout, .. } | Self::ExecutionFailed { stdout, .. } => {
                Some(stdout.as_str())
            }
            Self::LaunchFailed { .. } | Self::Io { .. } => None,
        }
    }

    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Timeout { stderr, .. } | Self::ExecutionFailed { stderr, .. } => {
                Some(stderr.as_str())
            }
            Self::LaunchFailed { .. } | Self::Io { .. } => None,
        }
    }

    pub fn log(&self) -> Option<&InvocationLog> {
        match self {
            Self::LaunchFailed { log, .. }
            | Self::Timeout { log, .. }
            | Self::ExecutionFailed { log, .. } => Some(log),
            Self::Io { .. } => None,
        }
    }
}

/// Optional `-c key=value` overrides passed to the tool. A `None` field
/// contributes no flag at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOptions {
    pub web_search: Option<bool>,
    pub model: Option<String>,
    pub reasoning_effort: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub binary: String,
    pub cwd: PathBuf,
    pub prompt: String,
    pub timeout: Duration,
    pub options: ToolOptions,
}

#[derive(Debug, Clone)]
pub struct InvocationSpec {
    pub binary: String,
    pub args: Vec<String>,
}

impl InvocationSpec {
    /// Command line with the trailing prompt elided, suitable for logs.
    pub fn command_form(&self) -> String {
        let flags = &self.args[..self.args.len().saturating_sub(1)];
        let mut form = self.binary.clone();
        for flag in flags {
            form.push(' ');
            form.push_str(flag);
        }
        form.push_str(" <prompt>");
        form
    }
}

/// What was run and how it ended; carried by every outcome so failures can be
/// logged next to the command that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationLog {
    pub command_form: String,
    pub working_directory: PathBuf,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub log: InvocationLog,
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> ProviderError {
    ProviderError::Io {
        path: path.display().to_string(),
        source,
    }
}
