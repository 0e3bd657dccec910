use crate::orchestration::attempts::AttemptError;
use serde::Serialize;

const TOOL_NOT_FOUND_NEEDLES: &[&str] = &[
    "enoent",
    "spawn codex",
    "binary not found",
    "command not found",
];
const AUTH_NEEDLES: &[&str] = &["not logged in", "login", "auth", "unauthorized"];
const TIMEOUT_NEEDLES: &[&str] = &["timed out", "timeout"];

/// Classified cause of a request whose attempts all failed. Variants are
/// listed in matching priority: the first whose keywords appear wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnosis {
    ToolNotFound,
    AuthRequired,
    TimedOut,
    ExecutionFailed,
}

impl Diagnosis {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToolNotFound => "tool_not_found",
            Self::AuthRequired => "auth_required",
            Self::TimedOut => "timed_out",
            Self::ExecutionFailed => "execution_failed",
        }
    }

    /// The only failure text shown to end users.
    pub fn hint(self) -> &'static str {
        match self {
            Self::ToolNotFound => {
                "Codex CLI not found. Make sure `codex` is installed and on PATH."
            }
            Self::AuthRequired => {
                "Codex CLI authentication required. Run `codex login` and try again."
            }
            Self::TimedOut => "Codex timed out. Shorten the request or increase the timeout.",
            Self::ExecutionFailed => "Codex execution failed. Check server stderr for details.",
        }
    }

    pub fn all_hints() -> [&'static str; 4] {
        [
            Self::ToolNotFound.hint(),
            Self::AuthRequired.hint(),
            Self::TimedOut.hint(),
            Self::ExecutionFailed.hint(),
        ]
    }
}

impl std::fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify_failure(message: &str, stderr: Option<&str>) -> Diagnosis {
    let haystack = format!("{message}\n{}", stderr.unwrap_or_default()).to_lowercase();
    let matches = |needles: &[&str]| needles.iter().any(|needle| haystack.contains(needle));
    if matches(TOOL_NOT_FOUND_NEEDLES) {
        Diagnosis::ToolNotFound
    } else if matches(AUTH_NEEDLES) {
        Diagnosis::AuthRequired
    } else if matches(TIMEOUT_NEEDLES) {
        Diagnosis::TimedOut
    } else {
        Diagnosis::ExecutionFailed
    }
}

fn classify_attempt(error: &AttemptError) -> Diagnosis {
    classify_failure(&error.to_string(), error.stderr())
}

/// Classifies the retry's failure, falling back to the first attempt when
/// the retry produced nothing more specific than a generic failure without
/// stderr.
pub fn diagnose_attempts(first: &AttemptError, second: &AttemptError) -> Diagnosis {
    let diagnosis = classify_attempt(second);
    let second_has_detail = second.stderr().is_some_and(|s| !s.trim().is_empty());
    if diagnosis == Diagnosis::ExecutionFailed && !second_has_detail {
        return classify_attempt(first);
    }
    diagnosis
}
