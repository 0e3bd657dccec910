use crate::orchestration::diagnostics::{diagnose_attempts, Diagnosis};
use crate::provider::{InvocationLog, ParseError, PromptRunner, ProviderError};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("{source}")]
    Parse {
        source: ParseError,
        stdout: String,
        stderr: String,
        log: Box<InvocationLog>,
    },
}

impl AttemptError {
    pub fn stdout(&self) -> Option<&str> {
        match self {
            Self::Provider(err) => err.stdout(),
            Self::Parse { stdout, .. } => Some(stdout.as_str()),
        }
    }

    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Provider(err) => err.stderr(),
            Self::Parse { stderr, .. } => Some(stderr.as_str()),
        }
    }

    pub fn log(&self) -> Option<&InvocationLog> {
        match self {
            Self::Provider(err) => err.log(),
            Self::Parse { log, .. } => Some(log),
        }
    }
}

/// Operator-facing record of a request whose both attempts failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    pub first_error: String,
    pub second_error: String,
    pub diagnosis: Diagnosis,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    /// The most recent attempt's invocation, when one was launched.
    pub invocation: Option<InvocationLog>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

impl FailureReport {
    pub fn from_attempts(first: &AttemptError, second: &AttemptError) -> Self {
        Self {
            first_error: first.to_string(),
            second_error: second.to_string(),
            diagnosis: diagnose_attempts(first, second),
            stdout: non_empty(second.stdout()).or_else(|| non_empty(first.stdout())),
            stderr: non_empty(second.stderr()).or_else(|| non_empty(first.stderr())),
            invocation: second.log().or_else(|| first.log()).cloned(),
        }
    }

    pub fn details_line(&self) -> String {
        format!(
            "attempt 1: {} | attempt 2: {}",
            self.first_error, self.second_error
        )
    }
}

#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Success { payload: T, invocations: u32 },
    Failed(FailureReport),
}

enum AttemptState {
    FirstAttempt,
    RetryAttempt { first: AttemptError },
}

pub fn retry_prompt(prompt: &str, corrective_suffix: &str) -> String {
    format!("{prompt}{corrective_suffix}")
}

fn attempt<R, T, F>(runner: &R, prompt: &str, parse: &F) -> Result<T, AttemptError>
where
    R: PromptRunner + ?Sized,
    F: Fn(&str) -> Result<T, ParseError>,
{
    let outcome = runner.run_prompt(prompt)?;
    parse(&outcome.stdout).map_err(|source| AttemptError::Parse {
        source,
        stdout: outcome.stdout,
        stderr: outcome.stderr,
        log: Box::new(outcome.log),
    })
}

/// Runs `prompt`, and on any execution or parse failure runs it exactly once
/// more with `corrective_suffix` appended. Never invokes the runner more than
/// twice.
pub fn run_with_retry<R, T, F>(
    runner: &R,
    prompt: &str,
    corrective_suffix: &str,
    parse: F,
) -> AttemptOutcome<T>
where
    R: PromptRunner + ?Sized,
    F: Fn(&str) -> Result<T, ParseError>,
{
    let mut state = AttemptState::FirstAttempt;
    loop {
        state = match state {
            AttemptState::FirstAttempt => match attempt(runner, prompt, &parse) {
                Ok(payload) => {
                    return AttemptOutcome::Success {
                        payload,
                        invocations: 1,
                    }
                }
                Err(first) => AttemptState::RetryAttempt { first },
            },
            AttemptState::RetryAttempt { first } => {
                let prompt = retry_prompt(prompt, corrective_suffix);
                return match attempt(runner, &prompt, &parse) {
                    Ok(payload) => AttemptOutcome::Success {
                        payload,
                        invocations: 2,
                    },
                    Err(second) => {
                        AttemptOutcome::Failed(FailureReport::from_attempts(&first, &second))
                    }
                };
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{parse_text_reply, ExecutionOutcome, InvocationLog};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    enum Scripted {
        Stdout(&'static str),
        Exit(i32, &'static str),
    }

    fn log(exit_code: i32, elapsed_ms: u64) -> InvocationLog {
        InvocationLog {
            command_form: "codex exec <prompt>".to_string(),
            working_directory: PathBuf::from("."),
            exit_code: Some(exit_code),
            timed_out: false,
            elapsed_ms,
        }
    }

    struct ScriptedRunner {
        script: RefCell<VecDeque<Scripted>>,
        prompts: RefCell<Vec<String>>,
    }

    impl ScriptedRunner {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: RefCell::new(script.into()),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl PromptRunner for ScriptedRunner {
        fn run_prompt(&self, prompt: &str) -> Result<ExecutionOutcome, ProviderError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            match self.script.borrow_mut().pop_front() {
                Some(Scripted::Stdout(stdout)) => Ok(ExecutionOutcome {
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                    log: log(0, 1),
                }),
                Some(Scripted::Exit(code, stderr)) => Err(ProviderError::ExecutionFailed {
                    binary: "codex".to_string(),
                    exit_code: code,
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                    log: Box::new(log(code, 2)),
                }),
                None => panic!("runner invoked more times than scripted"),
            }
        }
    }

    #[test]
    fn first_success_uses_one_invocation() {
        let runner = ScriptedRunner::new(vec![Scripted::Stdout("hello")]);
        let outcome = run_with_retry(&runner, "P", "!", parse_text_reply);
        match outcome {
            AttemptOutcome::Success {
                payload,
                invocations,
            } => {
                assert_eq!(payload, "hello");
                assert_eq!(invocations, 1);
            }
            AttemptOutcome::Failed(report) => panic!("unexpected failure: {report:?}"),
        }
        assert_eq!(runner.prompts.borrow().len(), 1);
    }

    #[test]
    fn retry_prompt_is_original_plus_suffix() {
        let runner = ScriptedRunner::new(vec![Scripted::Stdout("  "), Scripted::Stdout("ok")]);
        let outcome = run_with_retry(&runner, "PROMPT", "\n\nSTRICT", parse_text_reply);
        assert!(matches!(
            outcome,
            AttemptOutcome::Success { invocations: 2, .. }
        ));
        let prompts = runner.prompts.borrow();
        assert_eq!(prompts.as_slice(), ["PROMPT", "PROMPT\n\nSTRICT"]);
    }

    #[test]
    fn two_failures_stop_after_second_invocation() {
        let runner = ScriptedRunner::new(vec![
            Scripted::Exit(1, "Error: not logged in"),
            Scripted::Exit(1, ""),
        ]);
        let outcome = run_with_retry(&runner, "P", "!", parse_text_reply);
        let AttemptOutcome::Failed(report) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(runner.prompts.borrow().len(), 2);
        assert!(report.first_error.contains("exit code: 1"));
        assert_eq!(report.diagnosis, Diagnosis::AuthRequired);
        assert_eq!(report.stderr.as_deref(), Some("Error: not logged in"));
        assert_eq!(report.invocation, Some(log(1, 2)));
    }

    #[test]
    fn parse_failures_keep_captured_output() {
        let runner = ScriptedRunner::new(vec![
            Scripted::Stdout("chatter only"),
            Scripted::Stdout("still chatter"),
        ]);
        let outcome = run_with_retry(&runner, "P", "!", |stdout| {
            crate::provider::extract_json_payload(stdout)
        });
        let AttemptOutcome::Failed(report) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(report.second_error, ParseError::NoPayloadFound.to_string());
        assert_eq!(report.stdout.as_deref(), Some("still chatter"));
        assert_eq!(report.diagnosis, Diagnosis::ExecutionFailed);
        let invocation = report.invocation.expect("invocation of the parsed run");
        assert_eq!(invocation.exit_code, Some(0));
        assert_eq!(invocation.command_form, "codex exec <prompt>");
    }
}
