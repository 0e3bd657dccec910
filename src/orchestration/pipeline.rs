use crate::orchestration::attempts::FailureReport;
use crate::orchestration::hangout::HangoutPlan;

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationPayload {
    Plan(HangoutPlan),
    Reply(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Appends attempt error messages to the user-facing hint.
    pub verbose_diagnostics: bool,
    /// Slash command used in the corrective example of the listing flow.
    pub command_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub ok: bool,
    pub text: String,
    pub payload: Option<GenerationPayload>,
    pub failure: Option<FailureReport>,
}

impl PipelineResult {
    pub(crate) fn success(text: String, payload: GenerationPayload) -> Self {
        Self {
            ok: true,
            text,
            payload: Some(payload),
            failure: None,
        }
    }

    pub(crate) fn failure(text: String, report: FailureReport) -> Self {
        Self {
            ok: false,
            text,
            payload: None,
            failure: Some(report),
        }
    }
}
