pub mod attempts;
pub mod diagnostics;
pub mod hangout;
pub mod mention;
pub mod pipeline;
pub mod prompt_render;
pub mod reply_format;

pub use attempts::{run_with_retry, AttemptError, AttemptOutcome, FailureReport};
pub use diagnostics::{classify_failure, Diagnosis};
pub use hangout::{format_search_conditions, plan_hangout, Candidate, HangoutPlan};
pub use mention::respond_mention;
pub use pipeline::{GenerationPayload, PipelineOptions, PipelineResult};
