use crate::channels::slack::ConversationContext;
use crate::orchestration::attempts::{run_with_retry, AttemptOutcome};
use crate::orchestration::pipeline::{GenerationPayload, PipelineOptions, PipelineResult};
use crate::orchestration::prompt_render::{render_mention_prompt, TEXT_ONLY_SUFFIX};
use crate::orchestration::reply_format::format_mention_reply;
use crate::provider::{parse_text_reply, ParseError, PromptRunner};

/// Formatting can strip a reply down to nothing, which counts as empty.
fn decode_reply(stdout: &str) -> Result<String, ParseError> {
    let formatted = format_mention_reply(&parse_text_reply(stdout)?);
    if formatted.is_empty() {
        return Err(ParseError::EmptyResponse);
    }
    Ok(formatted)
}

pub fn respond_mention<R>(
    runner: &R,
    request_text: &str,
    context: Option<&ConversationContext>,
    options: &PipelineOptions,
) -> PipelineResult
where
    R: PromptRunner + ?Sized,
{
    let prompt = render_mention_prompt(request_text, context);
    match run_with_retry(runner, &prompt, TEXT_ONLY_SUFFIX, decode_reply) {
        AttemptOutcome::Success { payload, .. } => {
            PipelineResult::success(payload.clone(), GenerationPayload::Reply(payload))
        }
        AttemptOutcome::Failed(report) => {
            let mut text = format!(
                "⚠️ Failed to generate a reply. Reason: {}",
                report.diagnosis.hint()
            );
            if options.verbose_diagnostics {
                text.push_str(&format!("\nDetails: {}", report.details_line()));
            }
            PipelineResult::failure(text, report)
        }
    }
}
