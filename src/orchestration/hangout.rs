use crate::channels::slack::ConversationContext;
use crate::orchestration::attempts::{run_with_retry, AttemptOutcome};
use crate::orchestration::pipeline::{GenerationPayload, PipelineOptions, PipelineResult};
use crate::orchestration::prompt_render::{render_hangout_prompt, JSON_ONLY_SUFFIX};
use crate::orchestration::reply_format::format_hangout_plan;
use crate::provider::output_parse::parse_json_payload;
use crate::provider::{ParseError, PromptRunner};
use serde::{Deserialize, Serialize};

pub const CANDIDATE_COUNT: usize = 3;
const UNSPECIFIED: &str = "unspecified";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    #[serde(default)]
    pub reason: String,
    pub budget_usd: f64,
    pub walk_min: f64,
    #[serde(default)]
    pub vibe: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HangoutPlan {
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub final_message: Option<String>,
}

pub fn decode_plan(stdout: &str) -> Result<HangoutPlan, ParseError> {
    let plan: HangoutPlan = parse_json_payload(stdout)?;
    if plan.candidates.len() != CANDIDATE_COUNT {
        return Err(ParseError::CandidateCount {
            expected: CANDIDATE_COUNT,
            found: plan.candidates.len(),
        });
    }
    Ok(plan)
}

/// Positional reading of `/nomikai <area> <budget> <people> <start>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConditions {
    pub area: String,
    pub budget: String,
    pub people: String,
    pub start: String,
}

pub fn parse_search_conditions(text: &str) -> SearchConditions {
    let mut tokens = text.split_whitespace();
    let mut next = || {
        tokens
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| UNSPECIFIED.to_string())
    };
    SearchConditions {
        area: next(),
        budget: next(),
        people: next(),
        start: next(),
    }
}

pub fn format_search_conditions(text: &str) -> String {
    let cond = parse_search_conditions(text);
    format!(
        "🔎 Search conditions: Area={} / Budget={} USD per person / People={} / Start={}",
        cond.area, cond.budget, cond.people, cond.start
    )
}

pub fn plan_hangout<R>(
    runner: &R,
    request_text: &str,
    context: Option<&ConversationContext>,
    options: &PipelineOptions,
) -> PipelineResult
where
    R: PromptRunner + ?Sized,
{
    let prompt = render_hangout_prompt(request_text, context);
    match run_with_retry(runner, &prompt, JSON_ONLY_SUFFIX, decode_plan) {
        AttemptOutcome::Success { payload, .. } => {
            PipelineResult::success(format_hangout_plan(&payload), GenerationPayload::Plan(payload))
        }
        AttemptOutcome::Failed(report) => {
            let mut text = format!(
                "⚠️ Failed to generate suggestions. Please shorten the request and try again (e.g. `{} Downtown 40 4 7:30pm`).\nReason: {}",
                options.command_name,
                report.diagnosis.hint()
            );
            if options.verbose_diagnostics {
                text.push_str(&format!("\nDetails: {}", report.details_line()));
            }
            PipelineResult::failure(text, report)
        }
    }
}
