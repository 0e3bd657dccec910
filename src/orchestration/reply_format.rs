use crate::channels::slack::to_slack_markdown;
use crate::orchestration::hangout::{HangoutPlan, CANDIDATE_COUNT};
use regex::Regex;
use std::sync::LazyLock;

static EMPTY_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\s*\)\s*").expect("valid parens regex"));
static NUMBERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s(\d+)\)").expect("valid numbered regex"));
static BULLET_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s•").expect("valid bullet regex"));
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid newline regex"));

pub fn format_hangout_plan(plan: &HangoutPlan) -> String {
    let mut blocks = vec![format!("🍻 *Hangout picks ({CANDIDATE_COUNT})*")];
    for (i, candidate) in plan.candidates.iter().enumerate() {
        let mut block = format!(
            "*{}. {}* (${} / {} min walk / {})\n• {}",
            i + 1,
            candidate.name,
            candidate.budget_usd,
            candidate.walk_min,
            candidate.vibe,
            to_slack_markdown(&candidate.reason)
        );
        if let Some(url) = candidate.url.as_deref().filter(|url| !url.trim().is_empty()) {
            block.push_str(&format!("\n• <{url}|Website>"));
        }
        blocks.push(block);
    }
    if let Some(message) = plan
        .final_message
        .as_deref()
        .filter(|message| !message.trim().is_empty())
    {
        blocks.push(format!(
            "\n📣 *Meetup message*\n{}",
            to_slack_markdown(message)
        ));
    }
    blocks.join("\n")
}

pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN.replace_all(text, "\n\n").into_owned()
}

pub fn format_mention_reply(text: &str) -> String {
    let out = to_slack_markdown(text);
    let out = EMPTY_PARENS.replace_all(&out, " ");
    let out = NUMBERED_MARKER.replace_all(&out, "\n${1})");
    let out = BULLET_MARKER.replace_all(&out, "\n•");
    collapse_blank_lines(&out).trim().to_string()
}
