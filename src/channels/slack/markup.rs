//! Markdown to Slack mrkdwn substitutions.

use regex::Regex;
use std::sync::LazyLock;

static LEADING_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<@[^>]+>\s*").expect("valid mention regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s{0,3}#{1,6}\s+(.+)$").expect("valid heading regex"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold regex"));
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-*]\s+").expect("valid bullet regex"));
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\((https?://[^)]+)\)").expect("valid link regex")
});

pub fn strip_bot_mention(text: &str) -> String {
    LEADING_MENTION.replace(text, "").trim().to_string()
}

pub fn to_slack_links(text: &str) -> String {
    LINK.replace_all(text, "<${2}|${1}>").into_owned()
}

pub fn to_slack_markdown(text: &str) -> String {
    let out = HEADING.replace_all(text, "*${1}*");
    let out = BOLD.replace_all(&out, "*${1}*");
    let out = BULLET.replace_all(&out, "• ");
    to_slack_links(&out).trim().to_string()
}
