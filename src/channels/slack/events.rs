use serde::Deserialize;

/// `/nomikai`-style slash command payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SlashCommand {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub channel_id: String,
}

/// `app_mention` event payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MentionEvent {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
}

impl MentionEvent {
    pub fn is_from_bot(&self) -> bool {
        self.bot_id
            .as_deref()
            .map(|id| !id.trim().is_empty())
            .unwrap_or(false)
    }

    /// Replies stay in the mention's thread, or start one under the mention.
    pub fn reply_thread_ts(&self) -> &str {
        self.thread_ts
            .as_deref()
            .filter(|ts| !ts.trim().is_empty())
            .unwrap_or(self.ts.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Command(SlashCommand),
    Mention(MentionEvent),
}
