use super::api::{SlackApiClient, SlackMessage, SlackUser};
use super::SlackError;
use serde::Serialize;
use std::thread;

pub const HISTORY_LIMIT: usize = 20;
pub const MEMBERS_LIMIT: usize = 50;
pub const THREAD_LIMIT: usize = 20;

/// Read side of the chat platform used to enrich a request.
pub trait ContextSource {
    fn recent_messages(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<SlackMessage>, SlackError>;
    fn channel_members(&self, channel_id: &str, limit: usize) -> Result<Vec<String>, SlackError>;
    fn user_profile(&self, user_id: &str) -> Result<SlackUser, SlackError>;
    fn thread_replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
        limit: usize,
    ) -> Result<Vec<SlackMessage>, SlackError>;
}

impl ContextSource for SlackApiClient {
    fn recent_messages(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<SlackMessage>, SlackError> {
        self.conversation_history(channel_id, limit)
    }

    fn channel_members(&self, channel_id: &str, limit: usize) -> Result<Vec<String>, SlackError> {
        self.conversation_members(channel_id, limit)
    }

    fn user_profile(&self, user_id: &str) -> Result<SlackUser, SlackError> {
        self.user_info(user_id)
    }

    fn thread_replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
        limit: usize,
    ) -> Result<Vec<SlackMessage>, SlackError> {
        self.conversation_replies(channel_id, thread_ts, limit)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextQuery {
    pub channel_id: String,
    pub user_id: Option<String>,
    pub thread_ts: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSummary {
    pub user: String,
    pub text: String,
    pub ts: String,
    pub thread_ts: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestUser {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Best-effort snapshot of the conversation around a request. Each signal is
/// either present or replaced by the error that prevented fetching it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationContext {
    pub channel_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_messages: Option<Vec<MessageSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_messages_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_members: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_members_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_user: Option<RequestUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_user_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_messages: Option<Vec<MessageSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_messages_error: Option<String>,
}

fn slim_messages(messages: Vec<SlackMessage>, limit: usize) -> Vec<MessageSummary> {
    messages
        .into_iter()
        .take(limit)
        .map(|message| MessageSummary {
            user: message
                .user
                .or(message.bot_id)
                .unwrap_or_else(|| "unknown".to_string()),
            text: message.text.unwrap_or_default(),
            ts: message.ts.unwrap_or_default(),
            thread_ts: message.thread_ts.unwrap_or_default(),
        })
        .collect()
}

fn request_user(user_id: &str, user: SlackUser) -> RequestUser {
    RequestUser {
        id: user_id.to_string(),
        name: user.name,
        real_name: user.profile.real_name,
        display_name: user.profile.display_name,
        title: user.profile.title,
    }
}

fn split<T>(result: Result<T, String>) -> (Option<T>, Option<String>) {
    match result {
        Ok(value) => (Some(value), None),
        Err(err) => (None, Some(err)),
    }
}

fn joined<T>(handle: thread::ScopedJoinHandle<'_, Result<T, String>>) -> Result<T, String> {
    handle
        .join()
        .unwrap_or_else(|_| Err("context fetch panicked".to_string()))
}

/// Fetches history, membership, requester profile and (for threads) replies
/// concurrently. Returns `None` without a source or a channel id.
pub fn gather_context<S>(source: Option<&S>, query: &ContextQuery) -> Option<ConversationContext>
where
    S: ContextSource + Sync,
{
    let source = source?;
    let channel_id = query.channel_id.trim();
    if channel_id.is_empty() {
        return None;
    }
    let user_id = query.user_id.as_deref().filter(|v| !v.trim().is_empty());
    let thread_ts = query.thread_ts.as_deref().filter(|v| !v.trim().is_empty());

    let (history, members, user, replies) = thread::scope(|scope| {
        let history = scope.spawn(|| {
            source
                .recent_messages(channel_id, HISTORY_LIMIT)
                .map(|messages| slim_messages(messages, HISTORY_LIMIT))
                .map_err(|err| err.detail())
        });
        let members = scope.spawn(|| {
            source
                .channel_members(channel_id, MEMBERS_LIMIT)
                .map(|members| members.into_iter().take(MEMBERS_LIMIT).collect::<Vec<_>>())
                .map_err(|err| err.detail())
        });
        let user = user_id.map(|user_id| {
            scope.spawn(move || {
                source
                    .user_profile(user_id)
                    .map(|user| request_user(user_id, user))
                    .map_err(|err| err.detail())
            })
        });
        let replies = thread_ts.map(|thread_ts| {
            scope.spawn(move || {
                source
                    .thread_replies(channel_id, thread_ts, THREAD_LIMIT)
                    .map(|messages| slim_messages(messages, THREAD_LIMIT))
                    .map_err(|err| err.detail())
            })
        });
        (
            joined(history),
            joined(members),
            user.map(joined),
            replies.map(joined),
        )
    });

    let (recent_messages, recent_messages_error) = split(history);
    let (channel_members, channel_members_error) = split(members);
    let (request_user, request_user_error) = user.map(split).unwrap_or((None, None));
    let (thread_messages, thread_messages_error) = replies.map(split).unwrap_or((None, None));

    Some(ConversationContext {
        channel_id: channel_id.to_string(),
        recent_messages,
        recent_messages_error,
        channel_members,
        channel_members_error,
        request_user,
        request_user_error,
        thread_messages,
        thread_messages_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        fail_history: bool,
        fail_members: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn record(&self, call: &str) {
            self.calls.lock().expect("lock calls").push(call.to_string());
        }
    }

    impl ContextSource for FakeSource {
        fn recent_messages(
            &self,
            _channel_id: &str,
            limit: usize,
        ) -> Result<Vec<SlackMessage>, SlackError> {
            self.record("history");
            if self.fail_history {
                return Err(SlackError::ApiResponse("not_in_channel".to_string()));
            }
            Ok((0..limit + 5)
                .map(|i| SlackMessage {
                    ts: Some(format!("{i}.0")),
                    text: Some(format!("message {i}")),
                    bot_id: Some("B1".to_string()),
                    ..SlackMessage::default()
                })
                .collect())
        }

        fn channel_members(
            &self,
            _channel_id: &str,
            _limit: usize,
        ) -> Result<Vec<String>, SlackError> {
            self.record("members");
            if self.fail_members {
                return Err(SlackError::ApiRequest("connection refused".to_string()));
            }
            Ok((0..80).map(|i| format!("U{i}")).collect())
        }

        fn user_profile(&self, user_id: &str) -> Result<SlackUser, SlackError> {
            self.record("user");
            let mut user = SlackUser {
                id: Some(user_id.to_string()),
                name: Some("kai".to_string()),
                ..SlackUser::default()
            };
            user.profile.real_name = Some("Kai Tanaka".to_string());
            Ok(user)
        }

        fn thread_replies(
            &self,
            _channel_id: &str,
            thread_ts: &str,
            _limit: usize,
        ) -> Result<Vec<SlackMessage>, SlackError> {
            self.record("replies");
            Ok(vec![SlackMessage {
                ts: Some("2.0".to_string()),
                thread_ts: Some(thread_ts.to_string()),
                text: Some("in thread".to_string()),
                user: Some("U9".to_string()),
                bot_id: None,
            }])
        }
    }

    fn query(user: Option<&str>, thread: Option<&str>) -> ContextQuery {
        ContextQuery {
            channel_id: "C1".to_string(),
            user_id: user.map(str::to_string),
            thread_ts: thread.map(str::to_string),
        }
    }

    #[test]
    fn missing_source_or_channel_yields_no_context() {
        assert!(gather_context::<FakeSource>(None, &query(None, None)).is_none());

        let source = FakeSource::default();
        let mut blank = query(None, None);
        blank.channel_id = "  ".to_string();
        assert!(gather_context(Some(&source), &blank).is_none());
        assert!(source.calls.lock().expect("lock").is_empty());
    }

    #[test]
    fn history_failure_does_not_block_members() {
        let source = FakeSource {
            fail_history: true,
            ..FakeSource::default()
        };
        let context = gather_context(Some(&source), &query(None, None)).expect("context");
        assert_eq!(
            context.recent_messages_error.as_deref(),
            Some("not_in_channel")
        );
        assert!(context.recent_messages.is_none());
        assert_eq!(context.channel_members.as_ref().map(Vec::len), Some(50));
        assert!(context.channel_members_error.is_none());
    }

    #[test]
    fn members_failure_keeps_transport_error_text() {
        let source = FakeSource {
            fail_members: true,
            ..FakeSource::default()
        };
        let context = gather_context(Some(&source), &query(None, None)).expect("context");
        assert_eq!(
            context.channel_members_error.as_deref(),
            Some("slack api request failed: connection refused")
        );
        assert_eq!(
            context.recent_messages.as_ref().map(Vec::len),
            Some(HISTORY_LIMIT)
        );
    }

    #[test]
    fn history_is_slimmed_with_author_fallback() {
        let source = FakeSource::default();
        let context = gather_context(Some(&source), &query(None, None)).expect("context");
        let first = &context.recent_messages.expect("messages")[0];
        assert_eq!(first.user, "B1");
        assert_eq!(first.text, "message 0");
        assert_eq!(first.thread_ts, "");
    }

    #[test]
    fn user_and_thread_fetches_only_run_when_requested() {
        let source = FakeSource::default();
        let context = gather_context(Some(&source), &query(None, None)).expect("context");
        assert!(context.request_user.is_none());
        assert!(context.thread_messages.is_none());
        let mut calls = source.calls.lock().expect("lock").clone();
        calls.sort();
        assert_eq!(calls, vec!["history", "members"]);

        let source = FakeSource::default();
        let context =
            gather_context(Some(&source), &query(Some("U1"), Some("1.0"))).expect("context");
        let user = context.request_user.expect("user");
        assert_eq!(user.id, "U1");
        assert_eq!(user.real_name.as_deref(), Some("Kai Tanaka"));
        let thread = context.thread_messages.expect("thread");
        assert_eq!(thread[0].thread_ts, "1.0");
    }

    #[test]
    fn absent_fields_are_omitted_when_serialized() {
        let context = ConversationContext {
            channel_id: "C1".to_string(),
            channel_members: Some(vec!["U1".to_string()]),
            ..ConversationContext::default()
        };
        let rendered = serde_json::to_string(&context).expect("serialize");
        assert_eq!(rendered, r#"{"channel_id":"C1","channel_members":["U1"]}"#);
    }
}
