pub mod api;
pub mod context;
pub mod egress;
pub mod events;
pub mod markup;
pub mod socket;

pub use api::{SlackApiClient, SlackMessage, SlackUser};
pub use context::{
    gather_context, ContextQuery, ContextSource, ConversationContext, MessageSummary,
    RequestUser, HISTORY_LIMIT, MEMBERS_LIMIT, THREAD_LIMIT,
};
pub use egress::{post_reply, ReplyPoster};
pub use events::{InboundEvent, MentionEvent, SlashCommand};
pub use markup::{strip_bot_mention, to_slack_links, to_slack_markdown};
pub use socket::{parse_socket_envelope, run_socket_mode, SocketFrame};

#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("slack api request failed: {0}")]
    ApiRequest(String),
    #[error("slack api responded with error `{0}`")]
    ApiResponse(String),
    #[error("slack socket error: {0}")]
    Socket(String),
}

impl SlackError {
    /// Short form recorded next to a context field: the Slack error code when
    /// the API answered, the transport error otherwise.
    pub fn detail(&self) -> String {
        match self {
            Self::ApiResponse(code) => code.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SlackError;

    #[test]
    fn detail_is_slack_code_or_transport_message() {
        let cases = [
            (SlackError::ApiResponse("not_in_channel".to_string()), "not_in_channel"),
            (
                SlackError::ApiRequest("connection refused".to_string()),
                "slack api request failed: connection refused",
            ),
            (
                SlackError::Socket("closed".to_string()),
                "slack socket error: closed",
            ),
        ];
        for (err, expected) in cases {
            let detail = err.detail();
            match err {
                SlackError::ApiResponse(_) | SlackError::ApiRequest(_) | SlackError::Socket(_) => {
                    assert_eq!(detail, expected)
                }
            }
        }
    }
}
