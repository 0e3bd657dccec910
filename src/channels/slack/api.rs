use super::SlackError;
use serde::{Deserialize, Serialize};
use serde_json::json;

const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
pub const SLACK_API_BASE_ENV: &str = "NOMIKAI_SLACK_API_BASE";

#[derive(Debug, Clone)]
pub struct SlackApiClient {
    api_base: String,
    token: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackEnvelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    data: T,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenConnectionData {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MessagesData {
    #[serde(default)]
    messages: Vec<SlackMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct MembersData {
    #[serde(default)]
    members: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct UserInfoData {
    #[serde(default)]
    user: Option<SlackUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackMessage {
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profile: SlackUserProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackUserProfile {
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

fn unwrap_envelope<T>(envelope: SlackEnvelope<T>, method: &str) -> Result<T, SlackError> {
    if !envelope.ok {
        return Err(SlackError::ApiResponse(
            envelope
                .error
                .unwrap_or_else(|| format!("{method} failed")),
        ));
    }
    Ok(envelope.data)
}

impl SlackApiClient {
    pub fn new(token: impl Into<String>) -> Self {
        let api_base = std::env::var(SLACK_API_BASE_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string());
        Self::with_api_base(api_base, token)
    }

    pub fn with_api_base(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            token: token.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SlackError> {
        let mut url = self.endpoint(path);
        if !query.is_empty() {
            let encoded = query
                .iter()
                .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url = format!("{url}?{encoded}");
        }

        let response = ureq::get(&url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .call()
            .map_err(|e| SlackError::ApiRequest(e.to_string()))?;

        response
            .into_json::<T>()
            .map_err(|e| SlackError::ApiRequest(e.to_string()))
    }

    fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, SlackError> {
        let url = self.endpoint(path);
        let response = ureq::post(&url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .send_json(
                serde_json::to_value(body).map_err(|e| SlackError::ApiRequest(e.to_string()))?,
            )
            .map_err(|e| SlackError::ApiRequest(e.to_string()))?;

        response
            .into_json::<T>()
            .map_err(|e| SlackError::ApiRequest(e.to_string()))
    }

    pub fn conversation_history(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<SlackMessage>, SlackError> {
        let query = [
            ("channel", channel_id.to_string()),
            ("limit", limit.to_string()),
        ];
        let envelope: SlackEnvelope<MessagesData> = self.get("conversations.history", &query)?;
        Ok(unwrap_envelope(envelope, "conversations.history")?.messages)
    }

    pub fn conversation_members(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, SlackError> {
        let query = [
            ("channel", channel_id.to_string()),
            ("limit", limit.to_string()),
        ];
        let envelope: SlackEnvelope<MembersData> = self.get("conversations.members", &query)?;
        Ok(unwrap_envelope(envelope, "conversations.members")?.members)
    }

    pub fn user_info(&self, user_id: &str) -> Result<SlackUser, SlackError> {
        let query = [("user", user_id.to_string())];
        let envelope: SlackEnvelope<UserInfoData> = self.get("users.info", &query)?;
        unwrap_envelope(envelope, "users.info")?
            .user
            .ok_or_else(|| SlackError::ApiRequest("users.info returned no user".to_string()))
    }

    pub fn conversation_replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
        limit: usize,
    ) -> Result<Vec<SlackMessage>, SlackError> {
        let query = [
            ("channel", channel_id.to_string()),
            ("ts", thread_ts.to_string()),
            ("limit", limit.to_string()),
        ];
        let envelope: SlackEnvelope<MessagesData> = self.get("conversations.replies", &query)?;
        Ok(unwrap_envelope(envelope, "conversations.replies")?.messages)
    }

    pub fn post_message(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<(), SlackError> {
        let mut body = json!({
            "channel": channel_id,
            "text": text,
        });
        if let Some(thread_ts) = thread_ts.filter(|v| !v.trim().is_empty()) {
            body["thread_ts"] = json!(thread_ts);
        }
        let envelope: SlackEnvelope<serde_json::Value> =
            self.post_json("chat.postMessage", &body)?;
        unwrap_envelope(envelope, "chat.postMessage")?;
        Ok(())
    }

    /// Requires an app-level (`xapp-`) token.
    pub fn open_socket_connection_url(&self) -> Result<String, SlackError> {
        let envelope: SlackEnvelope<OpenConnectionData> =
            self.post_json("apps.connections.open", &json!({}))?;
        let url = unwrap_envelope(envelope, "apps.connections.open")?.url;
        if url.trim().is_empty() {
            return Err(SlackError::ApiRequest(
                "apps.connections.open returned no url".to_string(),
            ));
        }
        Ok(url)
    }
}
