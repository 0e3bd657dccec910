use super::{SlackApiClient, SlackError};

const OUTBOUND_CHUNK_CHARS: usize = 3500;

/// Outbound side of a conversation: one `chat.postMessage`-shaped call.
pub trait ReplyPoster {
    fn post(&self, channel_id: &str, thread_ts: Option<&str>, text: &str)
        -> Result<(), SlackError>;
}

impl ReplyPoster for SlackApiClient {
    fn post(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<(), SlackError> {
        self.post_message(channel_id, thread_ts, text)
    }
}

fn chunk_message(input: &str) -> Vec<String> {
    if input.is_empty() {
        return vec![String::new()];
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;
    for ch in input.chars() {
        if count >= OUTBOUND_CHUNK_CHARS {
            out.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Posts `text` in order, split into chunks Slack accepts. Stops at the first
/// failed chunk.
pub fn post_reply<P>(
    poster: &P,
    channel_id: &str,
    thread_ts: Option<&str>,
    text: &str,
) -> Result<(), SlackError>
where
    P: ReplyPoster + ?Sized,
{
    for chunk in chunk_message(text) {
        poster.post(channel_id, thread_ts, &chunk)?;
    }
    Ok(())
}
