use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no JSON object found in tool output")]
    NoPayloadFound,
    #[error("malformed JSON payload: {0}")]
    MalformedPayload(String),
    #[error("empty response from tool")]
    EmptyResponse,
    #[error("expected exactly {expected} candidates, got {found}")]
    CandidateCount { expected: usize, found: usize },
}

fn payload_slice(stdout: &str) -> Result<&str, ParseError> {
    let start = stdout.find('{').ok_or(ParseError::NoPayloadFound)?;
    let end = stdout.rfind('}').ok_or(ParseError::NoPayloadFound)?;
    if end <= start {
        return Err(ParseError::NoPayloadFound);
    }
    Ok(&stdout[start..=end])
}

/// Takes everything between the first `{` and the last `}` of the output,
/// ignoring any chatter the tool printed around the object.
pub fn extract_json_payload(stdout: &str) -> Result<Value, ParseError> {
    parse_json_payload(stdout)
}

pub fn parse_json_payload<T: DeserializeOwned>(stdout: &str) -> Result<T, ParseError> {
    let slice = payload_slice(stdout)?;
    serde_json::from_str(slice).map_err(|err| ParseError::MalformedPayload(err.to_string()))
}

pub fn parse_text_reply(stdout: &str) -> Result<String, ParseError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyResponse);
    }
    Ok(trimmed.to_string())
}
