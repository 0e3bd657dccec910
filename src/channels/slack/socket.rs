use super::api::SlackApiClient;
use super::events::{InboundEvent, MentionEvent, SlashCommand};
use super::SlackError;
use crate::runtime::{append_runtime_log, StatePaths};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{connect, Message, WebSocket};

const SOCKET_IDLE_SLEEP: Duration = Duration::from_millis(40);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryClass {
    Retryable,
    NonRetryable,
}

#[derive(Debug, Deserialize)]
struct SocketEnvelope {
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct EventsApiPayload {
    #[serde(default)]
    event: Option<Value>,
}

/// One decoded Socket Mode frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketFrame {
    Hello,
    Disconnect,
    Event(InboundEvent),
    Ignored,
}

/// Decodes a Socket Mode text frame into the envelope id to acknowledge (if
/// any) and the frame it carried. Returns `None` for non-JSON input.
pub fn parse_socket_envelope(text: &str) -> Option<(Option<String>, SocketFrame)> {
    let envelope: SocketEnvelope = serde_json::from_str(text).ok()?;
    let frame = match envelope.kind.as_str() {
        "hello" => SocketFrame::Hello,
        "disconnect" => SocketFrame::Disconnect,
        "slash_commands" => envelope
            .payload
            .and_then(|payload| serde_json::from_value::<SlashCommand>(payload).ok())
            .map(|command| SocketFrame::Event(InboundEvent::Command(command)))
            .unwrap_or(SocketFrame::Ignored),
        "events_api" => envelope
            .payload
            .and_then(|payload| serde_json::from_value::<EventsApiPayload>(payload).ok())
            .and_then(|payload| payload.event)
            .filter(|event| event.get("type").and_then(Value::as_str) == Some("app_mention"))
            .and_then(|event| serde_json::from_value::<MentionEvent>(event).ok())
            .map(|mention| SocketFrame::Event(InboundEvent::Mention(mention)))
            .unwrap_or(SocketFrame::Ignored),
        _ => SocketFrame::Ignored,
    };
    Some((envelope.envelope_id, frame))
}

fn classify_socket_failure(message: &str) -> RetryClass {
    let lower = message.to_ascii_lowercase();
    if [
        "invalid_auth",
        "not_authed",
        "token_revoked",
        "account_inactive",
        "missing_scope",
        "403",
        "401",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
    {
        RetryClass::NonRetryable
    } else {
        RetryClass::Retryable
    }
}

fn format_socket_error(context: &str, detail: &str, class: RetryClass) -> String {
    let class = match class {
        RetryClass::Retryable => "retryable",
        RetryClass::NonRetryable => "non_retryable",
    };
    format!("{context} ({class}): {detail}")
}

fn should_stop(stop: &AtomicBool) -> bool {
    stop.load(Ordering::Relaxed)
}

fn sleep_reconnect(backoff: Duration, stop: &AtomicBool) -> bool {
    let mut remaining = backoff;
    while remaining > Duration::ZERO {
        if should_stop(stop) {
            return false;
        }
        let step = remaining.min(Duration::from_millis(25));
        thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
    !should_stop(stop)
}

fn set_socket_nonblocking(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
) -> Result<(), SlackError> {
    match socket.get_mut() {
        MaybeTlsStream::Plain(stream) => stream.set_nonblocking(true),
        MaybeTlsStream::Rustls(stream) => stream.sock.set_nonblocking(true),
        _ => Ok(()),
    }
    .map_err(|err| SlackError::Socket(format!("failed to configure socket mode stream: {err}")))
}

/// Runs the Socket Mode receive loop until `stop` is set, reconnecting after
/// disconnects. Authentication failures end the loop with an error.
pub fn run_socket_mode<F>(
    app_client: &SlackApiClient,
    paths: &StatePaths,
    reconnect_backoff: Duration,
    stop: &AtomicBool,
    mut on_event: F,
) -> Result<(), SlackError>
where
    F: FnMut(InboundEvent),
{
    while !should_stop(stop) {
        let url = match app_client.open_socket_connection_url() {
            Ok(url) => url,
            Err(err) => {
                let class = classify_socket_failure(&err.to_string());
                let message =
                    format_socket_error("socket url open failed", &err.to_string(), class);
                append_runtime_log(paths, "error", "socket.error", json!({ "error": message }));
                if class == RetryClass::NonRetryable {
                    return Err(SlackError::Socket(message));
                }
                if !sleep_reconnect(reconnect_backoff, stop) {
                    break;
                }
                continue;
            }
        };

        let (mut socket, _) = match connect(url.as_str()) {
            Ok(connection) => connection,
            Err(err) => {
                let class = classify_socket_failure(&err.to_string());
                let message = format_socket_error("socket connect failed", &err.to_string(), class);
                append_runtime_log(paths, "error", "socket.error", json!({ "error": message }));
                if class == RetryClass::NonRetryable {
                    return Err(SlackError::Socket(message));
                }
                if !sleep_reconnect(reconnect_backoff, stop) {
                    break;
                }
                continue;
            }
        };
        set_socket_nonblocking(&mut socket)?;
        append_runtime_log(paths, "info", "socket.connected", json!({}));

        read_connection(&mut socket, paths, stop, &mut on_event);
        let _ = socket.close(None);

        if !sleep_reconnect(reconnect_backoff, stop) {
            break;
        }
    }
    Ok(())
}

fn read_connection<F>(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    paths: &StatePaths,
    stop: &AtomicBool,
    on_event: &mut F,
) where
    F: FnMut(InboundEvent),
{
    while !should_stop(stop) {
        match socket.read() {
            Ok(Message::Text(text)) => {
                let Some((envelope_id, frame)) = parse_socket_envelope(text.as_str()) else {
                    continue;
                };
                if let Some(envelope_id) = envelope_id {
                    let ack = json!({ "envelope_id": envelope_id }).to_string();
                    let _ = socket.send(Message::Text(ack));
                }
                match frame {
                    SocketFrame::Event(event) => on_event(event),
                    SocketFrame::Disconnect => return,
                    SocketFrame::Hello | SocketFrame::Ignored => {}
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = socket.send(Message::Pong(payload));
            }
            Ok(Message::Close(_)) => return,
            Ok(_) => {}
            Err(tungstenite::Error::Io(err))
                if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
            {
                thread::sleep(SOCKET_IDLE_SLEEP);
            }
            Err(tungstenite::Error::ConnectionClosed) => return,
            Err(err) => {
                let class = classify_socket_failure(&err.to_string());
                let message = format_socket_error("socket read failed", &err.to_string(), class);
                append_runtime_log(paths, "error", "socket.error", json!({ "error": message }));
                return;
            }
        }
    }
}
