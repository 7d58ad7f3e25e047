//! Typed events decoded from stream frames.
//!
//! The interpreter classifies each [`Frame`] by event name and decodes its
//! payload into a [`ChatEvent`]. Unknown event names map to [`ChatEvent::Skip`]
//! so protocol additions never break the client.

use serde::de::DeserializeOwned;

use crate::sse::parser::Frame;
use crate::sse::payloads::{ChatInfoPayload, DeltaPayload, ErrorPayload};

/// Lifecycle frames that may carry the conversation id.
const CHAT_INFO_EVENTS: [&str; 3] = [
    "conversation.chat.created",
    "conversation.chat.in_progress",
    "conversation.chat.completed",
];

pub const EVENT_MESSAGE_DELTA: &str = "conversation.message.delta";
pub const EVENT_ERROR: &str = "error";

/// A stream frame decoded into what the driver acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// Chat lifecycle frame; may carry the upstream conversation id.
    ConversationInfo { conversation_id: Option<String> },
    /// One qualifying assistant answer fragment.
    AnswerDelta(String),
    /// Terminal error reported by the upstream.
    ProtocolError { code: String, message: String },
    /// Frame recognized but irrelevant, or an unknown event name.
    Skip,
}

/// Errors from decoding a frame payload.
///
/// The driver treats `InvalidJson` as non-fatal: the upstream emits
/// heartbeat and keep-alive lines that do not parse.
#[derive(Debug, Clone, PartialEq)]
pub enum SseParseError {
    InvalidJson { event: String, source: String },
}

impl std::fmt::Display for SseParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SseParseError::InvalidJson { event, source } => {
                write!(f, "Invalid JSON for event '{}': {}", event, source)
            }
        }
    }
}

impl std::error::Error for SseParseError {}

fn decode<T: DeserializeOwned>(event: &str, data: &str) -> Result<T, SseParseError> {
    serde_json::from_str(data).map_err(|e| SseParseError::InvalidJson {
        event: event.to_string(),
        source: e.to_string(),
    })
}

/// Classify one frame and decode its payload.
pub fn parse_chat_event(frame: &Frame) -> Result<ChatEvent, SseParseError> {
    let event = frame.event.as_str();

    if CHAT_INFO_EVENTS.contains(&event) {
        let payload: ChatInfoPayload = decode(event, &frame.data)?;
        return Ok(ChatEvent::ConversationInfo {
            conversation_id: payload.conversation_id,
        });
    }

    match event {
        EVENT_MESSAGE_DELTA => {
            let payload: DeltaPayload = decode(event, &frame.data)?;
            let qualifies = payload.role.as_deref() == Some("assistant")
                && payload.kind.as_deref() == Some("answer");
            match payload.content {
                Some(content) if qualifies && !content.is_empty() => {
                    Ok(ChatEvent::AnswerDelta(content))
                }
                _ => Ok(ChatEvent::Skip),
            }
        }
        EVENT_ERROR => {
            let payload: ErrorPayload = decode(event, &frame.data)?;
            Ok(ChatEvent::ProtocolError {
                code: payload.code.to_string(),
                message: payload.msg,
            })
        }
        _ => Ok(ChatEvent::Skip),
    }
}
