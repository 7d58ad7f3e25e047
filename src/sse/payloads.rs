//! Payload deserialization structs for stream frames.
//!
//! Internal structs used to decode the JSON `data:` payloads of the Coze
//! chat stream. Fields the client never reads are simply not declared.

use serde::Deserialize;

/// Payload of the `conversation.chat.*` lifecycle frames.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatInfoPayload {
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Payload of a `conversation.message.delta` frame.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DeltaPayload {
    #[serde(default)]
    pub role: Option<String>,
    /// Message type; answer deltas are the only ones rendered.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Payload of an `error` frame.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorPayload {
    pub code: ErrorCode,
    #[serde(default)]
    pub msg: String,
}

/// Coze reports error codes as numbers; tolerate strings as well.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorCode {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::Number(n) => write!(f, "{}", n),
            ErrorCode::Text(s) => write!(f, "{}", s),
        }
    }
}
