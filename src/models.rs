//! Domain types shared across the client, session, and storage layers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User-supplied configuration plus the discovered conversation id.
///
/// Serialized with camelCase keys to match the persisted blob format:
/// `{apiKey, botId, userId, conversationId?}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatCredentials {
    pub api_key: String,
    pub bot_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl ChatCredentials {
    /// Create credentials with a freshly generated user id.
    pub fn new(api_key: impl Into<String>, bot_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            bot_id: bot_id.into(),
            user_id: generate_user_id(),
            conversation_id: None,
        }
    }
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One turn in the visible conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
        }
    }
}

/// JSON body for `POST /v3/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub bot_id: String,
    pub user_id: String,
    pub stream: bool,
    pub auto_save_history: bool,
    pub additional_messages: Vec<AdditionalMessage>,
}

impl ChatRequest {
    /// Build the request for one streamed user turn.
    pub fn user_turn(bot_id: &str, user_id: &str, content: &str) -> Self {
        Self {
            bot_id: bot_id.to_string(),
            user_id: user_id.to_string(),
            stream: true,
            auto_save_history: true,
            additional_messages: vec![AdditionalMessage {
                role: "user".to_string(),
                content: content.to_string(),
                content_type: "text".to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdditionalMessage {
    pub role: String,
    pub content: String,
    pub content_type: String,
}

/// `{code, data, msg}` envelope wrapping the v1 REST endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    // No serde(default) here: it would bound Deserialize on T: Default,
    // and a missing Option field already reads as None.
    pub data: Option<T>,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Conversation metadata from `GET /v1/conversation/retrieve`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub created_at: i64,
}

/// One message from `GET /v1/conversation/message/list`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageItem {
    #[serde(default)]
    pub id: String,
    pub role: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub content: String,
    /// Server-assigned creation timestamp; the list endpoint does not
    /// guarantee order, so consumers sort on this ascending.
    #[serde(default)]
    pub created_at: i64,
}

impl MessageItem {
    /// Whether this item belongs in the visible transcript: user turns and
    /// assistant answers only (no follow-ups, verbose traces, etc.).
    pub fn is_visible(&self) -> bool {
        self.role == "user" || (self.role == "assistant" && self.kind == "answer")
    }
}

/// Generate a locally unique user id of the shape
/// `user_<epoch-ms>_<7 chars base36>`.
///
/// Generated once per configuration and persisted; never regenerated for an
/// existing one.
pub fn generate_user_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let bytes = Uuid::new_v4().into_bytes();
    let mut eight = [0u8; 8];
    eight.copy_from_slice(&bytes[..8]);
    format!(
        "user_{}_{}",
        millis,
        to_base36(u64::from_le_bytes(eight), 7)
    )
}

fn to_base36(mut value: u64, len: usize) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = vec!['0'; len];
    for slot in out.iter_mut().rev() {
        *slot = DIGITS[(value % 36) as usize] as char;
        value /= 36;
    }
    out.into_iter().collect()
}
