//! Decoder for the Coze chat streaming protocol.
//!
//! The upstream emits an SSE-like text stream over chunked HTTP:
//! - `event: <name>` - event type line
//! - `data: <json>` - payload line; completes a frame immediately
//! - a JSON string literal `"[DONE]"` payload signals end-of-content
//!
//! Unlike standard SSE there is no blank-line dispatch and no multi-line
//! data: every `data:` line pairs with the most recent `event:` line.
//!
//! # Module structure
//! - `parser` - byte-safe line buffering and frame emission
//! - `events` - typed [`ChatEvent`] and the frame interpreter
//! - `payloads` - internal payload deserialization structs

mod events;
mod parser;
mod payloads;

pub use events::{parse_chat_event, ChatEvent, SseParseError, EVENT_ERROR, EVENT_MESSAGE_DELTA};
pub use parser::{parse_sse_line, Frame, FrameParser, LineBuffer, SseLine, DONE_MARKER};
