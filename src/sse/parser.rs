//! Line and frame parsing for the Coze streaming protocol.
//!
//! The stream is SSE-like but not standard SSE: a frame is complete as soon
//! as a `data:` line arrives, using whatever `event:` line preceded it.
//! Blank lines carry no meaning and there is no multi-line data.

/// Payload literal that signals end-of-content. Payloads are JSON-encoded,
/// so the marker arrives with its quote characters intact.
pub const DONE_MARKER: &str = "\"[DONE]\"";

/// A single classified line from the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Event type declaration (e.g. `event: conversation.message.delta`)
    Event(String),
    /// Data payload (e.g. `data: {"content": "..."}`)
    Data(String),
    /// Empty line
    Empty,
    /// Anything else; carries no frame content
    Other(String),
}

/// Classify a single line of the stream.
pub fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(rest) = line.strip_prefix("event:") {
        return SseLine::Event(rest.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("data:") {
        return SseLine::Data(rest.trim().to_string());
    }

    SseLine::Other(line.to_string())
}

/// One `(event-name, payload)` pair emitted by the parser.
///
/// The event name may be empty when a `data:` line arrived without a
/// preceding `event:` line; the interpreter discards such frames unless it
/// recognizes them.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub event: String,
    pub data: String,
}

/// Stateful frame parser.
///
/// Holds the most recent `event:` name and emits one [`Frame`] per `data:`
/// line. Both the held event name and the payload reset after emission, so a
/// stray data line cannot leak the previous frame's event name forward.
#[derive(Debug, Default)]
pub struct FrameParser {
    current_event: String,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its trailing newline), possibly emitting a frame.
    ///
    /// The `"[DONE]"` payload is swallowed here: it marks end-of-content and
    /// must never reach the interpreter.
    pub fn feed_line(&mut self, line: &str) -> Option<Frame> {
        match parse_sse_line(line) {
            SseLine::Event(name) => {
                self.current_event = name;
                None
            }
            SseLine::Data(data) => {
                let event = std::mem::take(&mut self.current_event);
                if data == DONE_MARKER {
                    return None;
                }
                Some(Frame { event, data })
            }
            SseLine::Empty | SseLine::Other(_) => None,
        }
    }

    /// Drop any held event name, e.g. when starting a new stream.
    pub fn reset(&mut self) {
        self.current_event.clear();
    }
}

/// Accumulates raw bytes across network chunks and yields complete lines.
///
/// Splitting happens on bytes rather than decoded text so a multi-byte
/// UTF-8 character broken across two chunks is reassembled before decoding.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk to the buffer.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the next complete `\n`-terminated line, with the newline and any
    /// trailing `\r` removed. Returns `None` while the buffer holds only a
    /// partial line.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.buf.drain(..=pos).collect();
        let line = &line[..line.len() - 1];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        Some(String::from_utf8_lossy(line).into_owned())
    }

    /// Take whatever is left after the transport closed, as a final
    /// unterminated line.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(
            String::from_utf8_lossy(&rest)
                .trim_end_matches('\r')
                .to_string(),
        )
    }
}
