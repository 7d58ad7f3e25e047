//! Coze API client: the streaming chat driver and conversation REST reads.
//!
//! [`CozeClient::send_message`] performs one streamed chat turn: it POSTs the
//! user message, decodes the response stream frame by frame, invokes the
//! delta callback in stream order, and resolves to a [`SendResult`]. All
//! failures are carried in the result rather than thrown, so callers have a
//! single place to branch.

use std::sync::Arc;

use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::adapters::ReqwestHttpClient;
use crate::models::{ChatCredentials, ChatRequest, Conversation, Envelope, MessageItem};
use crate::sse::{parse_chat_event, ChatEvent, FrameParser, LineBuffer};
use crate::traits::{Headers, HttpClient, HttpError};

pub const COZE_BASE_URL: &str = "https://api.coze.cn";

pub const ERR_MISSING_API_KEY: &str = "API 密钥未配置";
pub const ERR_MISSING_BOT_ID: &str = "智能体 ID 未配置";
pub const ERR_CANCELLED: &str = "请求已取消";

const ERR_RETRIEVE_FALLBACK: &str = "获取会话信息失败";
const ERR_LIST_FALLBACK: &str = "获取会话消息失败";

/// Callback invoked once per qualifying answer delta, in stream order.
pub type OnDelta<'a> = &'a mut (dyn FnMut(&str) + Send);

/// Error type for the REST read operations.
#[derive(Debug, Error)]
pub enum CozeError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Upstream envelope reported a non-zero code.
    #[error("{msg}")]
    Api { code: i64, msg: String },
}

/// Outcome of one streaming send.
///
/// Both fields are always present in the shape; exactly one of
/// `content`/`error` is meaningful, discriminated by [`SendResult::is_err`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SendResult {
    /// Concatenation of every qualifying answer delta, in stream order.
    pub content: String,
    /// Conversation id discovered on this stream, or the one the call
    /// started with.
    pub conversation_id: Option<String>,
    pub error: Option<String>,
}

impl SendResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

/// Create a linked cancellation pair. Fire the handle to make the in-flight
/// send resolve with `请求已取消`; dropping the handle never cancels.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Handle for aborting an in-flight send from another task.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Token the driver polls between chunk reads.
#[derive(Debug)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Resolve once the linked handle fires. Never resolves if the handle
    /// was dropped without firing.
    pub async fn cancelled(&mut self) {
        if *self.rx.borrow() {
            return;
        }
        while self.rx.changed().await.is_ok() {
            if *self.rx.borrow() {
                return;
            }
        }
        // Handle dropped without firing: never resolve.
        std::future::pending::<()>().await
    }
}

/// Running accumulator for one send, constructed fresh per call.
#[derive(Debug, Default)]
struct StreamState {
    content: String,
    /// First-writer-wins: later frames must not overwrite it.
    discovered_id: Option<String>,
}

/// Client for the Coze v3 chat API.
pub struct CozeClient {
    base_url: String,
    http: Arc<dyn HttpClient>,
}

impl CozeClient {
    /// Create a client against the production endpoint.
    pub fn new() -> Self {
        Self::with_base_url(COZE_BASE_URL)
    }

    /// Create a client against a custom endpoint (tests, proxies).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Arc::new(ReqwestHttpClient::new()),
        }
    }

    /// Create a client with an injected transport.
    pub fn with_http(base_url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_headers(api_key: &str) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Authorization".to_string(), format!("Bearer {}", api_key));
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers
    }

    /// Send one user message and stream the reply.
    ///
    /// `on_delta` is invoked once per qualifying answer fragment, in stream
    /// order, strictly before this call resolves. Missing credentials
    /// short-circuit with an error result before any network I/O.
    pub async fn send_message(
        &self,
        text: &str,
        credentials: &ChatCredentials,
        on_delta: Option<OnDelta<'_>>,
        cancel: Option<CancelToken>,
    ) -> SendResult {
        if credentials.api_key.is_empty() {
            return SendResult::failed(ERR_MISSING_API_KEY);
        }
        if credentials.bot_id.is_empty() {
            return SendResult::failed(ERR_MISSING_BOT_ID);
        }

        let mut url = format!("{}/v3/chat", self.base_url);
        if let Some(id) = &credentials.conversation_id {
            url.push_str("?conversation_id=");
            url.push_str(&urlencoding::encode(id));
        }

        let request = ChatRequest::user_turn(&credentials.bot_id, &credentials.user_id, text);
        let body = match serde_json::to_string(&request) {
            Ok(body) => body,
            Err(e) => return SendResult::failed(format!("发送消息失败: {}", e)),
        };

        info!(url = %url, "sending chat message");
        let stream = match self
            .http
            .post_stream(&url, &body, &Self::auth_headers(&credentials.api_key))
            .await
        {
            Ok(stream) => stream,
            Err(HttpError::Status { status, reason }) => {
                return SendResult::failed(format!("API 错误: {} {}", status, reason));
            }
            Err(e) => return SendResult::failed(format!("发送消息失败: {}", e)),
        };

        self.drive_stream(stream, credentials.conversation_id.clone(), on_delta, cancel)
            .await
    }

    /// Consume the response stream until the transport closes, an error
    /// frame terminates it, or the cancel token fires.
    async fn drive_stream(
        &self,
        mut stream: crate::traits::ByteStream,
        original_id: Option<String>,
        mut on_delta: Option<OnDelta<'_>>,
        mut cancel: Option<CancelToken>,
    ) -> SendResult {
        let mut lines = LineBuffer::new();
        let mut frames = FrameParser::new();
        let mut state = StreamState::default();

        loop {
            let chunk = match cancel.as_mut() {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            info!("send cancelled by caller");
                            return SendResult::failed(ERR_CANCELLED);
                        }
                        chunk = stream.next() => chunk,
                    }
                }
                None => stream.next().await,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    lines.push(&bytes);
                    while let Some(line) = lines.next_line() {
                        if let Some(result) =
                            Self::handle_line(&line, &mut frames, &mut state, &mut on_delta)
                        {
                            return result;
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!("transport error mid-stream: {}", e);
                    return SendResult::failed(format!("发送消息失败: {}", e));
                }
                None => break,
            }
        }

        // A final unterminated line can still complete a frame.
        if let Some(line) = lines.take_remainder() {
            if let Some(result) = Self::handle_line(&line, &mut frames, &mut state, &mut on_delta)
            {
                return result;
            }
        }

        SendResult {
            content: state.content,
            conversation_id: state.discovered_id.or(original_id),
            error: None,
        }
    }

    /// Feed one line through the frame parser and interpreter. Returns a
    /// result only when an error frame terminates the stream.
    fn handle_line(
        line: &str,
        frames: &mut FrameParser,
        state: &mut StreamState,
        on_delta: &mut Option<OnDelta<'_>>,
    ) -> Option<SendResult> {
        let frame = frames.feed_line(line)?;

        match parse_chat_event(&frame) {
            Ok(ChatEvent::ConversationInfo { conversation_id }) => {
                if state.discovered_id.is_none() {
                    if let Some(id) = conversation_id {
                        debug!(conversation_id = %id, "conversation id discovered");
                        state.discovered_id = Some(id);
                    }
                }
                None
            }
            Ok(ChatEvent::AnswerDelta(delta)) => {
                state.content.push_str(&delta);
                if let Some(cb) = on_delta.as_mut() {
                    cb(&delta);
                }
                None
            }
            Ok(ChatEvent::ProtocolError { code, message }) => {
                // Content accumulated so far is discarded; only the error
                // survives into the result.
                Some(SendResult::failed(format!("API 错误: {} {}", code, message)))
            }
            Ok(ChatEvent::Skip) => None,
            Err(e) => {
                // Heartbeats and malformed keep-alive payloads land here.
                debug!("dropping unparsable frame: {}", e);
                None
            }
        }
    }

    /// Fetch conversation metadata by id.
    pub async fn retrieve_conversation(
        &self,
        conversation_id: &str,
        api_key: &str,
    ) -> Result<Conversation, CozeError> {
        let url = format!(
            "{}/v1/conversation/retrieve?conversation_id={}",
            self.base_url,
            urlencoding::encode(conversation_id)
        );
        let response = self.http.get(&url, &Self::auth_headers(api_key)).await?;
        let envelope: Envelope<Conversation> = response.json()?;

        match envelope {
            Envelope {
                code: 0,
                data: Some(data),
                ..
            } => Ok(data),
            Envelope { code, msg, .. } => Err(CozeError::Api {
                code,
                msg: msg.unwrap_or_else(|| ERR_RETRIEVE_FALLBACK.to_string()),
            }),
        }
    }

    /// Fetch the messages of a conversation, filtered to the visible turns
    /// and sorted by server-assigned creation time ascending. The upstream
    /// list is not guaranteed pre-sorted.
    pub async fn list_messages(
        &self,
        conversation_id: &str,
        api_key: &str,
    ) -> Result<Vec<MessageItem>, CozeError> {
        let url = format!(
            "{}/v1/conversation/message/list?conversation_id={}",
            self.base_url,
            urlencoding::encode(conversation_id)
        );
        let response = self.http.get(&url, &Self::auth_headers(api_key)).await?;
        let envelope: Envelope<Vec<MessageItem>> = response.json()?;

        match envelope {
            Envelope {
                code: 0,
                data: Some(items),
                ..
            } => {
                let mut items: Vec<MessageItem> =
                    items.into_iter().filter(MessageItem::is_visible).collect();
                items.sort_by_key(|item| item.created_at);
                Ok(items)
            }
            Envelope { code, msg, .. } => Err(CozeError::Api {
                code,
                msg: msg.unwrap_or_else(|| ERR_LIST_FALLBACK.to_string()),
            }),
        }
    }
}

impl Default for CozeClient {
    fn default() -> Self {
        Self::new()
    }
}
