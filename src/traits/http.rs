//! HTTP client trait abstraction.
//!
//! Abstracts the two HTTP shapes the client needs - plain GET and streaming
//! POST - so tests can inject a mock and record traffic.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

/// HTTP headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// An incrementally delivered response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: Bytes) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the response body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// HTTP client errors.
#[derive(Debug, Clone)]
pub enum HttpError {
    /// Connection failed
    ConnectionFailed(String),
    /// Request timeout
    Timeout(String),
    /// Non-success status; carries the reason phrase
    Status { status: u16, reason: String },
    /// Body read failed mid-stream
    Io(String),
    /// Other error
    Other(String),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            HttpError::Timeout(msg) => write!(f, "Request timeout: {}", msg),
            HttpError::Status { status, reason } => write!(f, "HTTP {} {}", status, reason),
            HttpError::Io(msg) => write!(f, "IO error: {}", msg),
            HttpError::Other(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// Trait for the HTTP operations the Coze client performs.
///
/// Implementations include the production reqwest-based client and a mock
/// that records requests and replays scripted responses.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request and buffer the whole response.
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError>;

    /// POST a JSON body and stream the response incrementally.
    ///
    /// A non-2xx status is returned as [`HttpError::Status`] carrying the
    /// reason phrase; the body is not read in that case.
    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError>;
}
