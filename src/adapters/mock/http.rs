//! Mock HTTP client for testing.
//!
//! Replays scripted responses and records every request, so tests can assert
//! both outcomes and traffic (including that no request was made at all).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Option<String>,
}

/// Scripted behavior for a URL.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Buffered response for GET
    Success(Response),
    /// Fail the request outright
    Error(HttpError),
    /// Streamed body chunks for POST
    Stream(Vec<Bytes>),
    /// Chunks followed by a transport error
    StreamThenError(Vec<Bytes>, HttpError),
}

/// Mock HTTP client.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    default_response: Arc<Mutex<Option<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for an exact URL.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        self.responses
            .lock()
            .expect("mock lock")
            .insert(url.to_string(), response);
    }

    /// Script a response for any URL without a specific match.
    pub fn set_default_response(&self, response: MockResponse) {
        *self.default_response.lock().expect("mock lock") = Some(response);
    }

    /// All requests made so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("mock lock").clone()
    }

    fn record(&self, method: &str, url: &str, headers: &Headers, body: Option<String>) {
        self.requests.lock().expect("mock lock").push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body,
        });
    }

    fn lookup(&self, url: &str) -> Option<MockResponse> {
        self.responses
            .lock()
            .expect("mock lock")
            .get(url)
            .cloned()
            .or_else(|| self.default_response.lock().expect("mock lock").clone())
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record("GET", url, headers, None);
        match self.lookup(url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(e)) => Err(e),
            Some(other) => Err(HttpError::Other(format!(
                "mock configured for streaming, not GET: {:?}",
                other
            ))),
            None => Err(HttpError::Other(format!("no mock response for {}", url))),
        }
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        self.record("POST", url, headers, Some(body.to_string()));
        match self.lookup(url) {
            Some(MockResponse::Stream(chunks)) => {
                let items: Vec<Result<Bytes, HttpError>> =
                    chunks.into_iter().map(Ok).collect();
                Ok(Box::pin(stream::iter(items)))
            }
            Some(MockResponse::StreamThenError(chunks, err)) => {
                let mut items: Vec<Result<Bytes, HttpError>> =
                    chunks.into_iter().map(Ok).collect();
                items.push(Err(err));
                Ok(Box::pin(stream::iter(items)))
            }
            Some(MockResponse::Error(e)) => Err(e),
            Some(MockResponse::Success(_)) => Err(HttpError::Other(
                "mock configured for GET, not streaming".to_string(),
            )),
            None => Err(HttpError::Other(format!("no mock response for {}", url))),
        }
    }
}
