//! Driver tests over the mock transport.
//!
//! These exercise the full decode path (LineBuffer -> FrameParser ->
//! interpreter -> StreamState) with scripted byte streams, including the
//! chunk-boundary independence and callback-ordering guarantees.

use std::sync::Arc;

use bytes::Bytes;
use cozeterm::adapters::mock::{MockHttpClient, MockResponse};
use cozeterm::client::{
    cancel_pair, CozeClient, SendResult, ERR_CANCELLED, ERR_MISSING_API_KEY, ERR_MISSING_BOT_ID,
};
use cozeterm::models::ChatCredentials;
use cozeterm::traits::HttpError;

const BASE: &str = "http://mock";

fn credentials() -> ChatCredentials {
    ChatCredentials {
        api_key: "test-key".to_string(),
        bot_id: "bot-1".to_string(),
        user_id: "user_1_abcdefg".to_string(),
        conversation_id: None,
    }
}

fn delta_line(content: &str) -> String {
    format!(
        "event: conversation.message.delta\ndata: {{\"role\":\"assistant\",\"type\":\"answer\",\"content\":\"{}\"}}\n",
        content
    )
}

/// A realistic stream: lifecycle frames, two answer deltas, a non-answer
/// delta, and the end-of-content marker.
fn realistic_body() -> String {
    let mut body = String::new();
    body.push_str("event: conversation.chat.created\n");
    body.push_str("data: {\"conversation_id\":\"conv-1\",\"status\":\"created\"}\n");
    body.push_str("\n");
    body.push_str(&delta_line("He"));
    body.push_str(&delta_line("llo"));
    body.push_str("event: conversation.message.delta\n");
    body.push_str("data: {\"role\":\"assistant\",\"type\":\"follow_up\",\"content\":\"nope\"}\n");
    body.push_str("event: conversation.chat.completed\n");
    body.push_str("data: {\"conversation_id\":\"conv-1\",\"status\":\"completed\"}\n");
    body.push_str("event: conversation.message.completed\n");
    body.push_str("data: \"[DONE]\"\n");
    body
}

/// Run one send over a scripted chunked body and collect callback calls.
async fn run_chunks(chunks: Vec<Bytes>, creds: &ChatCredentials) -> (SendResult, Vec<String>) {
    let http = Arc::new(MockHttpClient::new());
    http.set_default_response(MockResponse::Stream(chunks));
    let client = CozeClient::with_http(BASE, http);

    let mut deltas: Vec<String> = Vec::new();
    let mut on_delta = |delta: &str| deltas.push(delta.to_string());
    let result = client
        .send_message("hi", creds, Some(&mut on_delta), None)
        .await;
    (result, deltas)
}

#[tokio::test]
async fn test_whole_body_decode() {
    let (result, deltas) = run_chunks(vec![Bytes::from(realistic_body())], &credentials()).await;

    assert_eq!(result.error, None);
    assert_eq!(result.content, "Hello");
    assert_eq!(result.conversation_id.as_deref(), Some("conv-1"));
    assert_eq!(deltas, vec!["He".to_string(), "llo".to_string()]);
}

#[tokio::test]
async fn test_chunk_boundary_independence() {
    let body = realistic_body();

    let (whole, whole_deltas) =
        run_chunks(vec![Bytes::from(body.clone())], &credentials()).await;
    let byte_chunks: Vec<Bytes> = body
        .as_bytes()
        .iter()
        .map(|&b| Bytes::copy_from_slice(&[b]))
        .collect();
    let (split, split_deltas) = run_chunks(byte_chunks, &credentials()).await;

    assert_eq!(whole, split);
    assert_eq!(whole_deltas, split_deltas);
}

#[tokio::test]
async fn test_multibyte_content_split_across_chunks() {
    let body = format!("{}{}", delta_line("你好"), delta_line("，世界"));
    let bytes = body.as_bytes();

    // Split inside a multi-byte sequence: two uneven chunks whose boundary
    // lands mid-character.
    let boundary = body.find('你').map(|p| p + 1).unwrap_or(1);
    let chunks = vec![
        Bytes::copy_from_slice(&bytes[..boundary]),
        Bytes::copy_from_slice(&bytes[boundary..]),
    ];

    let (result, deltas) = run_chunks(chunks, &credentials()).await;
    assert_eq!(result.error, None);
    assert_eq!(result.content, "你好，世界");
    assert_eq!(deltas.concat(), result.content);
}

#[tokio::test]
async fn test_callback_concatenation_equals_content() {
    let mut body = String::new();
    for part in ["a", "b", "c", "d", "e"] {
        body.push_str(&delta_line(part));
    }

    let (result, deltas) = run_chunks(vec![Bytes::from(body)], &credentials()).await;
    assert_eq!(deltas.len(), 5);
    assert_eq!(deltas.concat(), result.content);
    assert_eq!(result.content, "abcde");
}

#[tokio::test]
async fn test_conversation_id_first_writer_wins() {
    let mut body = String::new();
    body.push_str("event: conversation.chat.created\n");
    body.push_str("data: {\"conversation_id\":\"conv-first\"}\n");
    body.push_str("event: conversation.chat.completed\n");
    body.push_str("data: {\"conversation_id\":\"conv-second\"}\n");

    let (result, _) = run_chunks(vec![Bytes::from(body)], &credentials()).await;
    assert_eq!(result.conversation_id.as_deref(), Some("conv-first"));
}

#[tokio::test]
async fn test_done_marker_never_invokes_callback() {
    let body = "event: conversation.message.completed\ndata: \"[DONE]\"\n".to_string();

    let (result, deltas) = run_chunks(vec![Bytes::from(body)], &credentials()).await;
    assert_eq!(result.error, None);
    assert!(result.content.is_empty());
    assert!(deltas.is_empty());
}

#[tokio::test]
async fn test_error_frame_discards_accumulated_content() {
    let mut body = String::new();
    body.push_str(&delta_line("He"));
    body.push_str("event: error\n");
    body.push_str("data: {\"code\":4000,\"msg\":\"invalid token\"}\n");
    body.push_str(&delta_line("llo"));

    let (result, deltas) = run_chunks(vec![Bytes::from(body)], &credentials()).await;
    assert_eq!(result.error.as_deref(), Some("API 错误: 4000 invalid token"));
    assert!(result.content.is_empty());
    // Deltas before the error frame were already delivered; none after it.
    assert_eq!(deltas, vec!["He".to_string()]);
}

#[tokio::test]
async fn test_malformed_payloads_are_dropped_not_fatal() {
    let mut body = String::new();
    body.push_str("event: conversation.message.delta\n");
    body.push_str("data: not json at all\n");
    body.push_str("event: error\n");
    body.push_str("data: {broken\n");
    body.push_str(&delta_line("ok"));

    let (result, deltas) = run_chunks(vec![Bytes::from(body)], &credentials()).await;
    assert_eq!(result.error, None);
    assert_eq!(result.content, "ok");
    assert_eq!(deltas, vec!["ok".to_string()]);
}

#[tokio::test]
async fn test_missing_api_key_short_circuits_without_io() {
    let http = Arc::new(MockHttpClient::new());
    http.set_default_response(MockResponse::Stream(vec![]));
    let client = CozeClient::with_http(BASE, http.clone());

    let mut creds = credentials();
    creds.api_key.clear();
    let result = client.send_message("hi", &creds, None, None).await;

    assert_eq!(result.error.as_deref(), Some(ERR_MISSING_API_KEY));
    assert!(http.requests().is_empty(), "no network call may be made");
}

#[tokio::test]
async fn test_missing_bot_id_short_circuits_without_io() {
    let http = Arc::new(MockHttpClient::new());
    let client = CozeClient::with_http(BASE, http.clone());

    let mut creds = credentials();
    creds.bot_id.clear();
    let result = client.send_message("hi", &creds, None, None).await;

    assert_eq!(result.error.as_deref(), Some(ERR_MISSING_BOT_ID));
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_request_body_and_url_shape() {
    let http = Arc::new(MockHttpClient::new());
    http.set_default_response(MockResponse::Stream(vec![]));
    let client = CozeClient::with_http(BASE, http.clone());

    let mut creds = credentials();
    creds.conversation_id = Some("conv 7".to_string());
    let result = client.send_message("你好", &creds, None, None).await;
    assert_eq!(result.error, None);
    // With no frames on the stream the original id is carried through.
    assert_eq!(result.conversation_id.as_deref(), Some("conv 7"));

    let requests = http.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(
        requests[0].url,
        format!("{}/v3/chat?conversation_id=conv%207", BASE)
    );
    assert_eq!(
        requests[0].headers.get("Authorization").map(String::as_str),
        Some("Bearer test-key")
    );

    let body: serde_json::Value =
        serde_json::from_str(requests[0].body.as_deref().unwrap_or("")).expect("json body");
    assert_eq!(body["bot_id"], "bot-1");
    assert_eq!(body["user_id"], "user_1_abcdefg");
    assert_eq!(body["stream"], true);
    assert_eq!(body["auto_save_history"], true);
    assert_eq!(body["additional_messages"][0]["role"], "user");
    assert_eq!(body["additional_messages"][0]["content"], "你好");
    assert_eq!(body["additional_messages"][0]["content_type"], "text");
}

#[tokio::test]
async fn test_transport_error_mid_stream() {
    let http = Arc::new(MockHttpClient::new());
    http.set_default_response(MockResponse::StreamThenError(
        vec![Bytes::from(delta_line("He"))],
        HttpError::Io("connection reset".to_string()),
    ));
    let client = CozeClient::with_http(BASE, http);

    let result = client.send_message("hi", &credentials(), None, None).await;
    let error = result.error.expect("transport failure surfaces as error");
    assert!(error.starts_with("发送消息失败:"), "got: {}", error);
}

#[tokio::test]
async fn test_cancelled_send_resolves_with_cancel_error() {
    let http = Arc::new(MockHttpClient::new());
    http.set_default_response(MockResponse::Stream(vec![Bytes::from(realistic_body())]));
    let client = CozeClient::with_http(BASE, http);

    let (handle, token) = cancel_pair();
    handle.cancel();

    let result = client
        .send_message("hi", &credentials(), None, Some(token))
        .await;
    assert_eq!(result.error.as_deref(), Some(ERR_CANCELLED));
}
