//! Chat session manager.
//!
//! Orchestrates driver invocations across a conversation: owns the ordered
//! message list, mutates the trailing assistant placeholder while a stream
//! is active, and persists the discovered conversation id through the
//! injected [`CredentialsProvider`]. One send is in flight at a time; the
//! front-end is responsible for not overlapping calls.

use std::sync::Arc;

use tracing::warn;

use crate::client::{CozeClient, CozeError, OnDelta, SendResult};
use crate::models::{ChatCredentials, ChatMessage, MessageRole};
use crate::traits::{CredentialsError, CredentialsProvider};

/// Text shown in the assistant slot until the first delta arrives.
pub const THINKING_PLACEHOLDER: &str = "思考中...";

pub struct ChatSession {
    client: CozeClient,
    store: Arc<dyn CredentialsProvider>,
    credentials: ChatCredentials,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(
        client: CozeClient,
        store: Arc<dyn CredentialsProvider>,
        credentials: ChatCredentials,
    ) -> Self {
        Self {
            client,
            store,
            credentials,
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn credentials(&self) -> &ChatCredentials {
        &self.credentials
    }

    /// Send one user turn, updating the message list as the reply streams.
    pub async fn send(&mut self, text: &str) -> SendResult {
        self.send_with(text, None).await
    }

    /// Like [`send`](Self::send), with an extra per-delta callback for live
    /// rendering. The callback fires in stream order, before this resolves.
    pub async fn send_with(
        &mut self,
        text: &str,
        mut on_delta: Option<OnDelta<'_>>,
    ) -> SendResult {
        self.messages.push(ChatMessage::user(text));
        self.messages
            .push(ChatMessage::assistant(THINKING_PLACEHOLDER));

        let result = {
            let messages = &mut self.messages;
            let mut first = true;
            let mut combined = |delta: &str| {
                if let Some(cb) = on_delta.as_mut() {
                    cb(delta);
                }
                if let Some(last) = messages.last_mut() {
                    // First delta replaces the placeholder.
                    if first {
                        last.text.clear();
                        first = false;
                    }
                    last.text.push_str(delta);
                }
            };

            self.client
                .send_message(text, &self.credentials, Some(&mut combined), None)
                .await
        };

        if let Some(last) = self.messages.last_mut() {
            if last.role == MessageRole::Assistant {
                match &result.error {
                    Some(err) => last.text = format!("错误: {}", err),
                    None => last.text = result.content.clone(),
                }
            }
        }

        if let Some(id) = &result.conversation_id {
            if self.credentials.conversation_id.as_deref() != Some(id) {
                self.credentials.conversation_id = Some(id.clone());
                if let Err(e) = self.store.save(&self.credentials).await {
                    warn!("failed to persist conversation id: {}", e);
                }
            }
        }

        result
    }

    /// Replace the message list with the stored conversation's history.
    ///
    /// A no-op returning `Ok(0)` when there is no stored conversation id or
    /// no api key to fetch with.
    pub async fn load_history(&mut self) -> Result<usize, CozeError> {
        let conversation_id = match &self.credentials.conversation_id {
            Some(id) if !self.credentials.api_key.is_empty() => id.clone(),
            _ => return Ok(0),
        };

        let items = self
            .client
            .list_messages(&conversation_id, &self.credentials.api_key)
            .await?;

        self.messages = items
            .into_iter()
            .map(|item| ChatMessage {
                role: if item.role == "user" {
                    MessageRole::User
                } else {
                    MessageRole::Assistant
                },
                text: item.content,
            })
            .collect();

        Ok(self.messages.len())
    }

    /// Forget the stored conversation id and clear the transcript, so the
    /// next send starts a fresh upstream conversation.
    pub async fn reset_conversation(&mut self) -> Result<(), CredentialsError> {
        self.credentials.conversation_id = None;
        self.messages.clear();
        self.store.save(&self.credentials).await
    }
}
