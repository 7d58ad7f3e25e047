//! In-memory credentials provider for testing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::models::ChatCredentials;
use crate::traits::{CredentialsError, CredentialsProvider};

/// Credentials provider that stores the blob in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentials {
    inner: Arc<Mutex<Option<ChatCredentials>>>,
}

impl InMemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider pre-populated with credentials.
    pub fn with_credentials(creds: ChatCredentials) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(creds))),
        }
    }

    /// Peek at the currently stored value.
    pub fn stored(&self) -> Option<ChatCredentials> {
        self.inner.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl CredentialsProvider for InMemoryCredentials {
    async fn load(&self) -> Result<Option<ChatCredentials>, CredentialsError> {
        Ok(self.stored())
    }

    async fn save(&self, creds: &ChatCredentials) -> Result<(), CredentialsError> {
        *self.inner.lock().expect("mock lock") = Some(creds.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialsError> {
        *self.inner.lock().expect("mock lock") = None;
        Ok(())
    }
}
