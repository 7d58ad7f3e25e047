//! Credentials provider trait abstraction.
//!
//! The persisted configuration blob is external state with no teardown;
//! modeling load/save as an injected boundary keeps the session manager free
//! of ambient globals and lets tests substitute in-memory storage.

use async_trait::async_trait;

use crate::models::ChatCredentials;

/// Credentials storage errors.
#[derive(Debug, Clone)]
pub enum CredentialsError {
    /// IO error
    Io(String),
    /// Serialization/deserialization error
    Serialization(String),
    /// Other error
    Other(String),
}

impl std::fmt::Display for CredentialsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialsError::Io(msg) => write!(f, "IO error: {}", msg),
            CredentialsError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            CredentialsError::Other(msg) => write!(f, "Credentials error: {}", msg),
        }
    }
}

impl std::error::Error for CredentialsError {}

/// Trait for loading and persisting [`ChatCredentials`].
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Load stored credentials.
    ///
    /// Returns `Ok(None)` when nothing is stored. An unparsable store is
    /// cleared and reported as `None` rather than repaired.
    async fn load(&self) -> Result<Option<ChatCredentials>, CredentialsError>;

    /// Persist the given credentials, replacing any stored value.
    async fn save(&self, creds: &ChatCredentials) -> Result<(), CredentialsError>;

    /// Remove stored credentials, if any.
    async fn clear(&self) -> Result<(), CredentialsError>;
}
