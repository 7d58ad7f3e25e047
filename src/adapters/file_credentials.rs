//! File-based credentials provider.
//!
//! Persists the configuration blob as pretty-printed JSON at
//! `~/.cozeterm/config.json`. An unparsable file is deleted and treated as
//! absent, matching the original client's handling of corrupt storage.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;

use crate::models::ChatCredentials;
use crate::traits::{CredentialsError, CredentialsProvider};

const CONFIG_DIR: &str = ".cozeterm";
const CONFIG_FILE: &str = "config.json";

/// Credentials provider backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialsProvider {
    path: PathBuf,
}

impl FileCredentialsProvider {
    /// Create a provider at the default location under the home directory.
    pub fn new() -> Result<Self, CredentialsError> {
        let home = dirs::home_dir().ok_or_else(|| {
            CredentialsError::Other("Failed to determine home directory".to_string())
        })?;
        Ok(Self {
            path: home.join(CONFIG_DIR).join(CONFIG_FILE),
        })
    }

    /// Create a provider at an explicit path. Used in tests.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialsProvider for FileCredentialsProvider {
    async fn load(&self) -> Result<Option<ChatCredentials>, CredentialsError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CredentialsError::Io(e.to_string())),
        };

        match serde_json::from_str(&raw) {
            Ok(creds) => Ok(Some(creds)),
            Err(e) => {
                // Corrupt config is cleared, not repaired.
                warn!("config file is unparsable, clearing it: {}", e);
                if let Err(e) = fs::remove_file(&self.path) {
                    if e.kind() != ErrorKind::NotFound {
                        return Err(CredentialsError::Io(e.to_string()));
                    }
                }
                Ok(None)
            }
        }
    }

    async fn save(&self, creds: &ChatCredentials) -> Result<(), CredentialsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CredentialsError::Io(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(creds)
            .map_err(|e| CredentialsError::Serialization(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| CredentialsError::Io(e.to_string()))
    }

    async fn clear(&self) -> Result<(), CredentialsError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CredentialsError::Io(e.to_string())),
        }
    }
}
