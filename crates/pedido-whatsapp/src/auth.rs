//! File-backed credential store
//!
//! The bridge owns the credential format; this store only carries the
//! opaque blob across sessions and persists rotations as they arrive.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WhatsAppError};

/// Opaque credential state owned by the wire protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthState(pub serde_json::Value);

/// File-backed store for the credential state.
#[derive(Debug, Clone)]
pub struct FileAuthStore {
    path: PathBuf,
}

impl FileAuthStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state, if any.
    pub fn load(&self) -> Result<Option<AuthState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            WhatsAppError::Auth(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        let state = serde_json::from_str(&content)
            .map_err(|e| WhatsAppError::Auth(format!("corrupt credential state: {}", e)))?;

        Ok(Some(state))
    }

    /// Persist a rotated state.
    pub fn save(&self, state: &AuthState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    WhatsAppError::Auth(format!(
                        "failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(&state.0)
            .map_err(|e| WhatsAppError::Auth(e.to_string()))?;

        std::fs::write(&self.path, content).map_err(|e| {
            WhatsAppError::Auth(format!("failed to write {}: {}", self.path.display(), e))
        })
    }
}
