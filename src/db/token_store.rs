// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Single-slot JSON file holding the current Oura OAuth tokens.
//!
//! - `load` treats a missing, empty, or corrupt file as "no tokens"
//! - `save` writes a sibling temp file and renames it over the target
//! - `clear` removes the file (missing file is fine)

use crate::error::AppError;
use crate::models::OAuthTokenRecord;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File-backed token store. Cheap to clone; all clones share the same path.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored record, or `None` if nothing usable is on disk.
    pub async fn load(&self) -> Option<OAuthTokenRecord> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read token store");
                return None;
            }
        };

        if raw.trim().is_empty() {
            return None;
        }

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Token store is corrupt, treating as disconnected"
                );
                None
            }
        }
    }

    /// Persist `record`, replacing any previous one.
    pub async fn save(&self, record: &OAuthTokenRecord) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("create {}: {}", parent.display(), e)))?;
        }

        let body = serde_json::to_vec_pretty(record)
            .map_err(|e| AppError::Storage(format!("serialize tokens: {}", e)))?;

        let tmp_path = self.temp_path();
        tokio::fs::write(&tmp_path, body)
            .await
            .map_err(|e| AppError::Storage(format!("write {}: {}", tmp_path.display(), e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) =
                tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600)).await
            {
                tracing::warn!(error = %e, "Failed to restrict token file permissions");
            }
        }

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| AppError::Storage(format!("rename to {}: {}", self.path.display(), e)))?;

        tracing::debug!(path = %self.path.display(), "Token store updated");
        Ok(())
    }

    /// Remove the stored record.
    pub async fn clear(&self) -> Result<(), AppError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Token store cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!(
                "remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tokens.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
