//! Durable storage of refreshed credentials.
//!
//! Responsibilities:
//! - Write a refreshed identity's auth-provider configuration back to the
//!   authoritative credential file.
//!
//! Does NOT handle:
//! - Deciding whether a refresh is needed (see client crate).
//! - Locking against other processes refreshing the same identity; the last
//!   writer wins.
//!
//! Invariants:
//! - Only `users[identity].user.auth-provider.config` is replaced; every
//!   other key in the file is preserved.
//! - Writes are atomic (sibling temp file + rename) and keep the original
//!   file's permissions.

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::debug;

use crate::document;
use crate::error::PersistError;
use crate::locator::CredentialSource;
use crate::types::AuthProvider;

/// Writes a refreshed identity back to durable storage, keyed by
/// `(credential source, identity name)`.
pub trait CredentialPersister: Send + Sync {
    fn persist(
        &self,
        source: &CredentialSource,
        identity: &str,
        provider: &AuthProvider,
    ) -> Result<(), PersistError>;
}

/// Persists into the credential file named by the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilePersister;

impl CredentialPersister for FilePersister {
    fn persist(
        &self,
        source: &CredentialSource,
        identity: &str,
        provider: &AuthProvider,
    ) -> Result<(), PersistError> {
        let path = source.path();

        let content = std::fs::read_to_string(path).map_err(|source| PersistError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut doc: Value =
            serde_yaml::from_str(&content).map_err(|e| PersistError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if !document::set_auth_provider_config(&mut doc, identity, &provider.to_config_map()) {
            return Err(PersistError::IdentityNotFound {
                path: path.to_path_buf(),
                identity: identity.to_string(),
            });
        }

        let updated = serde_yaml::to_string(&doc).map_err(|e| PersistError::Parse {
            path: path.to_path_buf(),
            message: format!("failed to serialize: {e}"),
        })?;

        atomic_write(path, &updated)?;
        debug!(path = %path.display(), identity, "Persisted refreshed credentials");
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "kubeconfig".to_string());
    path.with_file_name(format!("{name}.{}.tmp", std::process::id()))
}

fn atomic_write(path: &Path, content: &str) -> Result<(), PersistError> {
    let write_err = |source: std::io::Error| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };

    let temp_path = temp_path_for(path);
    std::fs::write(&temp_path, content).map_err(write_err)?;

    let result = std::fs::metadata(path)
        .and_then(|meta| std::fs::set_permissions(&temp_path, meta.permissions()))
        .and_then(|()| std::fs::rename(&temp_path, path));

    if let Err(e) = result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(write_err(e));
    }
    Ok(())
}
