//! Legacy overlay file support (deprecated).
//!
//! The overlay is a small JSON document carrying only `{context, namespace}`.
//! When it is in effect it overrides the effective context and namespace of
//! the system-wide credential file without altering that file. Identity and
//! cluster binding still resolve through `contexts[context]`.
//!
//! The format is kept for compatibility only and must not grow new fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Parsed legacy overlay: both fields are required and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyOverlay {
    pub context: String,
    pub namespace: String,
}

impl LegacyOverlay {
    /// Read and validate an overlay file.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidConfig`] if the path is a directory, the JSON is
    ///   malformed, or a required field is missing or blank.
    /// - [`ConfigError::Read`] for other I/O failures.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        if path.is_dir() {
            return Err(ConfigError::invalid(path, "overlay path is a directory"));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let overlay: LegacyOverlay = serde_json::from_str(&content)
            .map_err(|e| ConfigError::invalid(path, format!("malformed overlay: {e}")))?;

        if overlay.context.trim().is_empty() {
            return Err(ConfigError::invalid(path, "overlay is missing 'context'"));
        }
        if overlay.namespace.trim().is_empty() {
            return Err(ConfigError::invalid(path, "overlay is missing 'namespace'"));
        }

        Ok(overlay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(".kubelinkrc");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_valid_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, r#"{"context": "b", "namespace": "ns2"}"#);

        let overlay = LegacyOverlay::read(&path).unwrap();
        assert_eq!(overlay.context, "b");
        assert_eq!(overlay.namespace, "ns2");
    }

    #[test]
    fn test_missing_namespace_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, r#"{"context": "b"}"#);

        let err = LegacyOverlay::read(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { .. }));
    }

    #[test]
    fn test_blank_context_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, r#"{"context": "  ", "namespace": "ns"}"#);

        let err = LegacyOverlay::read(&path).unwrap_err();
        assert!(err.to_string().contains("context"));
    }

    #[test]
    fn test_directory_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = LegacyOverlay::read(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { .. }));
    }
}
