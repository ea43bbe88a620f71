//! Error types for credential source resolution, snapshot loading and persistence.
//!
//! Responsibilities:
//! - Define error variants for locating and loading credential files.
//! - Define resolution failures for context/cluster/identity references.
//! - Define persistence failures for refreshed credentials.
//!
//! Invariants:
//! - All error variants include context for debugging (paths, names, variables).
//! - Error messages never include token or secret values.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while locating or loading credential files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No usable credential source was found; the user must (re-)authenticate.
    #[error("Not logged in: {message}")]
    NotLoggedIn { message: String },

    /// A required file is a directory, unparseable, or missing required fields.
    #[error("Invalid configuration at {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Unable to determine home directory")]
    HomeDirUnavailable,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A context, cluster or identity reference could not be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("No current context is selected")]
    NoCurrentContext,

    #[error("Context '{0}' not found")]
    UnknownContext(String),

    #[error("Cluster '{cluster}' referenced by context '{context}' not found")]
    UnknownCluster { context: String, cluster: String },

    #[error("Identity '{identity}' referenced by context '{context}' not found")]
    UnknownIdentity { context: String, identity: String },

    #[error("Cluster '{cluster}' has a malformed server URL '{server}': {message}")]
    MalformedServerUrl {
        cluster: String,
        server: String,
        message: String,
    },

    /// The connection handle could not be constructed from a resolved context.
    #[error("Failed to build connection for context '{context}': {message}")]
    Handle { context: String, message: String },
}

/// A refreshed credential could not be written back to the credential file.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to read credential file {path} for persisting: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse credential file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Identity '{identity}' has no auth-provider block in {path}")]
    IdentityNotFound { path: PathBuf, identity: String },

    #[error("Failed to write credential file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
