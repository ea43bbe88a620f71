//! Error types for the kubelink client.

use kubelink_config::{ConfigError, PersistError, ResolutionError};
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while connecting to or operating on a cluster.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Locating or loading the credential file failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An id-token payload is not valid base64url/JSON; the file is corrupt.
    #[error("Failed to decode id-token of identity '{identity}': {reason}")]
    TokenDecode { identity: String, reason: String },

    /// The provider rejected the refresh token; a full login is required.
    #[error(
        "Session for identity '{identity}' has expired and could not be refreshed, please log in again"
    )]
    ExpiredSession { identity: String },

    /// The refresh attempt failed for a reason other than a rejected grant.
    #[error("Failed to refresh credentials for identity '{identity}': {message}")]
    RefreshTransport { identity: String, message: String },

    /// Refreshed credentials could not be written back.
    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// HTTP client could not be constructed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API error from the cluster.
    #[error("API error: {0}")]
    Api(#[from] kube::Error),

    /// A port mapping could not be parsed.
    #[error("Invalid port mapping '{mapping}': {message}")]
    PortMapping { mapping: String, message: String },

    #[error("Tunnel to pod '{pod}' failed: {message}")]
    Tunnel { pod: String, message: String },

    /// A proxy request could not be constructed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("WebSocket connection to {url} failed: {message}")]
    WebSocket { url: String, message: String },
}

impl ClientError {
    /// Check if the user must log in again to recover.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            Self::Config(ConfigError::NotLoggedIn { .. }) | Self::ExpiredSession { .. }
        )
    }

    /// Check if a context, cluster or identity reference could not be resolved.
    pub fn is_resolution_error(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }

    /// Check if this error came back from the API server as not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(kube::Error::Api(resp)) if resp.code == 404)
    }
}
