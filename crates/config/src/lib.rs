//! Credential source resolution for kubelink.
//!
//! This crate locates the authoritative credential file, parses it into an
//! immutable snapshot, and writes refreshed credentials back to it. It does
//! no network I/O.

pub mod constants;
pub mod document;
pub mod env;
mod error;
mod locator;
mod overlay;
pub mod persistence;
mod settings;
mod snapshot;
pub mod types;

pub use error::{ConfigError, PersistError, ResolutionError};
pub use locator::{ConfigLocator, CredentialSource, LocateWarning, SourceOrigin};
pub use overlay::LegacyOverlay;
pub use persistence::{CredentialPersister, FilePersister};
pub use settings::ConnectionSettings;
pub use snapshot::{ConfigSnapshot, ContextOverrides, ResolvedContext};
pub use types::{AuthProvider, ClusterEntry, ContextEntry, IdentityRecord, OidcConfig};
