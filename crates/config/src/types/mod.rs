//! Typed view of a credential file.
//!
//! Responsibilities:
//! - Define cluster, context and identity entries as read from the credential file.
//! - Model the auth-provider block as a discriminated variant keyed by provider kind.
//!
//! Does NOT handle:
//! - Locating or reading files (see `locator` and `snapshot` modules).
//! - Token validation or refresh (see client crate).
//!
//! Invariants:
//! - All secret values use `secrecy::SecretString` to prevent accidental logging.
//! - Provider configuration keys that are not interpreted are carried through unchanged.

mod entries;
mod identity;

pub use entries::{ClusterEntry, ContextEntry};
pub use identity::{AuthProvider, IdentityRecord, OidcConfig};
