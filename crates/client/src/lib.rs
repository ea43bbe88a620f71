//! Cluster connection client.
//!
//! This crate turns a resolved credential file into a live Kubernetes API
//! connection. It refreshes expired OIDC id-tokens with the issuer's
//! refresh-token grant, persists the rotated tokens exactly once, and keeps
//! a swappable connection handle that context switches replace atomically.
//! Watch, port tunnel and proxy operations are bound to the current handle.

pub mod error;
mod handle;
mod manager;
mod provider;
mod proxy;
mod refresh;
mod throttle;
mod token;
mod tunnel;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::{ClientError, Result};
pub use handle::ConnectionHandle;
pub use manager::{ConnectionManager, ConnectionManagerBuilder, WatchEventType};
pub use provider::{AuthProviderHandler, OidcProvider, ProviderRegistry};
pub use proxy::{ProxyHandle, ProxyWebSocket};
pub use refresh::{CredentialRefresher, RefreshOutcome};
pub use throttle::RequestThrottle;
pub use token::{TokenFreshnessChecker, token_expiry};
pub use tunnel::{PortMapping, Tunnel, TunnelFactory, parse_port_mappings};

pub use kube::api::WatchParams;
