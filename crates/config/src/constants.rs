//! Centralized constants for the kubelink workspace.
//!
//! This module contains default values and well-known names used across
//! crates to avoid magic string duplication.

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment variable naming an explicit credential file path.
pub const ENV_KUBECONFIG: &str = "KUBELINK_KUBECONFIG";

/// Environment variable holding the refresh-token request timeout in seconds.
pub const ENV_REFRESH_TIMEOUT: &str = "KUBELINK_REFRESH_TIMEOUT";

/// Environment variable holding the proxy request rate (requests per second).
pub const ENV_PROXY_QPS: &str = "KUBELINK_PROXY_QPS";

/// Environment variable holding the proxy request burst size.
pub const ENV_PROXY_BURST: &str = "KUBELINK_PROXY_BURST";

/// Environment variable that silences the legacy overlay deprecation warning.
pub const ENV_NO_DEPRECATION_WARNINGS: &str = "KUBELINK_NO_DEPRECATION_WARNINGS";

// =============================================================================
// File Locations
// =============================================================================

/// Credential file looked up in the working directory.
pub const LOCAL_KUBECONFIG_FILE: &str = ".kubeconfig";

/// Legacy overlay file looked up in the working directory (deprecated).
pub const LEGACY_OVERLAY_FILE: &str = ".kubelinkrc";

/// System-wide credential file, relative to the user's home directory.
pub const SYSTEM_KUBECONFIG_DIR: &str = ".kube";

/// File name of the system-wide credential file inside [`SYSTEM_KUBECONFIG_DIR`].
pub const SYSTEM_KUBECONFIG_FILE: &str = "config";

// =============================================================================
// Auth Provider Keys
// =============================================================================

/// Provider kind of the OIDC-style bearer flow.
pub const OIDC_PROVIDER_KIND: &str = "oidc";

pub const OIDC_ID_TOKEN: &str = "id-token";
pub const OIDC_REFRESH_TOKEN: &str = "refresh-token";
pub const OIDC_CLIENT_ID: &str = "client-id";
pub const OIDC_CLIENT_SECRET: &str = "client-secret";
pub const OIDC_ISSUER_URL: &str = "idp-issuer-url";

// =============================================================================
// Credential Lifecycle Defaults
// =============================================================================

/// Safety margin subtracted from an identity token's expiry.
///
/// A token that expires within this window is treated as already expired so
/// it cannot lapse in the middle of a request.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 10;

/// Path appended to the issuer URL for the refresh-token grant.
pub const TOKEN_ENDPOINT_PATH: &str = "/connect/token";

/// Default timeout for the refresh-token HTTP call in seconds.
pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 30;

/// Maximum allowed refresh-token timeout in seconds.
pub const MAX_REFRESH_TIMEOUT_SECS: u64 = 300;

/// Default namespace when neither the context nor an override names one.
pub const DEFAULT_NAMESPACE: &str = "default";

// =============================================================================
// Proxy Throttling Defaults
// =============================================================================

/// Default sustained proxy request rate (requests per second).
pub const DEFAULT_PROXY_QPS: f64 = 5.0;

/// Smallest accepted proxy request rate: one request every 1000 seconds.
pub const MIN_PROXY_QPS: f64 = 0.001;

/// Default proxy request burst size.
pub const DEFAULT_PROXY_BURST: u32 = 10;
