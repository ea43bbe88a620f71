//! Common test utilities for integration tests.
//!
//! This module provides shared helpers and re-exports commonly used types for
//! testing the connection manager against wiremock issuers and API servers.
//!
//! # Invariants
//! - Every credential file lives in a per-test temporary directory.
//! - Sources built here are explicit primary sources, so no test depends on
//!   the process working directory or home directory.
//!
//! # What this does NOT handle
//! - Mock server setup (use wiremock directly in tests)
//! - Test-specific assertions or test logic

use std::path::{Path, PathBuf};

#[allow(unused_imports)]
pub use kubelink_client::testing::{
    KubeconfigBuilder, fresh_id_token, synthetic_id_token, write_file,
};
#[allow(unused_imports)]
pub use kubelink_config::{CredentialSource, SourceOrigin};
#[allow(unused_imports)]
pub use wiremock::{Mock, MockServer, ResponseTemplate};

/// Explicit primary source for `path`.
#[allow(dead_code)]
pub fn primary_source(path: &Path) -> CredentialSource {
    CredentialSource::Primary {
        path: path.to_path_buf(),
        origin: SourceOrigin::Explicit,
    }
}

/// The standard single-context file: context `prod` on cluster `c1`
/// (`https://api.example.com`) as OIDC identity `u1` issued by `issuer`.
#[allow(dead_code)]
pub fn prod_kubeconfig(issuer: &str, id_token: Option<&str>) -> KubeconfigBuilder {
    KubeconfigBuilder::new()
        .cluster("c1", "https://api.example.com")
        .oidc_user("u1", issuer, id_token, Some("r0"))
        .context("prod", "c1", "u1", None)
        .current_context("prod")
}

/// A file whose only cluster is the given API server, reached as OIDC
/// identity `u1` with a fresh token, in namespace `default`.
#[allow(dead_code)]
pub fn api_server_kubeconfig(server: &str, id_token: &str) -> KubeconfigBuilder {
    KubeconfigBuilder::new()
        .cluster("local", server)
        .oidc_user("u1", "https://issuer.invalid", Some(id_token), Some("r0"))
        .context("local", "local", "u1", None)
        .current_context("local")
}

/// Write `builder` into `dir` as `config` and return the path.
#[allow(dead_code)]
pub fn write_kubeconfig(dir: &Path, builder: &KubeconfigBuilder) -> PathBuf {
    builder.write_to(dir, "config")
}

/// The `id-token` stored for `identity` in the file at `path`.
#[allow(dead_code)]
pub fn stored_id_token(path: &Path, identity: &str) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let doc: serde_yaml::Value = serde_yaml::from_str(&content).ok()?;
    doc["users"]
        .as_sequence()?
        .iter()
        .find(|user| user["name"].as_str() == Some(identity))?["user"]["auth-provider"]["config"]
        ["id-token"]
        .as_str()
        .map(str::to_string)
}
