//! Shared test utilities for kubelink CLI integration tests.
//!
//! Responsibilities:
//! - Provide a hermetic CLI command factory rooted in a temporary directory.
//! - Write credential files for the commands under test.
//!
//! Invariants / Assumptions:
//! - Every command runs with its working directory and HOME set to the test's
//!   temporary directory, so host credentials never leak in.
//! - `KUBELINK_*` variables from the host are cleared.

use std::path::Path;

use assert_cmd::Command;

#[allow(unused_imports)]
pub use kubelink_client::testing::{KubeconfigBuilder, fresh_id_token, synthetic_id_token};

/// Returns a hermetic `kubelink` command running in `dir`.
pub fn kubelink_cmd(dir: &Path) -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("kubelink");

    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("KUBELINK_KUBECONFIG")
        .env_remove("KUBELINK_REFRESH_TIMEOUT")
        .env_remove("KUBELINK_PROXY_QPS")
        .env_remove("KUBELINK_PROXY_BURST")
        .env_remove("KUBELINK_NO_DEPRECATION_WARNINGS")
        .env_remove("RUST_LOG");

    cmd
}

/// Two contexts: `prod` (current, cluster `c1`) and `staging` (cluster `c2`,
/// namespace `apps`), both with fresh OIDC tokens.
#[allow(dead_code)]
pub fn two_context_kubeconfig() -> KubeconfigBuilder {
    let token = fresh_id_token();
    KubeconfigBuilder::new()
        .cluster("c1", "https://api.example.com")
        .cluster("c2", "https://staging.example.com")
        .oidc_user("u1", "https://issuer.invalid", Some(&token), Some("r0"))
        .oidc_user("u2", "https://issuer.invalid", Some(&token), Some("r0"))
        .context("prod", "c1", "u1", None)
        .context("staging", "c2", "u2", Some("apps"))
        .current_context("prod")
}

/// A single context `local` whose cluster is `server`.
#[allow(dead_code)]
pub fn api_server_kubeconfig(server: &str) -> KubeconfigBuilder {
    KubeconfigBuilder::new()
        .cluster("local", server)
        .oidc_user("u1", "https://issuer.invalid", Some(&fresh_id_token()), Some("r0"))
        .context("local", "local", "u1", None)
        .current_context("local")
}
