//! Testing utilities for kubelink client tests.
//!
//! This module provides helpers for building credential files, synthetic
//! id-tokens and throwaway certificate authorities.
//! Available when running tests or when the `test-utils` feature is enabled.
//!
//! # Example
//! ```ignore
//! use kubelink_client::testing::{KubeconfigBuilder, synthetic_id_token};
//!
//! let yaml = KubeconfigBuilder::new()
//!     .cluster("c1", "https://api.example.com")
//!     .oidc_user("u1", "https://issuer", None, Some("r0"))
//!     .context("prod", "c1", "u1", None)
//!     .current_context("prod")
//!     .to_yaml();
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde_json::{Value, json};

/// An unsigned JWT-shaped token whose payload carries `exp`.
pub fn synthetic_id_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": "tester", "exp": exp }).to_string());
    format!("{header}.{payload}.signature")
}

/// A synthetic id-token valid for the next hour.
pub fn fresh_id_token() -> String {
    synthetic_id_token(chrono::Utc::now().timestamp() + 3600)
}

/// Base64-encoded PEM of a self-signed CA, generated once per process.
///
/// # Panics
/// If certificate generation fails.
pub fn test_ca_data() -> &'static str {
    static CA: OnceLock<String> = OnceLock::new();
    CA.get_or_init(|| {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
            .expect("Failed to generate test certificate");
        STANDARD.encode(certified.cert.pem())
    })
}

/// Write `content` to `dir/name` and return the path.
///
/// # Panics
/// If the file cannot be written.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content)
        .unwrap_or_else(|e| panic!("Failed to write {}: {e}", path.display()));
    path
}

/// Builds credential files in the standard kubeconfig layout.
///
/// Every cluster served over https carries [`test_ca_data`] so that
/// connection handles can be built without system trust roots.
#[derive(Debug, Default)]
pub struct KubeconfigBuilder {
    current_context: Option<String>,
    clusters: Vec<Value>,
    users: Vec<Value>,
    contexts: Vec<Value>,
}

impl KubeconfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_context(mut self, name: &str) -> Self {
        self.current_context = Some(name.to_string());
        self
    }

    pub fn cluster(mut self, name: &str, server: &str) -> Self {
        let mut cluster = json!({ "server": server });
        if server.starts_with("https://") {
            cluster["certificate-authority-data"] = json!(test_ca_data());
        }
        self.clusters.push(json!({ "name": name, "cluster": cluster }));
        self
    }

    /// Add an OIDC identity. Omitted tokens are left out of the file.
    pub fn oidc_user(
        self,
        name: &str,
        issuer: &str,
        id_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Self {
        let mut config = BTreeMap::from([
            ("client-id".to_string(), "kubelink".to_string()),
            ("client-secret".to_string(), "kubelink-secret".to_string()),
            ("idp-issuer-url".to_string(), issuer.to_string()),
        ]);
        if let Some(token) = id_token {
            config.insert("id-token".to_string(), token.to_string());
        }
        if let Some(token) = refresh_token {
            config.insert("refresh-token".to_string(), token.to_string());
        }
        self.auth_provider_user(name, "oidc", config)
    }

    pub fn auth_provider_user(
        mut self,
        name: &str,
        kind: &str,
        config: BTreeMap<String, String>,
    ) -> Self {
        self.users.push(json!({
            "name": name,
            "user": { "auth-provider": { "name": kind, "config": config } }
        }));
        self
    }

    pub fn token_user(mut self, name: &str, token: &str) -> Self {
        self.users
            .push(json!({ "name": name, "user": { "token": token } }));
        self
    }

    pub fn context(mut self, name: &str, cluster: &str, user: &str, namespace: Option<&str>) -> Self {
        let mut context = json!({ "cluster": cluster, "user": user });
        if let Some(namespace) = namespace {
            context["namespace"] = json!(namespace);
        }
        self.contexts.push(json!({ "name": name, "context": context }));
        self
    }

    /// Render as YAML.
    ///
    /// # Panics
    /// If serialization fails.
    pub fn to_yaml(&self) -> String {
        let mut doc = json!({
            "apiVersion": "v1",
            "kind": "Config",
            "preferences": {},
            "clusters": self.clusters,
            "users": self.users,
            "contexts": self.contexts,
        });
        if let Some(current) = &self.current_context {
            doc["current-context"] = json!(current);
        }
        serde_yaml::to_string(&doc).expect("Failed to render kubeconfig")
    }

    /// Render and write to `dir/name`.
    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        write_file(dir, name, &self.to_yaml())
    }
}
