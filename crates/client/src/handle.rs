//! The live connection handle.
//!
//! Responsibilities:
//! - Turn a resolved context into a ready-to-use `kube::Client`.
//! - Hand bearer tokens from registered auth-provider handlers to the transport.
//!
//! Does NOT handle:
//! - Refreshing credentials (see `provider.rs` and `refresh.rs`).
//! - Swapping handles (see `manager.rs`).
//!
//! Invariants:
//! - A handle is immutable once built; replacing one never affects callers
//!   still holding the old one.
//! - Building either yields a complete handle or a `ResolutionError`.

use std::fmt;

use k8s_openapi::api::core::v1::Pod;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use kubelink_config::{ConfigSnapshot, ResolutionError, ResolvedContext, document};
use secrecy::ExposeSecret;
use tracing::debug;
use url::Url;

use crate::error::Result;
use crate::provider::ProviderRegistry;

/// Install the process-wide rustls crypto provider if none is set yet.
pub(crate) fn ensure_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Transport configuration and typed API surface for one context.
#[derive(Clone)]
pub struct ConnectionHandle {
    context: String,
    namespace: String,
    cluster: String,
    server: Url,
    identity: String,
    config: Config,
    client: Client,
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("context", &self.context)
            .field("namespace", &self.namespace)
            .field("cluster", &self.cluster)
            .field("server", &self.server.as_str())
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl ConnectionHandle {
    /// Build a handle for `resolved` from the snapshot's raw document.
    pub async fn build(
        snapshot: &ConfigSnapshot,
        resolved: &ResolvedContext,
        registry: &ProviderRegistry,
    ) -> Result<Self> {
        let fail = |message: String| ResolutionError::Handle {
            context: resolved.context.clone(),
            message,
        };

        let mut doc = snapshot.document().clone();
        if let Some(provider) = &resolved.identity.auth_provider
            && let Some(handler) = registry.get(provider.kind())
        {
            let token = handler.bearer_token(provider).ok_or_else(|| {
                fail(format!(
                    "identity '{}' has no usable token, log in again",
                    resolved.identity_name
                ))
            })?;
            document::replace_auth_provider_with_token(
                &mut doc,
                &resolved.identity_name,
                token.expose_secret(),
            );
        }

        let kubeconfig: Kubeconfig =
            serde_yaml::from_value(doc).map_err(|e| fail(e.to_string()))?;
        let options = KubeConfigOptions {
            context: Some(resolved.context.clone()),
            cluster: None,
            user: None,
        };

        let mut config = Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(|e| fail(e.to_string()))?;
        config.default_namespace = resolved.namespace.clone();

        ensure_crypto_provider();
        let client = Client::try_from(config.clone()).map_err(|e| fail(e.to_string()))?;

        debug!(
            context = %resolved.context,
            namespace = %resolved.namespace,
            cluster = %resolved.cluster_name,
            "Built connection handle"
        );

        Ok(Self {
            context: resolved.context.clone(),
            namespace: resolved.namespace.clone(),
            cluster: resolved.cluster_name.clone(),
            server: resolved.server.clone(),
            identity: resolved.identity_name.clone(),
            config,
            client,
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Resolved transport configuration (server, TLS and auth material).
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Pods in the handle's namespace.
    pub fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}
