//! Connection manager: owns the live, swappable connection handle.
//!
//! Responsibilities:
//! - Load the snapshot, refresh the selected identity, and build the first handle.
//! - Switch contexts by building a new handle and swapping it in atomically.
//! - Expose context/namespace/cluster accessors and the workload operations
//!   (watch, tunnel, proxy) bound to the current handle.
//!
//! Does NOT handle:
//! - Background refresh; freshness is only checked when a handle is built
//!   by `create` or [`ConnectionManager::refresh_credentials`].
//! - Retrying any operation.
//!
//! Invariants:
//! - The current handle is replaced wholesale, never mutated; callers holding
//!   an older `Arc<ConnectionHandle>` keep a consistent view.
//! - A failed build leaves the previous handle in place.
//! - `set_context` never writes to the credential file.

use std::sync::{Arc, PoisonError, RwLock};

use futures::TryStreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{WatchEvent, WatchParams};
use kubelink_config::{
    ConfigSnapshot, ConnectionSettings, ContextOverrides, CredentialPersister, CredentialSource,
    FilePersister, IdentityRecord,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{ClientError, Result};
use crate::handle::ConnectionHandle;
use crate::provider::{AuthProviderHandler, ProviderRegistry};
use crate::proxy::ProxyHandle;
use crate::refresh::CredentialRefresher;
use crate::throttle::RequestThrottle;
use crate::tunnel::{TunnelFactory, parse_port_mappings};

/// Kind of a pod watch event passed to the watch callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
}

/// Builder for [`ConnectionManager`].
pub struct ConnectionManagerBuilder {
    source: Option<CredentialSource>,
    overrides: ContextOverrides,
    settings: ConnectionSettings,
    persister: Arc<dyn CredentialPersister>,
    http_client: Option<reqwest::Client>,
    extra_providers: Vec<(String, Arc<dyn AuthProviderHandler>)>,
}

impl Default for ConnectionManagerBuilder {
    fn default() -> Self {
        Self {
            source: None,
            overrides: ContextOverrides::default(),
            settings: ConnectionSettings::default(),
            persister: Arc::new(FilePersister),
            http_client: None,
            extra_providers: Vec::new(),
        }
    }
}

impl ConnectionManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the credential source to load. Required.
    pub fn source(mut self, source: CredentialSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Context and namespace overrides; these beat the file and any overlay.
    pub fn overrides(mut self, overrides: ContextOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn settings(mut self, settings: ConnectionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Where refreshed credentials are written. Defaults to the credential file.
    pub fn persister(mut self, persister: Arc<dyn CredentialPersister>) -> Self {
        self.persister = persister;
        self
    }

    /// HTTP client used for refresh-token grants.
    ///
    /// Overrides the timeout from [`ConnectionSettings`].
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Register an auth-provider handler for `kind`, in addition to OIDC.
    pub fn provider(mut self, kind: impl Into<String>, handler: Arc<dyn AuthProviderHandler>) -> Self {
        self.extra_providers.push((kind.into(), handler));
        self
    }

    /// Load the snapshot, refresh the selected identity if needed, and build
    /// the first handle.
    ///
    /// # Errors
    /// Any configuration, refresh, persistence or resolution failure; no
    /// manager is returned in that case.
    pub async fn create(self) -> Result<ConnectionManager> {
        let source = self.source.ok_or_else(|| {
            ClientError::InvalidRequest("connection manager requires a credential source".into())
        })?;

        let refresher = match self.http_client {
            Some(http) => CredentialRefresher::with_http_client(http, self.persister),
            None => CredentialRefresher::new(self.settings.refresh_timeout, self.persister)?,
        };
        let mut registry = ProviderRegistry::with_oidc(refresher);
        for (kind, handler) in self.extra_providers {
            registry.register(kind, handler);
        }

        let snapshot = ConfigSnapshot::load(source)?;
        let resolved = snapshot.resolve_current(&self.overrides)?;

        let refreshed = refresh_identity(&snapshot, &resolved.identity_name, &registry).await?;
        let refreshed_on_create = refreshed.is_some();
        let snapshot = refreshed.unwrap_or(snapshot);
        let resolved = snapshot.resolve(&resolved.context, Some(&resolved.namespace))?;

        let handle = ConnectionHandle::build(&snapshot, &resolved, &registry).await?;
        info!(
            context = handle.context(),
            namespace = handle.namespace(),
            server = %handle.server(),
            "Connected"
        );

        Ok(ConnectionManager {
            snapshot: RwLock::new(Arc::new(snapshot)),
            handle: RwLock::new(Arc::new(handle)),
            registry,
            refreshed_on_create,
            throttle: Arc::new(RequestThrottle::new(
                self.settings.proxy_qps,
                self.settings.proxy_burst,
            )),
        })
    }
}

/// Run the registered handler for `identity`, returning the replacement
/// snapshot when its credentials changed.
async fn refresh_identity(
    snapshot: &ConfigSnapshot,
    identity: &str,
    registry: &ProviderRegistry,
) -> Result<Option<ConfigSnapshot>> {
    let Some(provider) = snapshot
        .identities()
        .get(identity)
        .and_then(|record| record.auth_provider.as_ref())
    else {
        return Ok(None);
    };
    let Some(handler) = registry.get(provider.kind()) else {
        debug!(identity, kind = provider.kind(), "No handler registered for provider");
        return Ok(None);
    };

    let updated = handler
        .ensure_fresh(snapshot.source(), identity, provider)
        .await?;
    Ok(updated.map(|provider| {
        snapshot.with_identity(
            identity,
            IdentityRecord {
                auth_provider: Some(provider),
            },
        )
    }))
}

/// Owns the current connection handle and the snapshot it was built from.
pub struct ConnectionManager {
    snapshot: RwLock<Arc<ConfigSnapshot>>,
    handle: RwLock<Arc<ConnectionHandle>>,
    registry: ProviderRegistry,
    refreshed_on_create: bool,
    throttle: Arc<RequestThrottle>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("handle", &self.handle())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    pub fn builder() -> ConnectionManagerBuilder {
        ConnectionManagerBuilder::new()
    }

    /// Whether `create` had to refresh the selected identity's credentials.
    pub fn refreshed_on_create(&self) -> bool {
        self.refreshed_on_create
    }

    /// The current handle. Stays valid after later context switches.
    pub fn handle(&self) -> Arc<ConnectionHandle> {
        self.handle
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The snapshot handles are built from.
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn client(&self) -> kube::Client {
        self.handle().client()
    }

    pub fn current_context(&self) -> String {
        self.handle().context().to_string()
    }

    pub fn current_namespace(&self) -> String {
        self.handle().namespace().to_string()
    }

    pub fn current_cluster(&self) -> String {
        self.handle().cluster().to_string()
    }

    /// Switch to context `name` using the in-memory snapshot.
    ///
    /// Credentials are not refreshed; call [`Self::refresh_credentials`]
    /// afterwards when needed. On failure the previous handle stays active.
    pub async fn set_context(&self, name: &str) -> Result<()> {
        let snapshot = self.snapshot();
        let resolved = snapshot.resolve(name, None)?;
        let handle = ConnectionHandle::build(&snapshot, &resolved, &self.registry).await?;

        self.swap_handle(handle);
        info!(context = name, "Switched context");
        Ok(())
    }

    /// Refresh the current identity's credentials if they are stale.
    ///
    /// When a refresh happens the snapshot and handle are both replaced.
    /// Returns whether a refresh happened.
    pub async fn refresh_credentials(&self) -> Result<bool> {
        let snapshot = self.snapshot();
        let current = self.handle();

        let Some(next) = refresh_identity(&snapshot, current.identity(), &self.registry).await?
        else {
            return Ok(false);
        };

        let resolved = next.resolve(current.context(), Some(current.namespace()))?;
        let handle = ConnectionHandle::build(&next, &resolved, &self.registry).await?;

        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        self.swap_handle(handle);
        Ok(true)
    }

    /// Watch pods in the current namespace, calling `callback` for every
    /// added, modified or deleted pod until the stream ends or the callback
    /// fails.
    pub async fn watch_pods<F, E>(&self, params: &WatchParams, mut callback: F) -> std::result::Result<(), E>
    where
        F: FnMut(&Pod, WatchEventType) -> std::result::Result<(), E>,
        E: From<ClientError>,
    {
        let pods = self.handle().pods();
        let stream = pods
            .watch(params, "0")
            .await
            .map_err(|e| E::from(ClientError::Api(e)))?;
        let mut stream = std::pin::pin!(stream);

        while let Some(event) = stream
            .try_next()
            .await
            .map_err(|e| E::from(ClientError::Api(e)))?
        {
            match event {
                WatchEvent::Added(pod) => callback(&pod, WatchEventType::Added)?,
                WatchEvent::Modified(pod) => callback(&pod, WatchEventType::Modified)?,
                WatchEvent::Deleted(pod) => callback(&pod, WatchEventType::Deleted)?,
                WatchEvent::Bookmark(_) => {}
                WatchEvent::Error(status) => {
                    return Err(E::from(ClientError::Api(kube::Error::Api(status))));
                }
            }
        }
        Ok(())
    }

    /// Tunnel factory bound to the current handle's namespace.
    pub fn tunnel(&self) -> TunnelFactory {
        TunnelFactory::new(&self.handle())
    }

    /// Parse `mappings` and tunnel to `pod` until `stop` is cancelled.
    pub async fn open_tunnel<S: AsRef<str>>(
        &self,
        pod: &str,
        mappings: &[S],
        stop: CancellationToken,
    ) -> Result<()> {
        let mappings = parse_port_mappings(mappings)?;
        self.tunnel().open(pod, &mappings, stop).await
    }

    /// Proxy sub-client for `kind/name` in `namespace`. Performs no I/O.
    pub fn proxy(&self, namespace: &str, kind: &str, name: &str) -> ProxyHandle {
        ProxyHandle::new(&self.handle(), namespace, kind, name, self.throttle.clone())
    }

    pub fn proxy_pod(&self, namespace: &str, name: &str) -> ProxyHandle {
        self.proxy(namespace, "pods", name)
    }

    pub fn proxy_service(&self, namespace: &str, name: &str) -> ProxyHandle {
        self.proxy(namespace, "services", name)
    }

    fn swap_handle(&self, handle: ConnectionHandle) {
        *self.handle.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(handle);
    }
}
