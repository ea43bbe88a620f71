//! Parsed view of a credential file.
//!
//! Responsibilities:
//! - Load the authoritative credential file into typed cluster, identity and
//!   context maps, keeping the raw document alongside.
//! - Compute the effective context, namespace and cluster, applying the
//!   legacy overlay when one is in effect.
//! - Resolve a context name into a fully validated [`ResolvedContext`].
//!
//! Does NOT handle:
//! - Choosing which file to load (see `locator`).
//! - Writing refreshed credentials back (see `persistence`).
//!
//! Invariants:
//! - A snapshot is never mutated after load; [`ConfigSnapshot::with_identity`]
//!   returns a new snapshot.
//! - The overlay overrides the effective context and namespace only; cluster
//!   and identity always resolve through `contexts[context]`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;
use url::Url;

use crate::constants::DEFAULT_NAMESPACE;
use crate::document;
use crate::error::{ConfigError, ResolutionError};
use crate::locator::CredentialSource;
use crate::overlay::LegacyOverlay;
use crate::types::{AuthProvider, ClusterEntry, ContextEntry, IdentityRecord};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawKubeconfig {
    #[serde(default)]
    clusters: Option<Vec<NamedCluster>>,
    #[serde(default)]
    users: Option<Vec<NamedUser>>,
    #[serde(default)]
    contexts: Option<Vec<NamedContext>>,
    #[serde(default)]
    current_context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: RawCluster,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawCluster {
    #[serde(default)]
    server: String,
    #[serde(default)]
    certificate_authority_data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    #[serde(default)]
    user: Option<RawUser>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawUser {
    #[serde(default)]
    auth_provider: Option<RawAuthProvider>,
}

#[derive(Debug, Deserialize)]
struct RawAuthProvider {
    name: String,
    #[serde(default)]
    config: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: RawContext,
}

#[derive(Debug, Deserialize)]
struct RawContext {
    cluster: String,
    user: String,
    #[serde(default)]
    namespace: Option<String>,
}

/// Caller-supplied selection that takes precedence over the file and overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextOverrides {
    pub context: Option<String>,
    pub namespace: Option<String>,
}

/// A context with every reference followed and validated.
#[derive(Debug, Clone)]
pub struct ResolvedContext {
    pub context: String,
    pub namespace: String,
    pub cluster_name: String,
    pub cluster: ClusterEntry,
    pub server: Url,
    pub identity_name: String,
    pub identity: IdentityRecord,
}

/// Immutable parsed view of one credential file.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    source: CredentialSource,
    clusters: BTreeMap<String, ClusterEntry>,
    identities: BTreeMap<String, IdentityRecord>,
    contexts: BTreeMap<String, ContextEntry>,
    current_context: Option<String>,
    document: Value,
}

impl ConfigSnapshot {
    /// Read and parse the file named by `source`.
    ///
    /// # Errors
    /// - [`ConfigError::NotLoggedIn`] if the file does not exist.
    /// - [`ConfigError::InvalidConfig`] if it is a directory or cannot be parsed.
    pub fn load(source: CredentialSource) -> Result<Self, ConfigError> {
        let path = source.path().to_path_buf();
        if path.is_dir() {
            return Err(ConfigError::invalid(&path, "expected a file, found a directory"));
        }

        let content = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotLoggedIn {
                    message: format!("credential file {} does not exist", path.display()),
                }
            } else {
                ConfigError::Read {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        let snapshot = Self::parse(source, &content)?;
        debug!(
            path = %path.display(),
            contexts = snapshot.contexts.len(),
            identities = snapshot.identities.len(),
            "Loaded credential file"
        );
        Ok(snapshot)
    }

    /// Parse credential file content that belongs to `source`.
    pub fn parse(source: CredentialSource, content: &str) -> Result<Self, ConfigError> {
        let invalid = |e: serde_yaml::Error| ConfigError::invalid(source.path(), e.to_string());

        let document: Value = serde_yaml::from_str(content).map_err(invalid)?;
        let raw: RawKubeconfig = if document.is_null() {
            RawKubeconfig::default()
        } else {
            serde_yaml::from_value(document.clone()).map_err(invalid)?
        };

        let clusters = raw
            .clusters
            .unwrap_or_default()
            .into_iter()
            .map(|c| {
                let entry = ClusterEntry {
                    server: c.cluster.server,
                    certificate_authority_data: c.cluster.certificate_authority_data,
                };
                (c.name, entry)
            })
            .collect();

        let identities = raw
            .users
            .unwrap_or_default()
            .into_iter()
            .map(|u| {
                let auth_provider = u.user.unwrap_or_default().auth_provider.map(|p| {
                    AuthProvider::from_parts(&p.name, p.config.unwrap_or_default())
                });
                (u.name, IdentityRecord { auth_provider })
            })
            .collect();

        let contexts = raw
            .contexts
            .unwrap_or_default()
            .into_iter()
            .map(|c| {
                let entry = ContextEntry {
                    cluster: c.context.cluster,
                    identity: c.context.user,
                    namespace: c.context.namespace.filter(|ns| !ns.trim().is_empty()),
                };
                (c.name, entry)
            })
            .collect();

        Ok(Self {
            source,
            clusters,
            identities,
            contexts,
            current_context: raw.current_context.filter(|c| !c.trim().is_empty()),
            document,
        })
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }

    pub fn path(&self) -> &Path {
        self.source.path()
    }

    pub fn overlay(&self) -> Option<&LegacyOverlay> {
        self.source.overlay()
    }

    pub fn clusters(&self) -> &BTreeMap<String, ClusterEntry> {
        &self.clusters
    }

    pub fn identities(&self) -> &BTreeMap<String, IdentityRecord> {
        &self.identities
    }

    pub fn contexts(&self) -> &BTreeMap<String, ContextEntry> {
        &self.contexts
    }

    /// The raw document as parsed, including fields the typed view ignores.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// The context selected by the file itself, ignoring any overlay.
    pub fn file_current_context(&self) -> Option<&str> {
        self.current_context.as_deref()
    }

    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.keys().map(String::as_str).collect()
    }

    /// The effective context: the overlay's when one is in effect, else the file's.
    ///
    /// # Errors
    /// [`ResolutionError::NoCurrentContext`] if neither names one, or
    /// [`ResolutionError::UnknownContext`] if the name does not key into `contexts`.
    pub fn effective_context(&self) -> Result<&str, ResolutionError> {
        let name = match self.overlay() {
            Some(overlay) => overlay.context.as_str(),
            None => self
                .current_context
                .as_deref()
                .ok_or(ResolutionError::NoCurrentContext)?,
        };
        self.context(name)?;
        Ok(name)
    }

    /// The effective namespace: overlay, then the context's own, then `default`.
    pub fn effective_namespace(&self) -> Result<String, ResolutionError> {
        let name = self.effective_context()?;
        if let Some(overlay) = self.overlay() {
            return Ok(overlay.namespace.clone());
        }
        Ok(self.namespace_of(self.context(name)?))
    }

    /// Cluster name of the effective context, always via `contexts[context]`.
    pub fn effective_cluster(&self) -> Result<&str, ResolutionError> {
        let name = self.effective_context()?;
        Ok(self.context(name)?.cluster.as_str())
    }

    /// Resolve the context selected by `overrides`, the overlay, or the file,
    /// in that order of precedence.
    pub fn resolve_current(
        &self,
        overrides: &ContextOverrides,
    ) -> Result<ResolvedContext, ResolutionError> {
        match &overrides.context {
            Some(context) => self.resolve(context, overrides.namespace.as_deref()),
            None => {
                let context = self.effective_context()?;
                let namespace = overrides
                    .namespace
                    .as_deref()
                    .or(self.overlay().map(|o| o.namespace.as_str()));
                self.resolve(context, namespace)
            }
        }
    }

    /// Follow `name` to its cluster and identity and validate the server URL.
    ///
    /// Without a namespace override the context's own namespace (or
    /// `default`) is used.
    pub fn resolve(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<ResolvedContext, ResolutionError> {
        let context = self.context(name)?;

        let cluster = self.clusters.get(&context.cluster).ok_or_else(|| {
            ResolutionError::UnknownCluster {
                context: name.to_string(),
                cluster: context.cluster.clone(),
            }
        })?;

        let identity = self.identities.get(&context.identity).ok_or_else(|| {
            ResolutionError::UnknownIdentity {
                context: name.to_string(),
                identity: context.identity.clone(),
            }
        })?;

        let server = parse_server_url(&context.cluster, &cluster.server)?;

        let namespace = namespace
            .filter(|ns| !ns.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.namespace_of(context));

        Ok(ResolvedContext {
            context: name.to_string(),
            namespace,
            cluster_name: context.cluster.clone(),
            cluster: cluster.clone(),
            server,
            identity_name: context.identity.clone(),
            identity: identity.clone(),
        })
    }

    /// A copy of this snapshot with one identity record replaced.
    pub fn with_identity(&self, name: &str, record: IdentityRecord) -> Self {
        let mut next = self.clone();
        if let Some(provider) = &record.auth_provider {
            document::set_auth_provider_config(
                &mut next.document,
                name,
                &provider.to_config_map(),
            );
        }
        next.identities.insert(name.to_string(), record);
        next
    }

    fn context(&self, name: &str) -> Result<&ContextEntry, ResolutionError> {
        self.contexts
            .get(name)
            .ok_or_else(|| ResolutionError::UnknownContext(name.to_string()))
    }

    fn namespace_of(&self, context: &ContextEntry) -> String {
        context
            .namespace
            .clone()
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
    }
}

fn parse_server_url(cluster: &str, server: &str) -> Result<Url, ResolutionError> {
    let malformed = |message: String| ResolutionError::MalformedServerUrl {
        cluster: cluster.to_string(),
        server: server.to_string(),
        message,
    };

    let url = Url::parse(server).map_err(|e| malformed(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(malformed(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(malformed("missing host".to_string()));
    }
    Ok(url)
}
