//! Pluggable auth-provider handlers.
//!
//! Identities name an auth-provider kind in the credential file. A handler
//! registered for that kind keeps the identity's credentials fresh and turns
//! them into a bearer token for the transport. Kinds without a handler are
//! passed to the transport unchanged.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use kubelink_config::constants::OIDC_PROVIDER_KIND;
use kubelink_config::{AuthProvider, CredentialSource};
use secrecy::SecretString;

use crate::error::Result;
use crate::refresh::CredentialRefresher;

/// Handles one auth-provider kind.
pub trait AuthProviderHandler: Send + Sync {
    /// Bring the identity's credentials up to date.
    ///
    /// Returns the replacement provider config when it changed, after it has
    /// been persisted.
    fn ensure_fresh<'a>(
        &'a self,
        source: &'a CredentialSource,
        identity: &'a str,
        provider: &'a AuthProvider,
    ) -> BoxFuture<'a, Result<Option<AuthProvider>>>;

    /// Bearer token the transport should present for this identity.
    fn bearer_token(&self, provider: &AuthProvider) -> Option<SecretString>;
}

/// Handler for the bearer/OIDC flow.
#[derive(Debug)]
pub struct OidcProvider {
    refresher: CredentialRefresher,
}

impl OidcProvider {
    pub fn new(refresher: CredentialRefresher) -> Self {
        Self { refresher }
    }
}

impl AuthProviderHandler for OidcProvider {
    fn ensure_fresh<'a>(
        &'a self,
        source: &'a CredentialSource,
        identity: &'a str,
        provider: &'a AuthProvider,
    ) -> BoxFuture<'a, Result<Option<AuthProvider>>> {
        Box::pin(async move {
            let AuthProvider::Oidc(config) = provider else {
                return Ok(None);
            };
            let outcome = self
                .refresher
                .refresh_if_needed(source, identity, config)
                .await?;
            Ok(outcome
                .refreshed
                .then(|| AuthProvider::Oidc(outcome.config)))
        })
    }

    fn bearer_token(&self, provider: &AuthProvider) -> Option<SecretString> {
        match provider {
            AuthProvider::Oidc(config) => config.id_token.clone(),
            AuthProvider::Opaque { .. } => None,
        }
    }
}

/// Auth-provider handlers keyed by provider kind.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    handlers: HashMap<String, Arc<dyn AuthProviderHandler>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("ProviderRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the OIDC handler installed.
    pub fn with_oidc(refresher: CredentialRefresher) -> Self {
        let mut registry = Self::new();
        registry.register(OIDC_PROVIDER_KIND, Arc::new(OidcProvider::new(refresher)));
        registry
    }

    /// Register `handler` for `kind`, replacing any previous handler.
    pub fn register(&mut self, kind: impl Into<String>, handler: Arc<dyn AuthProviderHandler>) {
        self.handlers.insert(kind.into(), handler);
    }

    pub fn get(&self, kind: &str) -> Option<&Arc<dyn AuthProviderHandler>> {
        self.handlers.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubelink_config::{FilePersister, OidcConfig};
    use secrecy::ExposeSecret;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn oidc_registry() -> ProviderRegistry {
        let refresher =
            CredentialRefresher::new(Duration::from_secs(1), Arc::new(FilePersister)).unwrap();
        ProviderRegistry::with_oidc(refresher)
    }

    #[test]
    fn test_registry_lookup_by_kind() {
        let registry = oidc_registry();
        assert!(registry.contains("oidc"));
        assert!(registry.get("gcp").is_none());
        assert!(format!("{registry:?}").contains("oidc"));
    }

    #[test]
    fn test_oidc_bearer_token_is_id_token() {
        let registry = oidc_registry();
        let handler = registry.get("oidc").unwrap();

        let provider = AuthProvider::Oidc(OidcConfig {
            id_token: Some("tok".to_string().into()),
            ..OidcConfig::default()
        });
        let token = handler.bearer_token(&provider).unwrap();
        assert_eq!(token.expose_secret(), "tok");

        let opaque = AuthProvider::Opaque {
            kind: "gcp".to_string(),
            config: BTreeMap::new(),
        };
        assert!(handler.bearer_token(&opaque).is_none());
    }
}
