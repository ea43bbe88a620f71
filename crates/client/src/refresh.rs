//! Refresh-token exchange for OIDC identities.
//!
//! Responsibilities:
//! - Exchange a refresh token for a new id-token at `{issuer}/connect/token`.
//! - Merge the issued tokens into a copy of the identity's configuration.
//! - Persist the merged configuration exactly once per refresh.
//!
//! Does NOT handle:
//! - Retrying; a failed grant surfaces immediately.
//! - Swapping the in-memory snapshot (see `manager.rs`).
//!
//! Invariants:
//! - A still-valid token never triggers a network call.
//! - Keys absent from the token response are carried over unchanged.
//! - A persistence failure fails the refresh.

use std::sync::Arc;
use std::time::Duration;

use kubelink_config::constants::TOKEN_ENDPOINT_PATH;
use kubelink_config::{AuthProvider, CredentialPersister, CredentialSource, OidcConfig};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::handle::ensure_crypto_provider;
use crate::token::TokenFreshnessChecker;

const INVALID_GRANT: &str = "invalid_grant";

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
}

/// Result of [`CredentialRefresher::refresh_if_needed`].
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// The identity configuration to use from now on.
    pub config: OidcConfig,
    /// Whether a new id-token was obtained and persisted.
    pub refreshed: bool,
}

/// Performs the refresh-token grant and persists the result.
pub struct CredentialRefresher {
    http: reqwest::Client,
    checker: TokenFreshnessChecker,
    persister: Arc<dyn CredentialPersister>,
}

impl std::fmt::Debug for CredentialRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRefresher")
            .field("checker", &self.checker)
            .finish_non_exhaustive()
    }
}

impl CredentialRefresher {
    /// Create a refresher whose token requests time out after `timeout`.
    pub fn new(timeout: Duration, persister: Arc<dyn CredentialPersister>) -> Result<Self> {
        ensure_crypto_provider();
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http_client(http, persister))
    }

    /// Create a refresher that issues token requests through `http`.
    pub fn with_http_client(http: reqwest::Client, persister: Arc<dyn CredentialPersister>) -> Self {
        Self {
            http,
            checker: TokenFreshnessChecker::new(),
            persister,
        }
    }

    /// Refresh `config` if its id-token is missing or about to expire.
    ///
    /// Identities without a refresh token are returned unchanged.
    ///
    /// # Errors
    /// - [`ClientError::TokenDecode`] if the current id-token is corrupt.
    /// - [`ClientError::ExpiredSession`] if the provider rejected the grant.
    /// - [`ClientError::RefreshTransport`] for any other grant failure.
    /// - [`ClientError::Persist`] if the new credentials could not be saved.
    pub async fn refresh_if_needed(
        &self,
        source: &CredentialSource,
        identity: &str,
        config: &OidcConfig,
    ) -> Result<RefreshOutcome> {
        let unchanged = || RefreshOutcome {
            config: config.clone(),
            refreshed: false,
        };

        if self.checker.is_valid(identity, config)? {
            debug!(identity, "Id-token still valid, skipping refresh");
            return Ok(unchanged());
        }

        let Some(refresh_token) = &config.refresh_token else {
            debug!(identity, "Id-token stale but no refresh token present");
            return Ok(unchanged());
        };

        let issued = self.request_grant(identity, config, refresh_token).await?;

        let mut next = config.clone();
        next.id_token = Some(issued.id_token);
        if let Some(rotated) = issued.refresh_token {
            next.refresh_token = Some(rotated);
        }

        self.persister
            .persist(source, identity, &AuthProvider::Oidc(next.clone()))?;

        info!(identity, path = %source.path().display(), "Refreshed credentials");
        Ok(RefreshOutcome {
            config: next,
            refreshed: true,
        })
    }

    async fn request_grant(
        &self,
        identity: &str,
        config: &OidcConfig,
        refresh_token: &SecretString,
    ) -> Result<IssuedTokens> {
        let transport = |message: String| ClientError::RefreshTransport {
            identity: identity.to_string(),
            message,
        };

        let issuer = config
            .issuer_url
            .as_deref()
            .ok_or_else(|| transport("identity has no idp-issuer-url".to_string()))?;
        let url = format!("{}{}", issuer.trim_end_matches('/'), TOKEN_ENDPOINT_PATH);

        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret()),
        ];
        if let Some(client_id) = &config.client_id {
            form.push(("client_id", client_id.as_str()));
        }
        if let Some(client_secret) = &config.client_secret {
            form.push(("client_secret", client_secret.expose_secret()));
        }

        debug!(identity, issuer, "Requesting refresh-token grant");
        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| transport(e.to_string()))?;

        if !status.is_success() {
            let error = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error);
            if error.as_deref() == Some(INVALID_GRANT) || body.contains(INVALID_GRANT) {
                warn!(identity, "Refresh token rejected by provider");
                return Err(ClientError::ExpiredSession {
                    identity: identity.to_string(),
                });
            }
            return Err(transport(match error {
                Some(error) => format!("token endpoint returned {status}: {error}"),
                None => format!("token endpoint returned {status}"),
            }));
        }

        let tokens: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| transport(format!("malformed token response: {e}")))?;

        let id_token = tokens
            .id_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| transport("token response has no id_token".to_string()))?;

        Ok(IssuedTokens {
            id_token: SecretString::from(id_token),
            refresh_token: tokens
                .refresh_token
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
        })
    }
}

struct IssuedTokens {
    id_token: SecretString,
    refresh_token: Option<SecretString>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::synthetic_id_token;
    use kubelink_config::{PersistError, SourceOrigin};
    use std::path::PathBuf;
    use std::sync::Mutex;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingPersister {
        calls: Mutex<Vec<(String, AuthProvider)>>,
        fail: bool,
    }

    impl CredentialPersister for RecordingPersister {
        fn persist(
            &self,
            source: &CredentialSource,
            identity: &str,
            provider: &AuthProvider,
        ) -> std::result::Result<(), PersistError> {
            if self.fail {
                return Err(PersistError::IdentityNotFound {
                    path: source.path().to_path_buf(),
                    identity: identity.to_string(),
                });
            }
            self.calls
                .lock()
                .unwrap()
                .push((identity.to_string(), provider.clone()));
            Ok(())
        }
    }

    fn source() -> CredentialSource {
        CredentialSource::Primary {
            path: PathBuf::from("/tmp/kubeconfig"),
            origin: SourceOrigin::Explicit,
        }
    }

    fn stale_config(issuer: &str) -> OidcConfig {
        OidcConfig {
            id_token: None,
            refresh_token: Some("r0".to_string().into()),
            client_id: Some("kubelink".to_string()),
            client_secret: Some("s3cret".to_string().into()),
            issuer_url: Some(issuer.to_string()),
            extra: [("extra-scopes".to_string(), "groups".to_string())].into(),
        }
    }

    fn refresher(persister: Arc<RecordingPersister>) -> CredentialRefresher {
        CredentialRefresher::new(Duration::from_secs(5), persister).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let persister = Arc::new(RecordingPersister::default());
        let mut config = stale_config(&server.uri());
        config.id_token = Some(synthetic_id_token(chrono::Utc::now().timestamp() + 3600).into());

        let outcome = refresher(persister.clone())
            .refresh_if_needed(&source(), "u1", &config)
            .await
            .unwrap();

        assert!(!outcome.refreshed);
        assert!(persister.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_merges_and_persists_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/connect/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=r0"))
            .and(body_string_contains("client_id=kubelink"))
            .and(body_string_contains("client_secret=s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at",
                "token_type": "Bearer",
                "id_token": "new-id",
                "refresh_token": "r1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let persister = Arc::new(RecordingPersister::default());
        let outcome = refresher(persister.clone())
            .refresh_if_needed(&source(), "u1", &stale_config(&server.uri()))
            .await
            .unwrap();

        assert!(outcome.refreshed);
        assert_eq!(outcome.config.id_token.unwrap().expose_secret(), "new-id");
        assert_eq!(outcome.config.refresh_token.unwrap().expose_secret(), "r1");
        assert_eq!(outcome.config.extra.get("extra-scopes").unwrap(), "groups");

        let calls = persister.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "u1");
        assert_eq!(calls[0].1.to_config_map().get("id-token").unwrap(), "new-id");
    }

    #[tokio::test]
    async fn test_refresh_token_kept_when_not_rotated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/connect/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id_token": "new-id" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let persister = Arc::new(RecordingPersister::default());
        let outcome = refresher(persister)
            .refresh_if_needed(&source(), "u1", &stale_config(&server.uri()))
            .await
            .unwrap();

        assert_eq!(outcome.config.refresh_token.unwrap().expose_secret(), "r0");
    }

    #[tokio::test]
    async fn test_invalid_grant_is_expired_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "refresh token expired"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let persister = Arc::new(RecordingPersister::default());
        let err = refresher(persister.clone())
            .refresh_if_needed(&source(), "u1", &stale_config(&server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::ExpiredSession { .. }));
        assert!(err.requires_reauthentication());
        assert!(persister.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = refresher(Arc::new(RecordingPersister::default()))
            .refresh_if_needed(&source(), "u1", &stale_config(&server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::RefreshTransport { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_missing_id_token_in_response_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": "at" })),
            )
            .mount(&server)
            .await;

        let err = refresher(Arc::new(RecordingPersister::default()))
            .refresh_if_needed(&source(), "u1", &stale_config(&server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::RefreshTransport { ref message, .. } if message.contains("id_token")));
    }

    #[tokio::test]
    async fn test_persist_failure_fails_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id_token": "new-id" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let persister = Arc::new(RecordingPersister {
            fail: true,
            ..RecordingPersister::default()
        });
        let err = refresher(persister)
            .refresh_if_needed(&source(), "u1", &stale_config(&server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Persist(_)));
    }

    #[tokio::test]
    async fn test_no_refresh_token_is_noop() {
        let persister = Arc::new(RecordingPersister::default());
        let mut config = stale_config("http://127.0.0.1:9");
        config.refresh_token = None;

        let outcome = refresher(persister)
            .refresh_if_needed(&source(), "u1", &config)
            .await
            .unwrap();
        assert!(!outcome.refreshed);
    }

    #[tokio::test]
    async fn test_unreachable_issuer_is_transport_error() {
        let err = refresher(Arc::new(RecordingPersister::default()))
            .refresh_if_needed(&source(), "u1", &stale_config("http://127.0.0.1:9"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::RefreshTransport { .. }));
    }
}
