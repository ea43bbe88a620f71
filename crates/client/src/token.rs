//! Identity token freshness checks.
//!
//! Responsibilities:
//! - Decode the `exp` claim of an id-token.
//! - Decide whether the token is still valid, with a safety margin.
//!
//! Does NOT handle:
//! - Signature verification; the API server does that.
//! - Refreshing stale tokens (see `refresh.rs`).
//!
//! Invariants:
//! - A missing id-token is "invalid", not an error.
//! - A token whose payload cannot be decoded is an error, never "invalid".

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use kubelink_config::OidcConfig;
use kubelink_config::constants::TOKEN_EXPIRY_MARGIN_SECS;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::error::{ClientError, Result};

#[derive(Deserialize)]
struct ExpiryClaim {
    #[serde(default)]
    exp: i64,
}

/// Decode the `exp` claim (seconds since epoch) from a JWT-shaped token.
///
/// A payload without `exp` yields 0, which is always expired.
pub fn token_expiry(token: &str) -> std::result::Result<i64, String> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| "token has no payload segment".to_string())?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| format!("payload is not base64url: {e}"))?;
    let claim: ExpiryClaim =
        serde_json::from_slice(&bytes).map_err(|e| format!("payload is not valid JSON: {e}"))?;
    Ok(claim.exp)
}

/// Decides whether an identity's id-token can still be used.
#[derive(Debug, Clone, Copy)]
pub struct TokenFreshnessChecker {
    margin_secs: i64,
}

impl Default for TokenFreshnessChecker {
    fn default() -> Self {
        Self {
            margin_secs: TOKEN_EXPIRY_MARGIN_SECS,
        }
    }
}

impl TokenFreshnessChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check validity against the current wall clock.
    pub fn is_valid(&self, identity: &str, config: &OidcConfig) -> Result<bool> {
        self.is_valid_at(identity, config, chrono::Utc::now().timestamp())
    }

    /// Valid iff `now + margin` is strictly before the token's expiry.
    ///
    /// # Errors
    /// [`ClientError::TokenDecode`] if the id-token payload is corrupt.
    pub fn is_valid_at(&self, identity: &str, config: &OidcConfig, now: i64) -> Result<bool> {
        let Some(token) = &config.id_token else {
            return Ok(false);
        };

        let exp = token_expiry(token.expose_secret()).map_err(|reason| {
            ClientError::TokenDecode {
                identity: identity.to_string(),
                reason,
            }
        })?;

        Ok(now.saturating_add(self.margin_secs) < exp)
    }
}
