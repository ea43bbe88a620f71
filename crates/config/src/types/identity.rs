//! Identity records and auth-provider configuration.

use std::collections::BTreeMap;

use secrecy::{ExposeSecret, SecretString};

use crate::constants::{
    OIDC_CLIENT_ID, OIDC_CLIENT_SECRET, OIDC_ID_TOKEN, OIDC_ISSUER_URL, OIDC_PROVIDER_KIND,
    OIDC_REFRESH_TOKEN,
};

/// A named identity from the credential file.
#[derive(Debug, Clone, Default)]
pub struct IdentityRecord {
    pub auth_provider: Option<AuthProvider>,
}

impl IdentityRecord {
    /// OIDC configuration, when this identity uses the bearer/OIDC flow.
    pub fn oidc(&self) -> Option<&OidcConfig> {
        match &self.auth_provider {
            Some(AuthProvider::Oidc(config)) => Some(config),
            _ => None,
        }
    }
}

/// Auth-provider block of an identity, discriminated by provider kind.
#[derive(Debug, Clone)]
pub enum AuthProvider {
    Oidc(OidcConfig),
    /// Any other provider kind, passed through untouched.
    Opaque {
        kind: String,
        config: BTreeMap<String, String>,
    },
}

impl AuthProvider {
    /// Build from the provider kind and its string map, as stored in the file.
    pub fn from_parts(kind: &str, config: BTreeMap<String, String>) -> Self {
        if kind == OIDC_PROVIDER_KIND {
            Self::Oidc(OidcConfig::from_map(config))
        } else {
            Self::Opaque {
                kind: kind.to_string(),
                config,
            }
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Oidc(_) => OIDC_PROVIDER_KIND,
            Self::Opaque { kind, .. } => kind,
        }
    }

    /// Flatten back into the string map written to the credential file.
    ///
    /// This exposes secret values and must only be used for persistence.
    pub fn to_config_map(&self) -> BTreeMap<String, String> {
        match self {
            Self::Oidc(config) => config.to_map(),
            Self::Opaque { config, .. } => config.clone(),
        }
    }
}

/// Configuration of the bearer/OIDC provider.
///
/// Keys other than the five named ones are kept in `extra` so that a
/// refresh never drops unrelated provider configuration. A named key with a
/// blank value is treated as absent but also stays in `extra`, so it is
/// written back unchanged unless a real value replaces it.
#[derive(Debug, Clone, Default)]
pub struct OidcConfig {
    pub id_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub issuer_url: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl OidcConfig {
    pub fn from_map(mut map: BTreeMap<String, String>) -> Self {
        let mut blanks = BTreeMap::new();
        let mut take = |key: &str| match map.remove(key) {
            Some(value) if value.trim().is_empty() => {
                blanks.insert(key.to_string(), value);
                None
            }
            value => value,
        };

        let id_token = take(OIDC_ID_TOKEN).map(SecretString::from);
        let refresh_token = take(OIDC_REFRESH_TOKEN).map(SecretString::from);
        let client_id = take(OIDC_CLIENT_ID);
        let client_secret = take(OIDC_CLIENT_SECRET).map(SecretString::from);
        let issuer_url = take(OIDC_ISSUER_URL);
        map.extend(blanks);

        Self {
            id_token,
            refresh_token,
            client_id,
            client_secret,
            issuer_url,
            extra: map,
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = self.extra.clone();
        let secrets = [
            (OIDC_ID_TOKEN, &self.id_token),
            (OIDC_REFRESH_TOKEN, &self.refresh_token),
            (OIDC_CLIENT_SECRET, &self.client_secret),
        ];
        for (key, value) in secrets {
            if let Some(value) = value {
                map.insert(key.to_string(), value.expose_secret().to_string());
            }
        }
        if let Some(client_id) = &self.client_id {
            map.insert(OIDC_CLIENT_ID.to_string(), client_id.clone());
        }
        if let Some(issuer_url) = &self.issuer_url {
            map.insert(OIDC_ISSUER_URL.to_string(), issuer_url.clone());
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oidc_map() -> BTreeMap<String, String> {
        BTreeMap::from([
            (OIDC_ID_TOKEN.to_string(), "id-secret".to_string()),
            (OIDC_REFRESH_TOKEN.to_string(), "refresh-secret".to_string()),
            (OIDC_CLIENT_ID.to_string(), "kubelink".to_string()),
            (OIDC_CLIENT_SECRET.to_string(), "client-pass".to_string()),
            (OIDC_ISSUER_URL.to_string(), "https://issuer".to_string()),
            ("extra-scopes".to_string(), "groups".to_string()),
        ])
    }

    #[test]
    fn test_oidc_kind_is_typed() {
        let provider = AuthProvider::from_parts("oidc", oidc_map());
        let AuthProvider::Oidc(config) = &provider else {
            panic!("expected oidc provider");
        };
        assert_eq!(config.client_id.as_deref(), Some("kubelink"));
        assert_eq!(config.issuer_url.as_deref(), Some("https://issuer"));
        assert_eq!(config.extra.get("extra-scopes").map(String::as_str), Some("groups"));
        assert_eq!(provider.kind(), "oidc");
    }

    #[test]
    fn test_unknown_kind_is_opaque_pass_through() {
        let map = BTreeMap::from([("access-token".to_string(), "x".to_string())]);
        let provider = AuthProvider::from_parts("gcp", map.clone());
        assert_eq!(provider.kind(), "gcp");
        assert_eq!(provider.to_config_map(), map);
    }

    #[test]
    fn test_oidc_map_preserves_every_key() {
        let provider = AuthProvider::from_parts("oidc", oidc_map());
        assert_eq!(provider.to_config_map(), oidc_map());
    }

    #[test]
    fn test_blank_token_treated_as_absent() {
        let map = BTreeMap::from([(OIDC_ID_TOKEN.to_string(), "  ".to_string())]);
        let config = OidcConfig::from_map(map);
        assert!(config.id_token.is_none());
    }

    #[test]
    fn test_blank_keys_survive_round_trip() {
        let map = BTreeMap::from([
            (OIDC_CLIENT_SECRET.to_string(), String::new()),
            (OIDC_REFRESH_TOKEN.to_string(), "r0".to_string()),
        ]);
        let provider = AuthProvider::from_parts("oidc", map.clone());

        let AuthProvider::Oidc(config) = &provider else {
            panic!("expected oidc provider");
        };
        assert!(config.client_secret.is_none());
        assert_eq!(provider.to_config_map(), map);
    }

    #[test]
    fn test_real_value_replaces_blank_key() {
        let map = BTreeMap::from([(OIDC_ID_TOKEN.to_string(), " ".to_string())]);
        let mut config = OidcConfig::from_map(map);
        config.id_token = Some("fresh".to_string().into());

        assert_eq!(config.to_map().get(OIDC_ID_TOKEN).map(String::as_str), Some("fresh"));
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let config = OidcConfig::from_map(oidc_map());
        let debug = format!("{config:?}");
        assert!(!debug.contains("id-secret"));
        assert!(!debug.contains("refresh-secret"));
        assert!(!debug.contains("client-pass"));
        assert!(debug.contains("kubelink"));
    }
}
