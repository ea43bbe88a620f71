//! In-place edits of a raw credential document.
//!
//! The credential file is kept as an untyped YAML value next to its typed
//! view so that edits touch only the keys they own; everything else in the
//! file (extensions, preferences, unknown fields) round-trips unchanged.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

const USERS_KEY: &str = "users";
const USER_KEY: &str = "user";
const AUTH_PROVIDER_KEY: &str = "auth-provider";
const CONFIG_KEY: &str = "config";
const TOKEN_KEY: &str = "token";

fn named_entry_mut<'a>(doc: &'a mut Value, list: &str, name: &str) -> Option<&'a mut Value> {
    doc.get_mut(list)?
        .as_sequence_mut()?
        .iter_mut()
        .find(|entry| entry.get("name").and_then(Value::as_str) == Some(name))
}

fn user_mut<'a>(doc: &'a mut Value, identity: &str) -> Option<&'a mut Mapping> {
    named_entry_mut(doc, USERS_KEY, identity)?
        .get_mut(USER_KEY)?
        .as_mapping_mut()
}

/// Replace `users[identity].user.auth-provider.config` with `config`.
///
/// Returns `false` when the identity has no auth-provider block.
pub fn set_auth_provider_config(
    doc: &mut Value,
    identity: &str,
    config: &BTreeMap<String, String>,
) -> bool {
    let Some(provider) = user_mut(doc, identity)
        .and_then(|user| user.get_mut(AUTH_PROVIDER_KEY))
        .and_then(Value::as_mapping_mut)
    else {
        return false;
    };

    let config: Mapping = config
        .iter()
        .map(|(key, value)| (Value::from(key.as_str()), Value::from(value.as_str())))
        .collect();
    provider.insert(Value::from(CONFIG_KEY), Value::Mapping(config));
    true
}

/// Swap an identity's auth-provider block for a static bearer token.
///
/// Used when the provider is handled in-process and the transport only needs
/// the resulting token. Returns `false` when the identity is absent.
pub fn replace_auth_provider_with_token(doc: &mut Value, identity: &str, token: &str) -> bool {
    let Some(user) = user_mut(doc, identity) else {
        return false;
    };
    user.remove(AUTH_PROVIDER_KEY);
    user.insert(Value::from(TOKEN_KEY), Value::from(token));
    true
}
