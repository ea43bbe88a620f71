//! Environment variable helpers.
//!
//! Invariants:
//! - Empty or whitespace-only environment variables are treated as unset.
//! - Returned values are trimmed (leading/trailing whitespace removed).

/// Read an environment variable, returning None if unset, empty, or whitespace-only.
/// Returns the trimmed value (leading/trailing whitespace removed) if present.
pub fn env_var_or_none(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == s.len() {
            // No trimming needed, return original to avoid allocation
            Some(s)
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Read a boolean flag variable. `true`/`1` (case-insensitive) enable it.
pub fn env_flag(key: &str) -> bool {
    env_var_or_none(key)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_var_or_none_filters_empty_and_whitespace_strings() {
        let key = "_KUBELINK_TEST_VAR";
        assert!(env_var_or_none(key).is_none());

        temp_env::with_vars([(key, Some(""))], || {
            assert!(env_var_or_none(key).is_none());
        });

        temp_env::with_vars([(key, Some("   "))], || {
            assert!(env_var_or_none(key).is_none());
        });

        temp_env::with_vars([(key, Some(" /tmp/kubeconfig "))], || {
            assert_eq!(env_var_or_none(key), Some("/tmp/kubeconfig".to_string()));
        });
    }

    #[test]
    #[serial]
    fn test_env_flag_accepts_true_and_one() {
        let key = "_KUBELINK_TEST_FLAG";
        temp_env::with_vars([(key, Some("TRUE"))], || assert!(env_flag(key)));
        temp_env::with_vars([(key, Some("1"))], || assert!(env_flag(key)));
        temp_env::with_vars([(key, Some("no"))], || assert!(!env_flag(key)));
        temp_env::with_vars([(key, None::<&str>)], || assert!(!env_flag(key)));
    }
}
