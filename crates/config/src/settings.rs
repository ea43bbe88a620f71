//! Tunable connection settings read from the environment.
//!
//! Invariants:
//! - Empty or whitespace-only environment variables are treated as unset.
//! - Invalid values return `ConfigError::InvalidValue`; they never fall back
//!   silently to a default.

use std::time::Duration;

use crate::constants::{
    DEFAULT_PROXY_BURST, DEFAULT_PROXY_QPS, DEFAULT_REFRESH_TIMEOUT_SECS, ENV_PROXY_BURST,
    ENV_PROXY_QPS, ENV_REFRESH_TIMEOUT, MAX_REFRESH_TIMEOUT_SECS, MIN_PROXY_QPS,
};
use crate::env::env_var_or_none;
use crate::error::ConfigError;

/// Timeouts and throttling for a connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionSettings {
    /// Timeout for the refresh-token HTTP call.
    pub refresh_timeout: Duration,
    /// Sustained proxy request rate, requests per second.
    pub proxy_qps: f64,
    /// Number of proxy requests allowed in a burst.
    pub proxy_burst: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            refresh_timeout: Duration::from_secs(DEFAULT_REFRESH_TIMEOUT_SECS),
            proxy_qps: DEFAULT_PROXY_QPS,
            proxy_burst: DEFAULT_PROXY_BURST,
        }
    }
}

impl ConnectionSettings {
    /// Defaults overridden by `KUBELINK_REFRESH_TIMEOUT`, `KUBELINK_PROXY_QPS`
    /// and `KUBELINK_PROXY_BURST`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(timeout) = env_var_or_none(ENV_REFRESH_TIMEOUT) {
            let secs: u64 = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                var: ENV_REFRESH_TIMEOUT.to_string(),
                message: "must be a number of seconds".to_string(),
            })?;
            if !(1..=MAX_REFRESH_TIMEOUT_SECS).contains(&secs) {
                return Err(ConfigError::InvalidValue {
                    var: ENV_REFRESH_TIMEOUT.to_string(),
                    message: format!(
                        "must be between 1 and {} (got {})",
                        MAX_REFRESH_TIMEOUT_SECS, secs
                    ),
                });
            }
            settings.refresh_timeout = Duration::from_secs(secs);
        }

        if let Some(qps) = env_var_or_none(ENV_PROXY_QPS) {
            let value: f64 = qps.parse().map_err(|_| ConfigError::InvalidValue {
                var: ENV_PROXY_QPS.to_string(),
                message: "must be a number".to_string(),
            })?;
            if !value.is_finite() || value < MIN_PROXY_QPS {
                return Err(ConfigError::InvalidValue {
                    var: ENV_PROXY_QPS.to_string(),
                    message: format!("must be a finite number of at least {MIN_PROXY_QPS} (got {value})"),
                });
            }
            settings.proxy_qps = value;
        }

        if let Some(burst) = env_var_or_none(ENV_PROXY_BURST) {
            let value: u32 = burst.parse().map_err(|_| ConfigError::InvalidValue {
                var: ENV_PROXY_BURST.to_string(),
                message: "must be a positive integer".to_string(),
            })?;
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    var: ENV_PROXY_BURST.to_string(),
                    message: "must be a positive integer".to_string(),
                });
            }
            settings.proxy_burst = value;
        }

        Ok(settings)
    }
}
