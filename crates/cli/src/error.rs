//! CLI exit codes for scripting and automation.
//!
//! Responsibilities:
//! - Define structured exit codes that scripts can use to distinguish error types.
//! - Map ClientError and ConfigError variants to appropriate exit codes.
//!
//! Does NOT handle:
//! - Error message formatting (handled by anyhow Display).
//! - Signal handling (see cancellation.rs for SIGINT handling).
//!
//! Invariants:
//! - Exit codes 1-5 are reserved for specific error categories.
//! - Exit code 130 is reserved for SIGINT (Unix standard: 128 + SIGINT).

use kubelink_client::ClientError;
use kubelink_config::ConfigError;

/// Structured exit codes for kubelink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success - command completed successfully.
    Success = 0,

    /// General error - unhandled or generic failure.
    GeneralError = 1,

    /// Re-authentication required - no credential file, expired session,
    /// or rejected credentials.
    ///
    /// Scripts should log in again before retrying.
    ReauthenticationRequired = 2,

    /// Connection error - unresolvable context, unreachable server or issuer.
    ///
    /// Scripts may retry once the connection problem is fixed.
    ConnectionError = 3,

    /// Resource not found - pod, service, etc.
    NotFound = 4,

    /// Invalid input - bad port mapping, header or setting.
    ///
    /// Scripts should fix the input and not retry the same request.
    InvalidInput = 5,

    /// Interrupted - SIGINT/Ctrl+C (Unix standard: 128 + 2).
    Interrupted = 130,
}

impl ExitCode {
    /// Convert the exit code to an i32 for use with std::process::exit().
    pub const fn as_i32(self) -> i32 {
        self as u8 as i32
    }
}

impl From<&ConfigError> for ExitCode {
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::NotLoggedIn { .. } => ExitCode::ReauthenticationRequired,
            ConfigError::InvalidValue { .. } => ExitCode::InvalidInput,
            ConfigError::InvalidConfig { .. }
            | ConfigError::HomeDirUnavailable
            | ConfigError::Read { .. } => ExitCode::GeneralError,
        }
    }
}

impl From<&kube::Error> for ExitCode {
    fn from(err: &kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => match response.code {
                401 | 403 => ExitCode::ReauthenticationRequired,
                404 => ExitCode::NotFound,
                400 | 422 => ExitCode::InvalidInput,
                _ => ExitCode::GeneralError,
            },
            kube::Error::HyperError(_) | kube::Error::Service(_) => ExitCode::ConnectionError,
            _ => ExitCode::GeneralError,
        }
    }
}

impl From<&ClientError> for ExitCode {
    /// Map ClientError variants to structured exit codes.
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::Config(e) => Self::from(e),

            // Re-authentication required (exit code 2)
            ClientError::ExpiredSession { .. } => ExitCode::ReauthenticationRequired,
            ClientError::TokenDecode { .. } => ExitCode::ReauthenticationRequired,

            // Connection errors (exit code 3)
            ClientError::RefreshTransport { .. } => ExitCode::ConnectionError,
            ClientError::Resolution(_) => ExitCode::ConnectionError,
            ClientError::Tunnel { .. } => ExitCode::ConnectionError,
            ClientError::WebSocket { .. } => ExitCode::ConnectionError,
            ClientError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    ExitCode::ConnectionError
                } else {
                    ExitCode::GeneralError
                }
            }

            ClientError::Api(e) => Self::from(e),

            // Invalid input (exit code 5)
            ClientError::PortMapping { .. } => ExitCode::InvalidInput,
            ClientError::InvalidRequest(_) => ExitCode::InvalidInput,

            ClientError::Persist(_) => ExitCode::GeneralError,
        }
    }
}

/// Extension trait for anyhow::Error to extract exit codes.
pub trait ExitCodeExt {
    /// Extract the appropriate exit code from this error.
    ///
    /// Returns ExitCode::GeneralError if no library error is in the chain.
    fn exit_code(&self) -> ExitCode;
}

impl ExitCodeExt for anyhow::Error {
    fn exit_code(&self) -> ExitCode {
        for cause in self.chain() {
            if let Some(client_err) = cause.downcast_ref::<ClientError>() {
                return ExitCode::from(client_err);
            }
            if let Some(config_err) = cause.downcast_ref::<ConfigError>() {
                return ExitCode::from(config_err);
            }
        }

        ExitCode::GeneralError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use kubelink_config::ResolutionError;

    #[test]
    fn test_exit_code_as_i32() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::ReauthenticationRequired.as_i32(), 2);
        assert_eq!(ExitCode::InvalidInput.as_i32(), 5);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }

    #[test]
    fn test_not_logged_in_requires_reauthentication() {
        let err = ClientError::Config(ConfigError::NotLoggedIn {
            message: "no .kubeconfig".to_string(),
        });
        assert_eq!(ExitCode::from(&err), ExitCode::ReauthenticationRequired);
    }

    #[test]
    fn test_expired_session_requires_reauthentication() {
        let err = ClientError::ExpiredSession {
            identity: "u1".to_string(),
        };
        assert_eq!(ExitCode::from(&err), ExitCode::ReauthenticationRequired);
    }

    #[test]
    fn test_resolution_error_is_connection_error() {
        let err = ClientError::Resolution(ResolutionError::UnknownContext("x".to_string()));
        assert_eq!(ExitCode::from(&err), ExitCode::ConnectionError);
    }

    #[test]
    fn test_port_mapping_is_invalid_input() {
        let err = ClientError::PortMapping {
            mapping: "x".to_string(),
            message: "bad".to_string(),
        };
        assert_eq!(ExitCode::from(&err), ExitCode::InvalidInput);
    }

    #[test]
    fn test_api_status_codes() {
        let api = |code: u16| {
            ClientError::Api(kube::Error::Api(kube::error::ErrorResponse {
                status: "Failure".to_string(),
                message: String::new(),
                reason: String::new(),
                code,
            }))
        };
        assert_eq!(ExitCode::from(&api(404)), ExitCode::NotFound);
        assert_eq!(ExitCode::from(&api(403)), ExitCode::ReauthenticationRequired);
        assert_eq!(ExitCode::from(&api(500)), ExitCode::GeneralError);
    }

    #[test]
    fn test_exit_code_found_through_context_chain() {
        let err: anyhow::Result<()> = Err(ConfigError::InvalidValue {
            var: "KUBELINK_PROXY_QPS".to_string(),
            message: "not a number".to_string(),
        })
        .context("Failed to read settings");
        assert_eq!(err.unwrap_err().exit_code(), ExitCode::InvalidInput);
    }

    #[test]
    fn test_unknown_error_is_general() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(err.exit_code(), ExitCode::GeneralError);
    }
}
