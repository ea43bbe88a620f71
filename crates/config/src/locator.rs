//! Credential source resolution.
//!
//! Responsibilities:
//! - Decide which credential file is authoritative for this process.
//! - Fall back to the legacy overlay plus the system-wide credential file.
//! - Report deprecation of the legacy overlay as an advisory warning.
//!
//! Does NOT handle:
//! - Parsing the credential file (see `snapshot.rs`).
//! - Existence checks for explicit or environment paths (deferred to load).
//!
//! Invariants:
//! - Resolution order: explicit override > environment variable > local
//!   default file > legacy overlay + system default file.
//! - Deprecation warnings are never fatal.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::constants::{
    ENV_KUBECONFIG, ENV_NO_DEPRECATION_WARNINGS, LEGACY_OVERLAY_FILE, LOCAL_KUBECONFIG_FILE,
    SYSTEM_KUBECONFIG_DIR, SYSTEM_KUBECONFIG_FILE,
};
use crate::env::{env_flag, env_var_or_none};
use crate::error::ConfigError;
use crate::overlay::LegacyOverlay;

/// How a primary credential file was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrigin {
    /// Supplied by the caller (e.g. `--kubeconfig`).
    Explicit,
    /// Named by the `KUBELINK_KUBECONFIG` environment variable.
    Environment,
    /// Found as `.kubeconfig` in the working directory.
    LocalDefault,
}

/// The authoritative credential source for this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// A primary credential file.
    Primary { path: PathBuf, origin: SourceOrigin },
    /// The system-wide credential file with a legacy overlay on top.
    LegacyOverlay {
        path: PathBuf,
        overlay_path: PathBuf,
        overlay: LegacyOverlay,
    },
}

impl CredentialSource {
    /// Path of the credential file that refreshed credentials are written to.
    pub fn path(&self) -> &Path {
        match self {
            Self::Primary { path, .. } | Self::LegacyOverlay { path, .. } => path,
        }
    }

    /// The legacy overlay, when one is in effect.
    pub fn overlay(&self) -> Option<&LegacyOverlay> {
        match self {
            Self::Primary { .. } => None,
            Self::LegacyOverlay { overlay, .. } => Some(overlay),
        }
    }
}

/// Advisory, non-fatal notices produced while locating credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateWarning {
    OverlayDeprecated { path: PathBuf },
}

impl fmt::Display for LocateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OverlayDeprecated { path } => write!(
                f,
                "WARNING: {} is deprecated and should be removed; use a .kubeconfig file or {} instead",
                path.display(),
                ENV_KUBECONFIG
            ),
        }
    }
}

/// Resolves which credential file is authoritative.
///
/// Directory lookups default to the process working directory and the user's
/// home directory; both can be overridden for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct ConfigLocator {
    explicit_path: Option<PathBuf>,
    working_dir: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    silent: bool,
}

impl ConfigLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this path unconditionally. Blank paths are ignored.
    pub fn with_explicit_path(mut self, path: PathBuf) -> Self {
        if !path.as_os_str().to_string_lossy().trim().is_empty() {
            self.explicit_path = Some(path);
        }
        self
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    pub fn with_home_dir(mut self, dir: PathBuf) -> Self {
        self.home_dir = Some(dir);
        self
    }

    /// Suppress deprecation warnings.
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Resolve the authoritative credential source.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidConfig`] if the local default path is a
    ///   directory or the overlay file is malformed.
    /// - [`ConfigError::NotLoggedIn`] if no source resolves.
    pub fn locate(&self) -> Result<(CredentialSource, Vec<LocateWarning>), ConfigError> {
        let working_dir = self.working_dir()?;
        let overlay_path = working_dir.join(LEGACY_OVERLAY_FILE);

        let mut warnings = Vec::new();
        if overlay_path.exists() && !self.is_silent() {
            let warning = LocateWarning::OverlayDeprecated {
                path: overlay_path.clone(),
            };
            warn!(path = %overlay_path.display(), "{warning}");
            warnings.push(warning);
        }

        let source = self.resolve(&working_dir, overlay_path)?;
        debug!(path = %source.path().display(), overlay = source.overlay().is_some(), "Resolved credential source");

        Ok((source, warnings))
    }

    fn resolve(
        &self,
        working_dir: &Path,
        overlay_path: PathBuf,
    ) -> Result<CredentialSource, ConfigError> {
        if let Some(path) = &self.explicit_path {
            return Ok(CredentialSource::Primary {
                path: path.clone(),
                origin: SourceOrigin::Explicit,
            });
        }

        if let Some(path) = env_var_or_none(ENV_KUBECONFIG) {
            return Ok(CredentialSource::Primary {
                path: PathBuf::from(path),
                origin: SourceOrigin::Environment,
            });
        }

        let local = working_dir.join(LOCAL_KUBECONFIG_FILE);
        if local.is_dir() {
            return Err(ConfigError::invalid(&local, "expected a file, found a directory"));
        }
        if local.is_file() {
            return Ok(CredentialSource::Primary {
                path: local,
                origin: SourceOrigin::LocalDefault,
            });
        }

        if !overlay_path.exists() {
            return Err(ConfigError::NotLoggedIn {
                message: format!(
                    "no {} file found in {}; change to the correct directory, set {}, or log in again",
                    LOCAL_KUBECONFIG_FILE,
                    working_dir.display(),
                    ENV_KUBECONFIG
                ),
            });
        }

        let overlay = LegacyOverlay::read(&overlay_path)?;
        let system = self
            .home_dir()?
            .join(SYSTEM_KUBECONFIG_DIR)
            .join(SYSTEM_KUBECONFIG_FILE);

        if system.is_dir() {
            return Err(ConfigError::invalid(&system, "expected a file, found a directory"));
        }
        if !system.is_file() {
            return Err(ConfigError::NotLoggedIn {
                message: format!(
                    "{} selects context '{}' but {} does not exist; log in again",
                    overlay_path.display(),
                    overlay.context,
                    system.display()
                ),
            });
        }

        Ok(CredentialSource::LegacyOverlay {
            path: system,
            overlay_path,
            overlay,
        })
    }

    fn is_silent(&self) -> bool {
        self.silent || env_flag(ENV_NO_DEPRECATION_WARNINGS)
    }

    fn working_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.working_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().map_err(|source| ConfigError::Read {
                path: PathBuf::from("."),
                source,
            }),
        }
    }

    fn home_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.home_dir {
            Some(dir) => Ok(dir.clone()),
            None => directories::BaseDirs::new()
                .map(|dirs| dirs.home_dir().to_path_buf())
                .ok_or(ConfigError::HomeDirUnavailable),
        }
    }
}
