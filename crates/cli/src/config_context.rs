//! Connection context for command execution.
//!
//! Responsibilities:
//! - Locate the credential source from global options and the environment.
//! - Read connection settings from the environment.
//! - Build a connection manager for commands that talk to a cluster.
//!
//! Does NOT handle:
//! - CLI argument definitions (see `args` module).
//! - Printing deprecation warnings; the locator logs them.
//!
//! Invariants:
//! - `--kubeconfig` beats `KUBELINK_KUBECONFIG`, which beats the working directory.
//! - `--context` and `--namespace` beat the file and any legacy overlay.

use anyhow::{Context, Result};
use kubelink_client::ConnectionManager;
use kubelink_config::{
    ConfigLocator, ConfigSnapshot, ConnectionSettings, ContextOverrides, CredentialSource,
};

use crate::args::Cli;

/// Everything a command needs to reach the cluster.
pub(crate) struct ConfigCommandContext {
    pub source: CredentialSource,
    pub settings: ConnectionSettings,
    pub overrides: ContextOverrides,
}

impl ConfigCommandContext {
    /// Resolve the credential source and settings for `cli`.
    pub(crate) fn from_cli(cli: &Cli) -> Result<Self> {
        let mut locator = ConfigLocator::new().silent(cli.quiet);
        if let Some(path) = cli.kubeconfig_path() {
            locator = locator.with_explicit_path(path);
        }
        let (source, _warnings) = locator
            .locate()
            .context("Failed to locate credentials")?;

        let settings = ConnectionSettings::from_env().context("Invalid connection settings")?;

        Ok(Self {
            source,
            settings,
            overrides: ContextOverrides {
                context: cli.context.clone(),
                namespace: cli.namespace.clone(),
            },
        })
    }

    /// Parse the credential file without connecting.
    pub(crate) fn load_snapshot(&self) -> Result<ConfigSnapshot> {
        ConfigSnapshot::load(self.source.clone()).with_context(|| {
            format!(
                "Failed to load credentials from {}",
                self.source.path().display()
            )
        })
    }

    /// Refresh the selected identity if needed and connect.
    pub(crate) async fn connect(self) -> Result<ConnectionManager> {
        let manager = ConnectionManager::builder()
            .source(self.source)
            .overrides(self.overrides)
            .settings(self.settings)
            .create()
            .await?;
        Ok(manager)
    }
}
