//! Command dispatch logic.
//!
//! Responsibilities:
//! - Route parsed CLI arguments to appropriate command handlers.
//! - Resolve the connection context once for every command.
//!
//! Does NOT handle:
//! - CLI structure definitions (see `args` module).
//! - Credential location rules (see `config_context` module).
//!
//! Invariants:
//! - All long-running commands receive the cancellation token.

use anyhow::Result;

use crate::args::{Cli, Commands};
use crate::cancellation::CancellationToken;
use crate::commands;
use crate::config_context::ConfigCommandContext;

/// Dispatch CLI commands to their respective handlers.
pub(crate) async fn run_command(cli: Cli, cancel_token: &CancellationToken) -> Result<()> {
    let ctx = ConfigCommandContext::from_cli(&cli)?;
    let format = cli.output;

    match cli.command {
        Commands::Status => commands::status::run(ctx, format).await?,
        Commands::Contexts => commands::contexts::run(&ctx, format)?,
        Commands::UseContext { name } => commands::use_context::run(ctx, &name, format).await?,
        Commands::Forward { pod, ports } => {
            commands::forward::run(ctx, &pod, &ports, cancel_token).await?
        }
        Commands::Proxy {
            name,
            endpoint,
            kind,
            method,
            headers,
            data,
        } => {
            let request = commands::proxy::ProxyRequest {
                name: &name,
                endpoint: &endpoint,
                kind,
                method,
                headers: &headers,
                data: data.as_deref(),
            };
            commands::proxy::run(ctx, request, cancel_token).await?
        }
        Commands::Watch { selector, timeout } => {
            commands::watch::run(ctx, selector.as_deref(), timeout, format, cancel_token).await?
        }
        Commands::Refresh => commands::refresh::run(ctx, format).await?,
    }

    Ok(())
}
