//! Use-context command implementation.
//!
//! Switches the in-memory connection to another context and refreshes its
//! identity. The credential file's current context is left unchanged.

use anyhow::{Context, Result};

use crate::args::OutputFormat;
use crate::commands::emit;
use crate::config_context::ConfigCommandContext;
use crate::formatters::{StatusOutput, format_status};

pub async fn run(ctx: ConfigCommandContext, name: &str, format: OutputFormat) -> Result<()> {
    let manager = ctx.connect().await?;

    manager
        .set_context(name)
        .await
        .with_context(|| format!("Failed to switch to context '{name}'"))?;
    manager.refresh_credentials().await?;

    emit(&format_status(format, &StatusOutput::from(manager.handle().as_ref()))?)?;
    Ok(())
}
