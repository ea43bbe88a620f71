//! Status command implementation.

use anyhow::Result;
use tracing::info;

use crate::args::OutputFormat;
use crate::commands::emit;
use crate::config_context::ConfigCommandContext;
use crate::formatters::{StatusOutput, format_status};

pub async fn run(ctx: ConfigCommandContext, format: OutputFormat) -> Result<()> {
    let manager = ctx.connect().await?;
    let handle = manager.handle();
    info!(context = handle.context(), "Connected");

    emit(&format_status(format, &StatusOutput::from(handle.as_ref()))?)?;
    Ok(())
}
