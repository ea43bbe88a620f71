//! Refresh command implementation.
//!
//! Connecting already refreshes a stale identity through the provider
//! registry; a second explicit pass reports whether anything was left to do.

use anyhow::Result;
use tracing::info;

use crate::args::OutputFormat;
use crate::commands::emit;
use crate::config_context::ConfigCommandContext;
use crate::formatters::{RefreshOutput, format_refresh};

pub async fn run(ctx: ConfigCommandContext, format: OutputFormat) -> Result<()> {
    let manager = ctx.connect().await?;
    let refreshed = manager.refresh_credentials().await? || manager.refreshed_on_create();

    let identity = manager.handle().identity().to_string();
    if !refreshed {
        info!(%identity, "Credentials did not need a refresh");
    }

    emit(&format_refresh(format, &RefreshOutput { identity, refreshed })?)?;
    Ok(())
}
