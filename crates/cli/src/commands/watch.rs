//! Watch command implementation.

use anyhow::Result;
use kubelink_client::WatchParams;
use tracing::info;

use crate::args::OutputFormat;
use crate::cancellation::{CancellationToken, Cancelled};
use crate::commands::emit;
use crate::config_context::ConfigCommandContext;
use crate::formatters::format_watch_event;

pub async fn run(
    ctx: ConfigCommandContext,
    selector: Option<&str>,
    timeout: Option<u32>,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let manager = ctx.connect().await?;

    let mut params = WatchParams::default();
    if let Some(selector) = selector {
        params = params.labels(selector);
    }
    if let Some(timeout) = timeout {
        params = params.timeout(timeout);
    }

    info!(namespace = %manager.current_namespace(), "Watching pods");
    let watch = manager.watch_pods(&params, |pod, event| -> Result<()> {
        emit(&format_watch_event(format, pod, event)?)?;
        Ok(())
    });

    tokio::select! {
        result = watch => result,
        _ = cancel.cancelled() => Err(Cancelled.into()),
    }
}
