//! Forward command implementation.

use anyhow::Result;
use kubelink_client::parse_port_mappings;

use crate::cancellation::{CancellationToken, Cancelled};
use crate::config_context::ConfigCommandContext;

pub async fn run(
    ctx: ConfigCommandContext,
    pod: &str,
    ports: &[String],
    cancel: &CancellationToken,
) -> Result<()> {
    // Mappings are validated before any network activity.
    let mappings = parse_port_mappings(ports)?;
    let manager = ctx.connect().await?;

    let tunnel_client = manager.tunnel();
    let tunnel = tokio::select! {
        tunnel = tunnel_client.bind(pod, &mappings) => tunnel?,
        _ = cancel.cancelled() => return Err(Cancelled.into()),
    };

    for (local, remote) in tunnel.local_addrs() {
        println!("Forwarding from {local} -> {remote}");
    }

    tunnel.run(cancel.clone()).await?;
    if cancel.is_cancelled() {
        return Err(Cancelled.into());
    }
    Ok(())
}
