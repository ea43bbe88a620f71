//! Contexts command implementation.
//!
//! Lists contexts from the credential file without connecting, marking the
//! one a connection would use.

use anyhow::Result;

use crate::args::OutputFormat;
use crate::commands::emit;
use crate::config_context::ConfigCommandContext;
use crate::formatters::{ContextRow, format_contexts};

pub fn run(ctx: &ConfigCommandContext, format: OutputFormat) -> Result<()> {
    let snapshot = ctx.load_snapshot()?;

    let current = match &ctx.overrides.context {
        Some(name) => Some(name.as_str()),
        None => snapshot.effective_context().ok(),
    };

    let rows: Vec<ContextRow> = snapshot
        .contexts()
        .iter()
        .map(|(name, entry)| ContextRow {
            name: name.clone(),
            cluster: entry.cluster.clone(),
            identity: entry.identity.clone(),
            namespace: entry.namespace.clone(),
            current: current == Some(name.as_str()),
        })
        .collect();

    emit(&format_contexts(format, &rows)?)?;
    Ok(())
}
