//! CLI command implementations.

pub mod contexts;
pub mod forward;
pub mod proxy;
pub mod refresh;
pub mod status;
pub mod use_context;
pub mod watch;

use std::io::Write;

use anyhow::{Context, Result};

/// Write command output to stdout and flush it.
///
/// The process exits via `std::process::exit`, which skips stdout's buffer.
pub(crate) fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .and_then(|()| stdout.flush())
        .context("Failed to write output")
}
