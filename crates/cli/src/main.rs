//! kubelink - Command-line interface for cluster connections.
//!
//! Responsibilities:
//! - Parse command-line arguments.
//! - Install logging and Ctrl+C handling.
//! - Execute commands via the shared client library and map failures to
//!   structured exit codes.
//!
//! Does NOT handle:
//! - Credential resolution, refresh or transport (see `crates/config` and
//!   `crates/client`).
//!
//! Invariants:
//! - Logs go to stderr so stdout carries only command output.
//! - `RUST_LOG` overrides the default `warn` filter.

mod args;
mod cancellation;
mod commands;
mod config_context;
mod dispatch;
mod error;
mod formatters;

use args::Cli;
use cancellation::{CancellationToken, cancel_on_ctrl_c, is_cancelled_error, print_cancelled_message};
use clap::Parser;
use dispatch::run_command;
use error::{ExitCode, ExitCodeExt};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let exit_code = match run_command(cli, &cancel).await {
        Ok(()) => ExitCode::Success,
        Err(e) if is_cancelled_error(&e) => {
            print_cancelled_message();
            ExitCode::Interrupted
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            e.exit_code()
        }
    };

    std::process::exit(exit_code.as_i32());
}
