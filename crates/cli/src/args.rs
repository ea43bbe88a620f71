//! CLI argument definitions and parsing.
//!
//! Responsibilities:
//! - Define the CLI structure using clap derive macros.
//! - Normalize global options shared by every subcommand.
//!
//! Non-responsibilities:
//! - Does not execute commands (see `dispatch` module).
//! - Does not locate credentials (see `config_context` module).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "kubelink")]
#[command(about = "kubelink - Connect to Kubernetes clusters with refreshable OIDC credentials", long_about = None)]
#[command(version)]
#[command(
    after_help = "Examples:\n  kubelink status\n  kubelink contexts\n  kubelink --context staging watch\n  kubelink forward web-0 8080:80 :9090\n  kubelink proxy web healthz --kind services\n  kubelink refresh\n"
)]
pub struct Cli {
    /// Path to the credential file (overrides KUBELINK_KUBECONFIG and the
    /// working-directory lookup)
    #[arg(long, global = true, value_name = "FILE")]
    pub kubeconfig: Option<PathBuf>,

    /// Context to use instead of the file's current context
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Namespace to use instead of the context's default
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Suppress deprecation warnings.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The explicit credential path, ignoring blank values.
    pub fn kubeconfig_path(&self) -> Option<PathBuf> {
        self.kubeconfig
            .clone()
            .filter(|p| !p.to_string_lossy().trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the active context, namespace, cluster and server
    Status,

    /// List contexts in the credential file, marking the active one
    Contexts,

    /// Switch to a context for this invocation and show the result
    UseContext {
        /// Context name
        name: String,
    },

    /// Forward local ports to a pod until interrupted
    Forward {
        /// Pod name in the active namespace
        pod: String,

        /// Port mappings in [LOCAL:]REMOTE form (e.g. 8080, 8080:80, :80)
        #[arg(required = true)]
        ports: Vec<String>,
    },

    /// Send a request through the API server proxy to a pod or service
    Proxy {
        /// Resource name
        name: String,

        /// Endpoint path behind the proxy (e.g. healthz)
        endpoint: String,

        /// Resource kind
        #[arg(long, value_enum, default_value_t = ProxyKind::Pods)]
        kind: ProxyKind,

        /// HTTP method
        #[arg(short = 'X', long, value_enum, default_value_t = ProxyMethod::Get)]
        method: ProxyMethod,

        /// Request header in NAME:VALUE form (repeatable)
        #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Request body for POST and PUT
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Watch pods in the active namespace until interrupted
    Watch {
        /// Label selector to filter pods
        #[arg(short = 'l', long)]
        selector: Option<String>,

        /// Server-side watch timeout in seconds
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=290))]
        timeout: Option<u32>,
    },

    /// Refresh the active identity's id-token if it is stale
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProxyKind {
    Pods,
    Services,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProxyMethod {
    Get,
    Post,
    Put,
    Delete,
}
