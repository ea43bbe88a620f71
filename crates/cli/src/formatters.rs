//! Output formatting for command results.
//!
//! Table output is aligned, tab-free text for humans; JSON output is a
//! single document (or one object per line for watch events) for scripts.

use anyhow::Result;
use k8s_openapi::api::core::v1::Pod;
use kubelink_client::{ConnectionHandle, WatchEventType};
use serde::Serialize;

use crate::args::OutputFormat;

#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    pub context: String,
    pub namespace: String,
    pub cluster: String,
    pub server: String,
    pub identity: String,
}

impl From<&ConnectionHandle> for StatusOutput {
    fn from(handle: &ConnectionHandle) -> Self {
        Self {
            context: handle.context().to_string(),
            namespace: handle.namespace().to_string(),
            cluster: handle.cluster().to_string(),
            server: handle.server().to_string(),
            identity: handle.identity().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextRow {
    pub name: String,
    pub cluster: String,
    pub identity: String,
    pub namespace: Option<String>,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutput {
    pub identity: String,
    pub refreshed: bool,
}

#[derive(Debug, Clone, Serialize)]
struct WatchLine<'a> {
    #[serde(rename = "type")]
    event: &'a str,
    name: &'a str,
    namespace: &'a str,
    phase: &'a str,
}

pub fn format_status(format: OutputFormat, status: &StatusOutput) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(status)? + "\n"),
        OutputFormat::Table => Ok(format!(
            "Context:   {}\nNamespace: {}\nCluster:   {}\nServer:    {}\nIdentity:  {}\n",
            status.context, status.namespace, status.cluster, status.server, status.identity
        )),
    }
}

pub fn format_contexts(format: OutputFormat, rows: &[ContextRow]) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(rows)? + "\n");
    }

    let header = ["CURRENT", "NAME", "CLUSTER", "IDENTITY", "NAMESPACE"];
    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|row| {
            [
                if row.current { "*" } else { "" }.to_string(),
                row.name.clone(),
                row.cluster.clone(),
                row.identity.clone(),
                row.namespace.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let render = |cols: [&str; 5]| {
        let line: Vec<String> = cols
            .iter()
            .zip(widths)
            .map(|(col, width)| format!("{col:<width$}"))
            .collect();
        line.join("   ").trim_end().to_string() + "\n"
    };

    let mut output = render(header);
    for row in &cells {
        output.push_str(&render(row.each_ref().map(String::as_str)));
    }
    Ok(output)
}

pub fn format_refresh(format: OutputFormat, result: &RefreshOutput) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)? + "\n"),
        OutputFormat::Table if result.refreshed => Ok(format!(
            "Refreshed credentials for identity '{}'\n",
            result.identity
        )),
        OutputFormat::Table => Ok(format!(
            "Credentials for identity '{}' are still valid\n",
            result.identity
        )),
    }
}

pub fn format_watch_event(format: OutputFormat, pod: &Pod, event: WatchEventType) -> Result<String> {
    let event = match event {
        WatchEventType::Added => "ADDED",
        WatchEventType::Modified => "MODIFIED",
        WatchEventType::Deleted => "DELETED",
    };
    let line = WatchLine {
        event,
        name: pod.metadata.name.as_deref().unwrap_or_default(),
        namespace: pod.metadata.namespace.as_deref().unwrap_or_default(),
        phase: pod
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .unwrap_or("Unknown"),
    };

    match format {
        OutputFormat::Json => Ok(serde_json::to_string(&line)? + "\n"),
        OutputFormat::Table => Ok(format!("{:<9} {}  {}\n", line.event, line.name, line.phase)),
    }
}
