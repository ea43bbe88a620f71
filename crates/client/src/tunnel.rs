//! Local port tunnels to pods.
//!
//! Responsibilities:
//! - Parse `[LOCAL:]REMOTE` port mappings.
//! - Bind local listeners and verify the port-forward upgrade before blocking.
//! - Copy bytes between accepted local connections and the pod.
//!
//! Does NOT handle:
//! - Reconnecting; a broken tunnel must be reopened by the caller.
//! - Choosing which pod to target.
//!
//! Invariants:
//! - Listeners bind on 127.0.0.1 only.
//! - Mapping and upgrade failures are returned before [`Tunnel::run`] blocks.

use std::collections::BTreeSet;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;

use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::handle::ConnectionHandle;

/// One `[LOCAL:]REMOTE` mapping; a local port of 0 lets the OS choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub local: u16,
    pub remote: u16,
}

impl FromStr for PortMapping {
    type Err = ClientError;

    fn from_str(spec: &str) -> Result<Self> {
        let invalid = |message: &str| ClientError::PortMapping {
            mapping: spec.to_string(),
            message: message.to_string(),
        };
        let port = |part: &str| {
            part.trim()
                .parse::<u16>()
                .map_err(|_| invalid("ports must be numbers between 0 and 65535"))
        };

        let mut parts = spec.split(':');
        let (local, remote) = match (parts.next(), parts.next(), parts.next()) {
            (Some(remote), None, None) => {
                let remote = port(remote)?;
                (remote, remote)
            }
            (Some(""), Some(remote), None) => (0, port(remote)?),
            (Some(local), Some(remote), None) => (port(local)?, port(remote)?),
            _ => return Err(invalid("expected [LOCAL:]REMOTE")),
        };

        if remote == 0 {
            return Err(invalid("remote port must not be 0"));
        }
        Ok(Self { local, remote })
    }
}

/// Parse every mapping, failing on the first invalid one.
pub fn parse_port_mappings<S: AsRef<str>>(specs: &[S]) -> Result<Vec<PortMapping>> {
    specs.iter().map(|s| s.as_ref().parse()).collect()
}

/// Opens tunnels to pods in the handle's namespace.
#[derive(Clone)]
pub struct TunnelFactory {
    pods: Api<Pod>,
    namespace: String,
}

impl TunnelFactory {
    pub fn new(handle: &ConnectionHandle) -> Self {
        Self {
            pods: handle.pods(),
            namespace: handle.namespace().to_string(),
        }
    }

    /// Bind and run a tunnel until `stop` is cancelled or a listener fails.
    pub async fn open(
        &self,
        pod: &str,
        mappings: &[PortMapping],
        stop: CancellationToken,
    ) -> Result<()> {
        self.bind(pod, mappings).await?.run(stop).await
    }

    /// Bind local listeners and probe the upgrade, without forwarding yet.
    pub async fn bind(&self, pod: &str, mappings: &[PortMapping]) -> Result<Tunnel> {
        let fail = |message: String| ClientError::Tunnel {
            pod: pod.to_string(),
            message,
        };

        if mappings.is_empty() {
            return Err(fail("no port mappings given".to_string()));
        }

        let mut listeners = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, mapping.local));
            let listener = TcpListener::bind(addr)
                .await
                .map_err(|e| fail(format!("failed to listen on {addr}: {e}")))?;
            listeners.push((mapping.remote, listener));
        }

        let remote: Vec<u16> = mappings
            .iter()
            .map(|m| m.remote)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let probe = self
            .pods
            .portforward(pod, &remote)
            .await
            .map_err(|e| fail(format!("port-forward upgrade failed: {e}")))?;
        drop(probe);

        debug!(pod, namespace = %self.namespace, ?remote, "Port-forward upgrade verified");
        Ok(Tunnel {
            pod: pod.to_string(),
            pods: self.pods.clone(),
            listeners,
        })
    }
}

/// A tunnel whose listeners are bound and whose upgrade has been verified.
#[derive(Debug)]
pub struct Tunnel {
    pod: String,
    pods: Api<Pod>,
    listeners: Vec<(u16, TcpListener)>,
}

impl Tunnel {
    /// `(local address, remote port)` for every listener.
    pub fn local_addrs(&self) -> Vec<(SocketAddr, u16)> {
        self.listeners
            .iter()
            .filter_map(|(remote, listener)| listener.local_addr().ok().map(|a| (a, *remote)))
            .collect()
    }

    /// Forward connections until `stop` is cancelled or a listener fails.
    ///
    /// A listener failure stops this tunnel's connections only; `stop` itself
    /// is never cancelled here.
    pub async fn run(self, stop: CancellationToken) -> Result<()> {
        let tunnel_stop = stop.child_token();
        let mut accept_loops = JoinSet::new();
        for (remote, listener) in self.listeners {
            if let Ok(addr) = listener.local_addr() {
                info!(pod = %self.pod, local = %addr, remote, "Forwarding");
            }
            accept_loops.spawn(accept_loop(
                self.pods.clone(),
                self.pod.clone(),
                remote,
                listener,
                tunnel_stop.clone(),
            ));
        }

        supervise(&self.pod, accept_loops, &tunnel_stop).await
    }
}

/// Wait for the accept loops until `stop` fires or one of them fails, in
/// which case `stop` is cancelled to end in-flight connections.
async fn supervise(
    pod: &str,
    mut accept_loops: JoinSet<Result<()>>,
    stop: &CancellationToken,
) -> Result<()> {
    let failure = loop {
        tokio::select! {
            _ = stop.cancelled() => {
                debug!(pod, "Tunnel stopped");
                accept_loops.abort_all();
                return Ok(());
            }
            joined = accept_loops.join_next() => match joined {
                None => return Ok(()),
                Some(Ok(Ok(()))) => {}
                Some(Ok(Err(e))) => break e,
                Some(Err(e)) => {
                    break ClientError::Tunnel {
                        pod: pod.to_string(),
                        message: e.to_string(),
                    }
                }
            },
        }
    };

    stop.cancel();
    accept_loops.abort_all();
    Err(failure)
}

async fn accept_loop(
    pods: Api<Pod>,
    pod: String,
    remote: u16,
    listener: TcpListener,
    stop: CancellationToken,
) -> Result<()> {
    loop {
        let (connection, peer) = listener.accept().await.map_err(|e| ClientError::Tunnel {
            pod: pod.clone(),
            message: format!("accept failed: {e}"),
        })?;
        debug!(%peer, remote, "Accepted tunnel connection");

        let pods = pods.clone();
        let pod = pod.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = stop.cancelled() => {}
                result = forward_connection(&pods, &pod, remote, connection) => {
                    if let Err(e) = result {
                        warn!(%peer, remote, error = %e, "Tunnel connection failed");
                    }
                }
            }
        });
    }
}

async fn forward_connection(
    pods: &Api<Pod>,
    pod: &str,
    remote: u16,
    mut connection: TcpStream,
) -> Result<()> {
    let fail = |message: String| ClientError::Tunnel {
        pod: pod.to_string(),
        message,
    };

    let mut forwarder = pods
        .portforward(pod, &[remote])
        .await
        .map_err(|e| fail(e.to_string()))?;
    let mut upstream = forwarder
        .take_stream(remote)
        .ok_or_else(|| fail(format!("no stream for port {remote}")))?;

    tokio::io::copy_bidirectional(&mut connection, &mut upstream)
        .await
        .map_err(|e| fail(e.to_string()))?;

    drop(upstream);
    forwarder.join().await.map_err(|e| fail(e.to_string()))?;
    Ok(())
}
