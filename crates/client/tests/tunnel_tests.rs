//! Port tunnel tests.
//!
//! This module tests that invalid mappings and failed port-forward upgrades
//! are reported before a tunnel starts blocking.
//!
//! # What this does NOT handle
//! - Byte forwarding over a live port-forward stream

mod common;

use std::time::Duration;

use common::*;
use kubelink_client::{ClientError, ConnectionManager, PortMapping};
use tokio_util::sync::CancellationToken;

async fn manager_for(server: &MockServer) -> (tempfile::TempDir, ConnectionManager) {
    let dir = tempfile::tempdir().unwrap();
    let config = write_kubeconfig(
        dir.path(),
        &api_server_kubeconfig(&server.uri(), &fresh_id_token()),
    );
    let manager = ConnectionManager::builder()
        .source(primary_source(&config))
        .create()
        .await
        .unwrap();
    (dir, manager)
}

#[tokio::test]
async fn test_invalid_mapping_fails_before_any_request() {
    let server = MockServer::start().await;
    let (_dir, manager) = manager_for(&server).await;

    let err = manager
        .open_tunnel("web", &["8080", "x:80"], CancellationToken::new())
        .await
        .unwrap_err();

    assert!(
        matches!(err, ClientError::PortMapping { ref mapping, .. } if mapping == "x:80"),
        "unexpected error: {err:?}"
    );
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_rejected_upgrade_fails_before_blocking() {
    let server = MockServer::start().await;
    let (_dir, manager) = manager_for(&server).await;

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        manager.open_tunnel("web", &[":80"], CancellationToken::new()),
    )
    .await
    .expect("tunnel should fail instead of blocking");

    let err = result.unwrap_err();
    assert!(
        matches!(err, ClientError::Tunnel { ref pod, .. } if pod == "web"),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_empty_mappings_are_rejected() {
    let server = MockServer::start().await;
    let (_dir, manager) = manager_for(&server).await;

    let err = manager.tunnel().bind("web", &[]).await.unwrap_err();
    assert!(matches!(err, ClientError::Tunnel { .. }));

    let mapping = PortMapping { local: 0, remote: 80 };
    assert_eq!(":80".parse::<PortMapping>().unwrap(), mapping);
}
