//! Proxy sub-resource tests.
//!
//! This module tests proxy path construction, request forwarding with the
//! connection's bearer token, WebSocket URL derivation, and throttling.
//!
//! # Invariants
//! - Requests reach `/api/v1/namespaces/{ns}/{kind}/{name}/proxy/{endpoint}`
//! - The transport presents the identity's id-token as a bearer token
//! - PUT requests bypass the throttle
//!
//! # What this does NOT handle
//! - WebSocket traffic over a real upgrade

mod common;

use std::time::Duration;

use common::*;
use kubelink_client::{ConnectionManager, ProxyHandle};
use kubelink_config::ConnectionSettings;
use wiremock::matchers::{body_string, header, method, path};

async fn manager_for(server: &MockServer, token: &str, settings: ConnectionSettings) -> (tempfile::TempDir, ConnectionManager) {
    let dir = tempfile::tempdir().unwrap();
    let config = write_kubeconfig(dir.path(), &api_server_kubeconfig(&server.uri(), token));
    let manager = ConnectionManager::builder()
        .source(primary_source(&config))
        .settings(settings)
        .create()
        .await
        .unwrap();
    (dir, manager)
}

#[tokio::test]
async fn test_proxy_get_forwards_bearer_token() {
    let server = MockServer::start().await;
    let token = fresh_id_token();

    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/apps/services/web/proxy/healthz"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .and(header("x-probe", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, manager) = manager_for(&server, &token, ConnectionSettings::default()).await;
    let proxy = manager.proxy_service("apps", "web");

    let body = proxy.get("healthz", &[("x-probe", "1")]).await.unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_proxy_post_sends_body() {
    let server = MockServer::start().await;
    let token = fresh_id_token();

    Mock::given(method("POST"))
        .and(path("/api/v1/namespaces/default/pods/worker/proxy/jobs"))
        .and(body_string(r#"{"id":1}"#))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, manager) = manager_for(&server, &token, ConnectionSettings::default()).await;
    let proxy = manager.proxy_pod("default", "worker");

    let body = proxy
        .post("/jobs", &[("content-type", "application/json")], r#"{"id":1}"#)
        .await
        .unwrap();
    assert_eq!(body, "created");
}

#[tokio::test]
async fn test_proxy_error_status_is_api_error() {
    let server = MockServer::start().await;
    let token = fresh_id_token();

    Mock::given(method("DELETE"))
        .and(path("/api/v1/namespaces/default/pods/worker/proxy/jobs/1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "message": "pods \"worker\" not found",
            "reason": "NotFound",
            "code": 404,
        })))
        .mount(&server)
        .await;

    let (_dir, manager) = manager_for(&server, &token, ConnectionSettings::default()).await;
    let err = manager
        .proxy_pod("default", "worker")
        .delete("jobs/1", &[])
        .await
        .unwrap_err();

    assert!(err.is_not_found(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_put_bypasses_throttle() {
    let server = MockServer::start().await;
    let token = fresh_id_token();

    Mock::given(path("/api/v1/namespaces/default/pods/worker/proxy/state"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let settings = ConnectionSettings {
        proxy_qps: 0.01,
        proxy_burst: 1,
        ..ConnectionSettings::default()
    };
    let (_dir, manager) = manager_for(&server, &token, settings).await;
    let proxy = manager.proxy_pod("default", "worker");

    proxy.get("state", &[]).await.unwrap();

    // The bucket is empty now, yet PUTs proceed immediately.
    for _ in 0..3 {
        tokio::time::timeout(Duration::from_secs(5), proxy.put("state", &[], "v"))
            .await
            .expect("PUT should not be throttled")
            .unwrap();
    }

    let throttled = tokio::time::timeout(Duration::from_millis(200), proxy.get("state", &[])).await;
    assert!(throttled.is_err(), "GET beyond the burst should wait");
}

#[tokio::test]
async fn test_proxies_share_one_throttle() {
    let server = MockServer::start().await;
    let token = fresh_id_token();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let settings = ConnectionSettings {
        proxy_qps: 0.01,
        proxy_burst: 1,
        ..ConnectionSettings::default()
    };
    let (_dir, manager) = manager_for(&server, &token, settings).await;

    manager.proxy_pod("default", "a").get("x", &[]).await.unwrap();
    let second = manager.proxy_service("default", "b");
    let throttled = tokio::time::timeout(Duration::from_millis(200), second.get("x", &[])).await;
    assert!(throttled.is_err());
}

#[tokio::test]
async fn test_websocket_url_and_auth_headers() {
    let server = MockServer::start().await;
    let token = fresh_id_token();
    let (_dir, manager) = manager_for(&server, &token, ConnectionSettings::default()).await;

    let proxy: ProxyHandle = manager.proxy("apps", "services", "web");
    assert_eq!(proxy.kind(), "services");
    assert_eq!(proxy.path("/ws"), "/api/v1/namespaces/apps/services/web/proxy/ws");

    let address = server.address();
    assert_eq!(
        proxy.websocket_url("ws").unwrap(),
        format!("ws://{address}/api/v1/namespaces/apps/services/web/proxy/ws")
    );

    let headers = proxy.auth_headers().await.unwrap();
    assert_eq!(
        headers.get("authorization").unwrap().to_str().unwrap(),
        format!("Bearer {token}")
    );
}

#[tokio::test]
async fn test_websocket_upgrade_rejection_is_reported() {
    let server = MockServer::start().await;
    let token = fresh_id_token();
    let (_dir, manager) = manager_for(&server, &token, ConnectionSettings::default()).await;

    let err = manager
        .proxy_service("apps", "web")
        .open_websocket("ws")
        .await
        .unwrap_err();

    assert!(
        matches!(err, kubelink_client::ClientError::WebSocket { ref url, .. } if url.starts_with("ws://")),
        "unexpected error: {err:?}"
    );
}
