//! Requests through the API server's proxy sub-resource.
//!
//! Responsibilities:
//! - Build `.../namespaces/{ns}/{kind}/{name}/proxy/{endpoint}` requests.
//! - Throttle GET/POST/DELETE; PUT is never throttled.
//! - Open WebSocket connections through the proxy with the transport's TLS
//!   and auth material.
//!
//! Does NOT handle:
//! - Retrying failed requests.
//! - Interpreting response bodies.

use std::sync::Arc;
use std::task::{Context, Poll};

use http::{HeaderMap, Method, Request, Response};
use kube::client::{Body, ConfigExt};
use kube::{Client, Config};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tower::{BoxError, Layer, Service, ServiceExt};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::handle::{ConnectionHandle, ensure_crypto_provider};
use crate::throttle::RequestThrottle;

/// WebSocket connection opened through the proxy sub-resource.
pub type ProxyWebSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Terminal service that echoes the headers of the request it receives.
///
/// Wrapped in the transport's auth layer, a single call yields the exact
/// headers the transport would send. The auth middleware only accepts inner
/// services that answer with an `http::Response`, so the headers travel back
/// on an empty response.
#[derive(Clone, Copy)]
struct HeaderCapture;

impl Service<Request<Body>> for HeaderCapture {
    type Response = Response<()>;
    type Error = BoxError;
    type Future = std::future::Ready<std::result::Result<Response<()>, BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), BoxError>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut response = Response::new(());
        *response.headers_mut() = req.headers().clone();
        std::future::ready(Ok(response))
    }
}

/// Run an empty request through `config`'s auth layer and return the headers
/// it ends up with.
async fn capture_auth_headers(config: &Config) -> Result<HeaderMap> {
    let request = Request::new(Body::empty());
    let response = match config.auth_layer()? {
        Some(auth) => auth.layer(HeaderCapture).oneshot(request).await,
        None => HeaderCapture.oneshot(request).await,
    }
    .map_err(|e| ClientError::InvalidRequest(format!("failed to compute auth headers: {e}")))?;
    Ok(response.into_parts().0.headers)
}

/// Sub-client bound to one resource's proxy sub-resource.
#[derive(Clone)]
pub struct ProxyHandle {
    client: Client,
    config: Config,
    namespace: String,
    kind: String,
    name: String,
    throttle: Arc<RequestThrottle>,
}

impl std::fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyHandle")
            .field("namespace", &self.namespace)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ProxyHandle {
    /// Bind a proxy to `kind/name` in `namespace`. Performs no I/O.
    pub fn new(
        handle: &ConnectionHandle,
        namespace: &str,
        kind: &str,
        name: &str,
        throttle: Arc<RequestThrottle>,
    ) -> Self {
        Self {
            client: handle.client(),
            config: handle.config().clone(),
            namespace: namespace.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            throttle,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// API path of `endpoint` behind this proxy.
    pub fn path(&self, endpoint: &str) -> String {
        format!(
            "/api/v1/namespaces/{}/{}/{}/proxy/{}",
            self.namespace,
            self.kind,
            self.name,
            endpoint.trim_start_matches('/')
        )
    }

    pub async fn get(&self, endpoint: &str, headers: &[(&str, &str)]) -> Result<String> {
        self.throttle.acquire().await;
        self.send(Method::GET, endpoint, headers, Vec::new()).await
    }

    pub async fn post(
        &self,
        endpoint: &str,
        headers: &[(&str, &str)],
        body: impl Into<Vec<u8>>,
    ) -> Result<String> {
        self.throttle.acquire().await;
        self.send(Method::POST, endpoint, headers, body.into()).await
    }

    /// Issue a PUT. Not throttled.
    pub async fn put(
        &self,
        endpoint: &str,
        headers: &[(&str, &str)],
        body: impl Into<Vec<u8>>,
    ) -> Result<String> {
        self.send(Method::PUT, endpoint, headers, body.into()).await
    }

    pub async fn delete(&self, endpoint: &str, headers: &[(&str, &str)]) -> Result<String> {
        self.throttle.acquire().await;
        self.send(Method::DELETE, endpoint, headers, Vec::new()).await
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> Result<String> {
        let mut builder = Request::builder().method(method.clone()).uri(self.path(endpoint));
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder
            .body(body)
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

        debug!(%method, kind = %self.kind, name = %self.name, endpoint, "Proxy request");
        Ok(self.client.request_text(request).await?)
    }

    /// WebSocket URL of `endpoint`: the proxy URL with `https`/`http`
    /// replaced by `wss`/`ws`.
    pub fn websocket_url(&self, endpoint: &str) -> Result<String> {
        let base = self.config.cluster_url.to_string();
        let base = base.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return Err(ClientError::InvalidRequest(format!(
                "unsupported server URL scheme: {base}"
            )));
        };
        Ok(format!("{ws_base}{}", self.path(endpoint)))
    }

    /// Headers the transport attaches to every request, auth included.
    pub async fn auth_headers(&self) -> Result<HeaderMap> {
        capture_auth_headers(&self.config).await
    }

    /// Open a WebSocket connection to `endpoint` through the proxy.
    pub async fn open_websocket(&self, endpoint: &str) -> Result<ProxyWebSocket> {
        let url = self.websocket_url(endpoint)?;
        let ws_err = |message: String| ClientError::WebSocket {
            url: url.clone(),
            message,
        };

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| ws_err(e.to_string()))?;
        request.headers_mut().extend(self.auth_headers().await?);

        let connector = if url.starts_with("wss://") {
            ensure_crypto_provider();
            let mut tls = self.config.rustls_client_config()?;
            tls.alpn_protocols.clear();
            Some(Connector::Rustls(Arc::new(tls)))
        } else {
            Some(Connector::Plain)
        };

        let (stream, _response) =
            tokio_tungstenite::connect_async_tls_with_config(request, None, false, connector)
                .await
                .map_err(|e| ws_err(e.to_string()))?;

        debug!(kind = %self.kind, name = %self.name, endpoint, "WebSocket proxy connected");
        Ok(stream)
    }
}
