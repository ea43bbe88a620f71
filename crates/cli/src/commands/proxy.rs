//! Proxy command implementation.

use anyhow::Result;
use kubelink_client::ClientError;

use crate::args::{ProxyKind, ProxyMethod};
use crate::cancellation::{CancellationToken, Cancelled};
use crate::commands::emit;
use crate::config_context::ConfigCommandContext;

pub struct ProxyRequest<'a> {
    pub name: &'a str,
    pub endpoint: &'a str,
    pub kind: ProxyKind,
    pub method: ProxyMethod,
    pub headers: &'a [String],
    pub data: Option<&'a str>,
}

/// Split `NAME:VALUE` header arguments.
fn parse_headers(headers: &[String]) -> Result<Vec<(&str, &str)>, ClientError> {
    headers
        .iter()
        .map(|header| {
            header
                .split_once(':')
                .map(|(name, value)| (name.trim(), value.trim()))
                .filter(|(name, _)| !name.is_empty())
                .ok_or_else(|| {
                    ClientError::InvalidRequest(format!(
                        "header '{header}' must be in NAME:VALUE form"
                    ))
                })
        })
        .collect()
}

pub async fn run(
    ctx: ConfigCommandContext,
    request: ProxyRequest<'_>,
    cancel: &CancellationToken,
) -> Result<()> {
    let headers = parse_headers(request.headers)?;
    let namespace = ctx.overrides.namespace.clone();
    let manager = ctx.connect().await?;
    let namespace = namespace.unwrap_or_else(|| manager.current_namespace());

    let proxy = match request.kind {
        ProxyKind::Pods => manager.proxy_pod(&namespace, request.name),
        ProxyKind::Services => manager.proxy_service(&namespace, request.name),
    };
    let body = request.data.unwrap_or_default().as_bytes().to_vec();

    let send = async {
        match request.method {
            ProxyMethod::Get => proxy.get(request.endpoint, &headers).await,
            ProxyMethod::Post => proxy.post(request.endpoint, &headers, body).await,
            ProxyMethod::Put => proxy.put(request.endpoint, &headers, body).await,
            ProxyMethod::Delete => proxy.delete(request.endpoint, &headers).await,
        }
    };

    let response = tokio::select! {
        response = send => response?,
        _ = cancel.cancelled() => return Err(Cancelled.into()),
    };
    emit(&response)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers() {
        let headers = vec!["Accept: application/json".to_string(), "x-a:1:2".to_string()];
        assert_eq!(
            parse_headers(&headers).unwrap(),
            vec![("Accept", "application/json"), ("x-a", "1:2")]
        );
    }

    #[test]
    fn test_parse_headers_rejects_missing_separator() {
        let headers = vec!["Accept".to_string()];
        assert!(matches!(
            parse_headers(&headers),
            Err(ClientError::InvalidRequest(_))
        ));
        assert!(parse_headers(&[":x".to_string()]).is_err());
    }
}
