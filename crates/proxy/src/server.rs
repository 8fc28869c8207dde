//! HTTP reverse proxy in front of the node's plain JSON-RPC port.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use color_eyre::eyre;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};
use url::Url;

use crate::{error::ProxyError, hooks::InterceptionHooks};

const PREVIEW_BYTES: usize = 2048;

#[derive(Clone)]
struct AppState {
    hooks: Arc<InterceptionHooks>,
    client: reqwest::Client,
    upstream: Url,
}

/// Every path and method is intercepted and forwarded.
pub fn router(hooks: Arc<InterceptionHooks>, upstream: Url) -> eyre::Result<Router> {
    let client = reqwest::Client::builder().build()?;
    Ok(Router::new().fallback(forward).with_state(AppState { hooks, client, upstream }))
}

#[tracing::instrument(name = "proxy", skip_all)]
pub async fn serve(listener: TcpListener, app: Router, cancel: CancellationToken) -> eyre::Result<()> {
    let local_addr: SocketAddr = listener.local_addr()?;
    info!(address = %local_addr, "Serving JSON-RPC proxy");

    axum::serve(listener, app).with_graceful_shutdown(async move { cancel.cancelled().await }).await?;

    Ok(())
}

async fn forward(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let calls = match state.hooks.on_request(&headers, &body).await {
        Ok(calls) => calls,
        Err(e) => {
            warn!(error = %e, path = %uri, "Request dropped");
            return rpc_error(StatusCode::SERVICE_UNAVAILABLE, &e);
        }
    };
    trace!(target: "traffic", %method, path = %uri, body = %preview(&body), "REQ");

    match send_upstream(&state, method, &uri, &headers, body).await {
        Ok((status, headers, body)) => {
            trace!(target: "traffic", %status, body = %preview(&body), "RESP");
            state.hooks.on_response(&calls, &body).await;

            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            response
        }
        Err(e) => {
            warn!(error = %e, upstream = %state.upstream, "Upstream request failed");
            rpc_error(StatusCode::BAD_GATEWAY, &e)
        }
    }
}

fn rpc_error(status: StatusCode, e: &ProxyError) -> Response {
    let body = json!({
        "jsonrpc": "2.0",
        "id": null,
        "error": {"code": -32603, "message": e.to_string()},
    });
    (status, Json(body)).into_response()
}

async fn send_upstream(
    state: &AppState,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, HeaderMap, Bytes), ProxyError> {
    let url = upstream_url(&state.upstream, uri);
    let mut request = state.client.request(method, url).body(body);
    for (name, value) in headers {
        if forwardable(name) && name != header::HOST {
            request = request.header(name, value);
        }
    }

    let response = request.send().await.map_err(|e| ProxyError::Upstream(e.to_string()))?;
    let status = response.status();
    let mut out_headers = HeaderMap::new();
    for (name, value) in response.headers() {
        if forwardable(name) && name != header::CONTENT_LENGTH {
            out_headers.append(name, value.clone());
        }
    }
    let body = response.bytes().await.map_err(|e| ProxyError::Upstream(e.to_string()))?;
    Ok((status, out_headers, body))
}

/// The upstream URL with the incoming path and query appended.
fn upstream_url(upstream: &Url, uri: &Uri) -> Url {
    let mut url = upstream.clone();
    let base = upstream.path().trim_end_matches('/');
    let path = uri.path();
    if path != "/" || base.is_empty() {
        url.set_path(&format!("{base}{path}"));
    }
    url.set_query(uri.query());
    url
}

fn forwardable(name: &HeaderName) -> bool {
    !matches!(
        name.as_str(),
        "connection" |
            "keep-alive" |
            "proxy-authenticate" |
            "proxy-authorization" |
            "te" |
            "trailer" |
            "transfer-encoding" |
            "upgrade"
    )
}

fn preview(body: &[u8]) -> String {
    let end = body.len().min(PREVIEW_BYTES);
    let mut s = String::from_utf8_lossy(&body[..end]).into_owned();
    if body.len() > PREVIEW_BYTES {
        s.push_str("...");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_paths() {
        let base: Url = "http://127.0.0.1:8545".parse().unwrap();
        assert_eq!(upstream_url(&base, &"/".parse().unwrap()).as_str(), "http://127.0.0.1:8545/");
        assert_eq!(
            upstream_url(&base, &"/rpc?x=1".parse().unwrap()).as_str(),
            "http://127.0.0.1:8545/rpc?x=1"
        );

        let nested: Url = "http://node:8545/eth".parse().unwrap();
        assert_eq!(upstream_url(&nested, &"/".parse().unwrap()).as_str(), "http://node:8545/eth");
    }

    #[test]
    fn hop_by_hop_headers_are_dropped() {
        assert!(!forwardable(&header::CONNECTION));
        assert!(!forwardable(&header::TRANSFER_ENCODING));
        assert!(forwardable(&header::CONTENT_TYPE));
        assert!(forwardable(&HeaderName::from_static("x-eest-id")));
    }

    #[test]
    fn previews_are_truncated() {
        let big = vec![b'a'; PREVIEW_BYTES + 10];
        assert_eq!(preview(&big).len(), PREVIEW_BYTES + 3);
        assert_eq!(preview(b"{}"), "{}");
    }
}
