// crates/execution/src/transport/http.rs

use std::time::Duration;

use async_trait::async_trait;
use color_eyre::eyre;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{JsonRpcRequest, JsonRpcResponse, Transport};
use crate::{ExecutionError, engine_api::jwt::JwtSecretFile};

/// JSON-RPC over HTTP, optionally authenticated with an Engine API bearer token.
pub struct HttpTransport {
    client: Client,
    url: Url,
    jwt: Option<JwtSecretFile>,
}

impl HttpTransport {
    pub fn new(url: Url) -> eyre::Result<Self> {
        let client = Client::builder().pool_idle_timeout(Duration::from_secs(90)).build()?;
        Ok(Self { client, url, jwt: None })
    }

    pub fn with_jwt(mut self, jwt: JwtSecretFile) -> Self {
        self.jwt = Some(jwt);
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &JsonRpcRequest, timeout: Duration) -> eyre::Result<JsonRpcResponse> {
        let mut req_builder = self.client.post(self.url.clone()).timeout(timeout).json(request);

        if let Some(jwt) = &self.jwt {
            req_builder = req_builder.bearer_auth(jwt.token()?);
        }

        debug!(
            url = %self.url,
            method = %request.method,
            authorization = if self.jwt.is_some() { "Bearer <redacted>" } else { "none" },
            body = %serde_json::to_string(request)?,
            "REQ"
        );

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ExecutionError::Timeout { method: request.method.clone(), timeout }
            } else {
                ExecutionError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| ExecutionError::Transport(e.to_string()))?;
        debug!(url = %self.url, %status, body = %String::from_utf8_lossy(&bytes), "RESP");

        if !status.is_success() {
            return Err(ExecutionError::Transport(format!(
                "{} returned HTTP {status}",
                request.method
            ))
            .into());
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| ExecutionError::InvalidResponse(format!("{}: {e}", request.method)).into())
    }
}
