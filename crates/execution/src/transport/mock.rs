//! A mock transport for testing the Engine API client.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use color_eyre::eyre::{self, eyre};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::{JsonRpcRequest, JsonRpcResponse, Transport};

/// A mock transport that can be programmed with expected responses and records every request.
#[derive(Debug, Default)]
pub struct MockTransport {
    // Per-method queue of responses; a success value becomes `result`, an error fails the send.
    responses: Mutex<HashMap<String, VecDeque<eyre::Result<JsonRpcResponse>>>>,
    calls: Mutex<Vec<JsonRpcRequest>>,
}

impl MockTransport {
    /// Creates a new, empty mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the `result` (or transport failure) returned for the next call to `method`.
    pub async fn push_response(&self, method: &str, response: eyre::Result<Value>) {
        let response = response.map(|result| JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id: json!(1),
        });
        self.responses.lock().await.entry(method.to_string()).or_default().push_back(response);
    }

    /// Queues a JSON-RPC error object for the next call to `method`.
    pub async fn push_error_object(&self, method: &str, code: i64, message: &str) {
        let response = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": code, "message": message}
        }))
        .map_err(Into::into);
        self.responses.lock().await.entry(method.to_string()).or_default().push_back(response);
    }

    /// Every request sent so far, in order.
    pub async fn calls(&self) -> Vec<JsonRpcRequest> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &JsonRpcRequest, _timeout: Duration) -> eyre::Result<JsonRpcResponse> {
        self.calls.lock().await.push(request.clone());
        let response =
            self.responses.lock().await.get_mut(&request.method).and_then(VecDeque::pop_front);

        match response {
            Some(response) => response,
            None => Err(eyre!("MockTransport: received unexpected call to method '{}'", request.method)),
        }
    }
}

#[async_trait]
impl Transport for Arc<MockTransport> {
    async fn send(&self, request: &JsonRpcRequest, timeout: Duration) -> eyre::Result<JsonRpcResponse> {
        self.as_ref().send(request, timeout).await
    }
}
