// crates/execution/src/transport/mod.rs
#![allow(missing_docs)]

pub mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A generic transport for sending JSON-RPC requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a JSON-RPC request and returns the response, giving up after `timeout`.
    async fn send(&self, req: &JsonRpcRequest, timeout: Duration) -> eyre::Result<JsonRpcResponse>;
}

/// Represents a JSON-RPC request object.
///
/// Field order matters: requests are also persisted verbatim as replayable artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    /// Builds a request whose id is the current unix time in seconds.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        let id = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(1);
        Self { jsonrpc: "2.0".to_string(), id, method: method.into(), params }
    }

    /// Minified single-line JSON body.
    pub fn to_line(&self) -> eyre::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Represents a JSON-RPC response object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
    #[serde(default)]
    pub id: Value,
}

/// Represents a JSON-RPC error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}
