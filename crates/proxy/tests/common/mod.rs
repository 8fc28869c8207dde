//! Shared helpers for the proxy integration tests.
//!
//! Every test owns a temporary payload directory and a recording Engine API mock; the proxy
//! hooks are driven directly, without HTTP, unless a test needs the server.
#![allow(dead_code)]

pub(crate) mod mocks;

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use axum::http::{HeaderMap, HeaderValue};
use gasbench_proxy::{ProxyOptions, StatefulProxy, producer::ProducerOptions};
use gasbench_types::{
    Phase,
    constants::{EMPTY_RECIPIENT, INDEX_WIDTH, TEST_METADATA_HEADER},
};
use serde_json::{Value, json};
use tempfile::TempDir;

pub(crate) use self::mocks::{MockEngineApi, block_hash};

/// Keeps the payload directory alive for the duration of a test.
pub(crate) struct TestProxy {
    pub dir: TempDir,
    pub engine: MockEngineApi,
    pub proxy: StatefulProxy,
}

impl TestProxy {
    pub(crate) fn new() -> Self {
        Self::with_options(|_| {})
    }

    pub(crate) fn with_options(customize: impl FnOnce(&mut ProxyOptions)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut options = options(dir.path());
        customize(&mut options);

        let engine = MockEngineApi::default();
        let proxy = StatefulProxy::new(options, Arc::new(engine.clone()));
        Self { dir, engine, proxy }
    }

    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn phase_file(&self, phase: Phase, index: u32, name: &str) -> PathBuf {
        self.root()
            .join(phase.as_str())
            .join(format!("{index:0width$}", width = INDEX_WIDTH))
            .join(format!("{name}.txt"))
    }

    /// Pushes a request body through the request hook.
    pub(crate) async fn request(&self, body: Value) {
        let bytes = serde_json::to_vec(&body).unwrap();
        self.proxy.hooks().on_request(&HeaderMap::new(), &bytes).await.unwrap();
    }

    /// Produces whatever is buffered.
    pub(crate) async fn flush(&self) {
        let batch = self.proxy.batcher().take().expect("nothing buffered");
        self.proxy.producer().produce(batch).await.expect("production failed");
    }
}

pub(crate) fn options(payload_dir: &Path) -> ProxyOptions {
    ProxyOptions {
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        rpc_direct: "http://127.0.0.1:1".parse().unwrap(),
        payload_dir: payload_dir.to_path_buf(),
        quiet_period: Duration::from_millis(500),
        poll_interval: Duration::from_millis(200),
        prime_overlay: false,
        overlay_confirmation_scenarios: Vec::new(),
        producer: ProducerOptions {
            recipient: EMPTY_RECIPIENT.to_string(),
            finalized_block: None,
            reuse_globals: false,
            failure_escalation_threshold: 5,
        },
    }
}

pub(crate) fn send_raw(test_id: &str, phase: &str, raw: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": {"testId": test_id, "phase": phase, "txIndex": 0},
        "method": "eth_sendRawTransaction",
        "params": [raw],
    })
}

pub(crate) fn send_raw_global(raw: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "method": "eth_sendRawTransaction", "params": [raw]})
}

pub(crate) fn metadata_header(test_id: &str, phase: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let value = json!({"testId": test_id, "phase": phase}).to_string();
    headers.insert(TEST_METADATA_HEADER, HeaderValue::from_str(&value).unwrap());
    headers
}

pub(crate) fn read_lines(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

pub(crate) fn methods(lines: &[Value]) -> Vec<&str> {
    lines.iter().map(|l| l["method"].as_str().unwrap()).collect()
}
