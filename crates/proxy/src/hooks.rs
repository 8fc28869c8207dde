//! Request and response inspection for every call passing through the proxy.

use std::sync::Arc;

use axum::http::HeaderMap;
use gasbench_execution::engine_api::methods::{ETH_GET_TRANSACTION_BY_HASH, ETH_SEND_RAW_TRANSACTION};
use gasbench_types::{Phase, ScenarioKey, TestMetadata, constants::TEST_METADATA_HEADER};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    batcher::{Batcher, BufferedTx},
    error::ProxyError,
    pause::{PauseCoordinator, PauseTrigger},
    producer::Producer,
};

/// What `on_response` needs to know about a forwarded call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSummary {
    pub key: ScenarioKey,
    pub method: Option<String>,
    pub id: Value,
}

pub struct InterceptionHooks {
    batcher: Arc<Batcher>,
    producer: Arc<Producer>,
    pause: Arc<PauseCoordinator>,
}

impl InterceptionHooks {
    pub fn new(batcher: Arc<Batcher>, producer: Arc<Producer>, pause: Arc<PauseCoordinator>) -> Self {
        Self { batcher, producer, pause }
    }

    /// Runs before a request is forwarded. May block while the proxy is paused, and may produce a
    /// batch that the request closes. Fails only when the proxy shuts down during a pause; the
    /// request must not be forwarded then.
    pub async fn on_request(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<Vec<CallSummary>, ProxyError> {
        self.pause.wait_until_resumed().await?;

        let calls = match parse_calls(body) {
            Some(calls) => calls,
            None => {
                debug!(len = body.len(), "Forwarding non JSON-RPC body untouched");
                return Ok(Vec::new());
            }
        };

        let header_meta = headers
            .get(TEST_METADATA_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(TestMetadata::from_header);

        let mut summaries = Vec::with_capacity(calls.len());
        for call in calls {
            let id = call.get("id").cloned().unwrap_or(Value::Null);
            let meta = TestMetadata::from_id(&id).or_else(|| header_meta.clone());
            let key = ScenarioKey::from_metadata(meta.as_ref());
            let method = call.get("method").and_then(Value::as_str).map(str::to_string);

            self.produce_pending_cleanup(&key).await;
            if let Some(trigger) = self.pause.traffic_trigger(&key, self.producer.phased_started()) {
                self.pause_for(trigger, &key).await?;
            }
            // Another call may have paused the proxy while this one was being looked at.
            self.pause.wait_until_resumed().await?;

            if method.as_deref() == Some(ETH_SEND_RAW_TRANSACTION) {
                self.record_transaction(&key, &call, &id).await;
            }

            summaries.push(CallSummary { key, method, id });
        }
        Ok(summaries)
    }

    /// Runs after the upstream answered.
    pub async fn on_response(&self, calls: &[CallSummary], body: &[u8]) {
        if !calls.iter().any(|c| c.method.as_deref() == Some(ETH_GET_TRANSACTION_BY_HASH)) {
            return;
        }
        let Some(responses) = parse_calls(body) else { return };

        for call in calls.iter().filter(|c| c.method.as_deref() == Some(ETH_GET_TRANSACTION_BY_HASH)) {
            // Batched responses may come back in any order; match them by id.
            let response = if responses.len() == 1 {
                responses.first()
            } else {
                responses.iter().find(|r| r.get("id") == Some(&call.id))
            };
            let found = response.and_then(|r| r.get("result")).is_some_and(is_truthy);
            if !found {
                continue;
            }
            if let Some(trigger) = self.pause.confirmation_trigger(&call.key)
                && let Err(e) = self.pause_for(trigger, &call.key).await
            {
                debug!(error = %e, "Stopped waiting for resume");
                return;
            }
        }
    }

    /// A cleanup batch still buffered for another scenario is produced before `key` is looked
    /// at, so its overlay marker is armed in time.
    async fn produce_pending_cleanup(&self, key: &ScenarioKey) {
        if !key.phase.is_phased() {
            return;
        }
        let boundary = self
            .batcher
            .active_group()
            .is_some_and(|active| active.phase == Phase::Cleanup && !active.same_scenario(key));
        if boundary && let Some(batch) = self.batcher.take() {
            self.producer.produce(batch).await;
        }
    }

    async fn pause_for(&self, trigger: PauseTrigger, key: &ScenarioKey) -> Result<(), ProxyError> {
        // Flush first so the orchestrator snapshots a node that has everything produced.
        if let Some(batch) = self.batcher.take() {
            self.producer.produce(batch).await;
        }
        if let Some(token) = self.pause.fire(trigger, key) {
            info!(target: "pause", %token, incoming = %key, ?trigger, "Holding traffic for overlay swap");
        }
        self.pause.wait_until_resumed().await
    }

    async fn record_transaction(&self, key: &ScenarioKey, call: &Value, id: &Value) {
        let raw = match call.get("params").and_then(|p| p.get(0)).and_then(Value::as_str) {
            Some(raw) if raw.starts_with("0x") => raw.to_string(),
            other => {
                warn!(scenario = %key, param = ?other, "Dropping eth_sendRawTransaction without a 0x payload");
                return;
            }
        };

        let forced = self.batcher.record(key.clone(), BufferedTx { raw, call_id: id.clone() });
        if let Some(batch) = forced {
            self.producer.produce(batch).await;
        }
    }
}

/// A single call or a batch of calls; anything else is not JSON-RPC.
fn parse_calls(body: &[u8]) -> Option<Vec<Value>> {
    match serde_json::from_slice(body).ok()? {
        Value::Array(items) => Some(items.into_iter().filter(Value::is_object).collect()),
        obj @ Value::Object(_) => Some(vec![obj]),
        _ => None,
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_single_and_batched_calls() {
        assert_eq!(parse_calls(br#"{"method":"a"}"#).unwrap().len(), 1);
        assert_eq!(parse_calls(br#"[{"method":"a"},{"method":"b"},3]"#).unwrap().len(), 2);
        assert!(parse_calls(b"not json").is_none());
        assert!(parse_calls(b"42").is_none());
    }

    #[test]
    fn truthiness_of_lookup_results() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!({"hash": "0x01"})));
    }
}
