//! Test doubles for the Engine API.

use std::sync::{Arc, Mutex};

use alloy_primitives::B256;
use alloy_rpc_types_engine::{ForkchoiceState, ForkchoiceUpdated, PayloadStatus, PayloadStatusEnum};
use async_trait::async_trait;
use color_eyre::{Result, eyre::eyre};
use gasbench_execution::{BuiltPayload, EngineApi, NewPayloadCall};
use serde_json::json;

/// Engine API mock that builds a chain of fake blocks and records every call.
///
/// Block `n` (1-based) has hash `B256::with_last_byte(n)` and block `n - 1` as parent.
#[derive(Default, Clone)]
pub(crate) struct MockEngineApi {
    pub get_payload_calls: Arc<Mutex<Vec<(Vec<String>, String)>>>,
    pub new_payload_calls: Arc<Mutex<Vec<NewPayloadCall>>>,
    pub forkchoice_calls: Arc<Mutex<Vec<ForkchoiceState>>>,
    fail_next: Arc<Mutex<Option<&'static str>>>,
}

impl MockEngineApi {
    /// Makes the next call to `method` (`get_payload`, `new_payload` or `forkchoice_updated`)
    /// fail once.
    pub(crate) fn fail_next(&self, method: &'static str) {
        *self.fail_next.lock().unwrap() = Some(method);
    }

    pub(crate) fn produced(&self) -> Vec<Vec<String>> {
        self.get_payload_calls.lock().unwrap().iter().map(|(txs, _)| txs.clone()).collect()
    }

    pub(crate) fn last_forkchoice(&self) -> Option<ForkchoiceState> {
        self.forkchoice_calls.lock().unwrap().last().copied()
    }

    fn check_failure(&self, method: &'static str) -> Result<()> {
        let mut fail = self.fail_next.lock().unwrap();
        if *fail == Some(method) {
            *fail = None;
            return Err(eyre!("mock {method} failure"));
        }
        Ok(())
    }
}

pub(crate) fn block_hash(n: usize) -> B256 {
    B256::with_last_byte(n as u8)
}

#[async_trait]
impl EngineApi for MockEngineApi {
    async fn get_payload(&self, transactions: &[String], recipient: &str) -> Result<BuiltPayload> {
        self.check_failure("get_payload")?;
        let mut calls = self.get_payload_calls.lock().unwrap();
        calls.push((transactions.to_vec(), recipient.to_string()));
        let n = calls.len();

        let envelope = json!({
            "executionPayload": {
                "parentHash": block_hash(n - 1),
                "blockHash": block_hash(n),
                "transactions": transactions,
            },
            "blockValue": "0x0",
        });
        Ok(BuiltPayload::from_envelope(envelope)?)
    }

    async fn new_payload(&self, call: &NewPayloadCall) -> Result<PayloadStatus> {
        self.check_failure("new_payload")?;
        self.new_payload_calls.lock().unwrap().push(call.clone());
        Ok(PayloadStatus::from_status(PayloadStatusEnum::Valid))
    }

    async fn forkchoice_updated(&self, state: ForkchoiceState) -> Result<ForkchoiceUpdated> {
        self.check_failure("forkchoice_updated")?;
        self.forkchoice_calls.lock().unwrap().push(state);
        Ok(ForkchoiceUpdated {
            payload_status: PayloadStatus::new(PayloadStatusEnum::Valid, Some(state.head_block_hash)),
            payload_id: None,
        })
    }
}
