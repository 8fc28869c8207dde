// crates/execution/src/engine_api/mod.rs

pub mod client;
pub mod jwt;
pub mod methods;

use alloy_primitives::B256;
use alloy_rpc_types_engine::{ForkchoiceState, ForkchoiceUpdated, PayloadStatus};
use async_trait::async_trait;
use color_eyre::eyre;
use serde_json::{Value, json};

use crate::{
    ExecutionError,
    engine_api::methods::{ENGINE_FORKCHOICE_UPDATED_V3, ENGINE_NEW_PAYLOAD_V4},
    transport::JsonRpcRequest,
};

/// The Engine API calls used to build, import and canonicalise benchmark blocks.
#[async_trait]
pub trait EngineApi: Send + Sync {
    /// Asks the node to build a block from exactly `transactions` (raw, 0x-prefixed) paying
    /// fees to `recipient`. An empty list is sent as `null`, which builds an empty block.
    async fn get_payload(&self, transactions: &[String], recipient: &str)
    -> eyre::Result<BuiltPayload>;

    /// Submits a built payload for import.
    async fn new_payload(&self, call: &NewPayloadCall) -> eyre::Result<PayloadStatus>;

    /// Moves head, safe and finalized pointers. No payload attributes are ever sent.
    async fn forkchoice_updated(&self, state: ForkchoiceState) -> eyre::Result<ForkchoiceUpdated>;
}

/// A block returned by `engine_getPayloadV4`.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltPayload {
    /// The `executionPayload` object exactly as returned by the node.
    pub execution_payload: Value,
    /// Declared parent, or the zero hash when the node omits it.
    pub parent_hash: B256,
    pub block_hash: B256,
}

impl BuiltPayload {
    /// Extracts the payload from a `getPayload` envelope.
    pub fn from_envelope(envelope: Value) -> Result<Self, ExecutionError> {
        let Value::Object(mut envelope) = envelope else {
            return Err(ExecutionError::InvalidResponse("getPayload result is not an object".into()));
        };
        let execution_payload = envelope
            .remove("executionPayload")
            .filter(Value::is_object)
            .ok_or_else(|| ExecutionError::InvalidResponse("missing executionPayload".into()))?;

        let parent_hash = hash_field(&execution_payload, "parentHash").unwrap_or(B256::ZERO);
        let block_hash = hash_field(&execution_payload, "blockHash").ok_or_else(|| {
            ExecutionError::InvalidResponse("executionPayload without a valid blockHash".into())
        })?;

        Ok(Self { execution_payload, parent_hash, block_hash })
    }

    pub fn new_payload_call(&self) -> NewPayloadCall {
        NewPayloadCall {
            execution_payload: self.execution_payload.clone(),
            parent_hash: self.parent_hash,
        }
    }
}

fn hash_field(payload: &Value, field: &str) -> Option<B256> {
    payload.get(field)?.as_str()?.parse().ok()
}

/// Parameters of an `engine_newPayloadV4` call.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayloadCall {
    pub execution_payload: Value,
    pub parent_hash: B256,
}

impl NewPayloadCall {
    /// `[payload, versionedHashes, parentBeaconBlockRoot, executionRequests]`. Benchmark blocks
    /// carry no blobs and no requests, and the parent hash stands in for the beacon root.
    pub fn params(&self) -> Value {
        json!([self.execution_payload, [], self.parent_hash, []])
    }

    pub fn request(&self) -> JsonRpcRequest {
        JsonRpcRequest::new(ENGINE_NEW_PAYLOAD_V4, self.params())
    }
}

pub fn get_payload_params(transactions: &[String], recipient: &str) -> Value {
    if transactions.is_empty() { json!([null, recipient]) } else { json!([transactions, recipient]) }
}

pub fn forkchoice_params(state: &ForkchoiceState) -> Value {
    json!([state, null])
}

pub fn forkchoice_request(state: &ForkchoiceState) -> JsonRpcRequest {
    JsonRpcRequest::new(ENGINE_FORKCHOICE_UPDATED_V3, forkchoice_params(state))
}
