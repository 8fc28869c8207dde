#![allow(missing_docs)]
use std::{fmt, sync::Arc, time::Duration};

use alloy_rpc_types_engine::{ForkchoiceState, ForkchoiceUpdated, PayloadStatus};
use async_trait::async_trait;
use color_eyre::eyre;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{BuiltPayload, EngineApi, NewPayloadCall, forkchoice_params, get_payload_params};
use crate::{
    ExecutionError,
    engine_api::methods::*,
    transport::{JsonRpcRequest, Transport},
};

pub struct EngineApiClient {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl EngineApiClient {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self { transport: Arc::new(transport), timeout: DEFAULT_ENGINE_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn request<R>(&self, method: &str, params: Value) -> eyre::Result<R>
    where
        R: DeserializeOwned,
    {
        let req = JsonRpcRequest::new(method, params);

        let resp = self.transport.send(&req, self.timeout).await?;

        if let Some(err) = resp.error {
            return Err(ExecutionError::JsonRpc { code: err.code, message: err.message }.into());
        }

        let res = resp.result.ok_or_else(|| {
            ExecutionError::InvalidResponse(format!("missing result field in {method} response"))
        })?;

        serde_json::from_value(res)
            .map_err(|e| ExecutionError::InvalidResponse(format!("{method}: {e}")).into())
    }
}

impl fmt::Debug for EngineApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineApiClient")
            .field("transport", &"<dyn Transport>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl EngineApi for EngineApiClient {
    async fn get_payload(
        &self,
        transactions: &[String],
        recipient: &str,
    ) -> eyre::Result<BuiltPayload> {
        let envelope: Value =
            self.request(ENGINE_GET_PAYLOAD_V4, get_payload_params(transactions, recipient)).await?;
        Ok(BuiltPayload::from_envelope(envelope)?)
    }

    async fn new_payload(&self, call: &NewPayloadCall) -> eyre::Result<PayloadStatus> {
        self.request(ENGINE_NEW_PAYLOAD_V4, call.params()).await
    }

    /// Notify that a fork choice has been updated, to set the head of the chain
    /// - head_block_hash: The block hash of the head of the chain
    /// - safe_block_hash: The block hash of the most recent "safe" block
    /// - finalized_block_hash: The block hash of the highest finalized block
    async fn forkchoice_updated(&self, state: ForkchoiceState) -> eyre::Result<ForkchoiceUpdated> {
        self.request(ENGINE_FORKCHOICE_UPDATED_V3, forkchoice_params(&state)).await
    }
}
