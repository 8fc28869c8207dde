//! Turns a batch into a block on the node and persists the replayable request pair.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use alloy_primitives::B256;
use alloy_rpc_types_engine::{ForkchoiceState, PayloadStatusEnum};
use color_eyre::eyre::{self, WrapErr};
use gasbench_execution::{EngineApi, engine_api::forkchoice_request};
use gasbench_types::{Phase, ScenarioKey, aliases::BlockHash};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{
    artifacts::{ArtifactStore, PayloadPair},
    batcher::Batch,
    error::ProxyError,
    pause::{OverlayMarker, PauseCoordinator},
    registry::ScenarioRegistry,
};

/// Result of a successful production.
#[derive(Debug, Clone, PartialEq)]
pub struct Produced {
    pub key: ScenarioKey,
    pub stage: u64,
    pub block_hash: BlockHash,
    pub pair: PayloadPair,
}

#[derive(Debug, Default)]
struct ProductionState {
    stages: HashMap<ScenarioKey, u64>,
    anchor: Option<B256>,
    testing_seen: HashSet<ScenarioKey>,
    consecutive_failures: u32,
}

/// Production settings that don't change at runtime.
#[derive(Debug, Clone)]
pub struct ProducerOptions {
    pub recipient: String,
    pub finalized_block: Option<B256>,
    pub reuse_globals: bool,
    pub failure_escalation_threshold: u32,
}

/// Runs `getPayload -> newPayload -> forkchoiceUpdated` for each batch.
///
/// Productions are serialised by one async lock held for the whole handshake, so stage counters,
/// the anchor and the artifact files always move together.
pub struct Producer {
    engine: Arc<dyn EngineApi>,
    artifacts: ArtifactStore,
    registry: Arc<ScenarioRegistry>,
    pause: Arc<PauseCoordinator>,
    options: ProducerOptions,
    phased_started: AtomicBool,
    state: Mutex<ProductionState>,
}

impl Producer {
    pub fn new(
        engine: Arc<dyn EngineApi>,
        artifacts: ArtifactStore,
        registry: Arc<ScenarioRegistry>,
        pause: Arc<PauseCoordinator>,
        options: ProducerOptions,
    ) -> Self {
        let state = ProductionState { anchor: options.finalized_block, ..Default::default() };
        Self {
            engine,
            artifacts,
            registry,
            pause,
            options,
            phased_started: AtomicBool::new(false),
            state: Mutex::new(state),
        }
    }

    /// Whether any setup, testing or cleanup batch has been produced yet.
    pub fn phased_started(&self) -> bool {
        self.phased_started.load(Ordering::Acquire)
    }

    pub async fn anchor(&self) -> Option<B256> {
        self.state.lock().await.anchor
    }

    pub async fn stage(&self, key: &ScenarioKey) -> u64 {
        self.state.lock().await.stages.get(key).copied().unwrap_or_default()
    }

    /// Failed productions since the last successful one.
    pub async fn consecutive_failures(&self) -> u32 {
        self.state.lock().await.consecutive_failures
    }

    /// Whether production failures are currently reported at `error` level.
    pub async fn failures_escalated(&self) -> bool {
        self.escalates(self.state.lock().await.consecutive_failures)
    }

    fn escalates(&self, failures: u32) -> bool {
        failures > 0 && failures >= self.options.failure_escalation_threshold
    }

    /// Produces `batch`. Failures are logged and the batch is dropped; nothing is retried.
    pub async fn produce(&self, batch: Batch) -> Option<Produced> {
        let mut state = self.state.lock().await;
        let key = batch.key.clone();
        let txs = batch.len();

        match self.run_handshake(&mut state, &batch).await {
            Ok(produced) => {
                state.consecutive_failures = 0;
                Some(produced)
            }
            Err(e) => {
                state.consecutive_failures += 1;
                let failures = state.consecutive_failures;
                if self.escalates(failures) {
                    error!(target: "production", scenario = %key, txs, failures, "Production failed: {e:#}");
                } else {
                    warn!(target: "production", scenario = %key, txs, failures, "Production failed: {e:#}");
                }
                None
            }
        }
    }

    async fn run_handshake(&self, state: &mut ProductionState, batch: &Batch) -> eyre::Result<Produced> {
        let key = &batch.key;

        let built = self
            .engine
            .get_payload(&batch.raw_transactions(), &self.options.recipient)
            .await
            .wrap_err("engine_getPayloadV4 failed")?;

        let new_payload = built.new_payload_call();
        let status =
            self.engine.new_payload(&new_payload).await.wrap_err("engine_newPayloadV4 failed")?;
        if status.status != PayloadStatusEnum::Valid {
            warn!(target: "production", scenario = %key, block = %built.block_hash, status = ?status.status, "newPayload not VALID");
        }

        if key.is_global() {
            state.anchor = Some(built.block_hash);
        }
        let anchor = state.anchor.unwrap_or(built.block_hash);
        let fcs = ForkchoiceState {
            head_block_hash: built.block_hash,
            safe_block_hash: anchor,
            finalized_block_hash: anchor,
        };
        self.engine.forkchoice_updated(fcs).await.wrap_err("engine_forkchoiceUpdatedV3 failed")?;

        let pair = PayloadPair::from_requests(&new_payload.request(), &forkchoice_request(&fcs))?;

        let stage = state.stages.entry(key.clone()).or_default();
        *stage += 1;
        let stage = *stage;
        info!(
            target: "production",
            scenario = %key,
            stage,
            txs = batch.len(),
            block = %built.block_hash,
            "Produced block"
        );

        if let Err(e) = self.persist(state, key, stage, built.block_hash, &pair) {
            warn!(target: "production", scenario = %key, stage, error = %e, "Failed to persist payloads");
        }

        Ok(Produced { key: key.clone(), stage, block_hash: built.block_hash, pair })
    }

    fn persist(
        &self,
        state: &mut ProductionState,
        key: &ScenarioKey,
        stage: u64,
        block_hash: BlockHash,
        pair: &PayloadPair,
    ) -> Result<(), ProxyError> {
        if key.phase == Phase::GlobalNoPhase {
            if self.phased_started() {
                return self.artifacts.rotate_global_last(pair);
            }
            if self.options.reuse_globals {
                return Ok(());
            }
            return self.artifacts.append_global_pre_test(pair);
        }

        self.phased_started.store(true, Ordering::Release);
        let name = key.scenario_name();
        let index = self.registry.register(&name);

        match key.phase {
            Phase::Setup => self.artifacts.append(&self.artifacts.phase_file(Phase::Setup, index, &name), pair),
            Phase::Cleanup => {
                self.pause.arm_overlay(OverlayMarker { key: key.clone(), stage, block_hash });
                self.artifacts.append(&self.artifacts.phase_file(Phase::Cleanup, index, &name), pair)
            }
            Phase::Testing => {
                if state.testing_seen.insert(key.clone()) {
                    self.artifacts.write_testing(index, &name, pair)
                } else {
                    self.artifacts.replace_testing(index, &name, pair)
                }
            }
            Phase::GlobalNoPhase => Ok(()),
        }
    }
}
