//! Preparation payloads replayed before any test: a run of empty blocks that lets the gas limit
//! climb, then one block paying the funding account.

use std::path::{Path, PathBuf};

use alloy_rpc_types_engine::ForkchoiceState;
use color_eyre::eyre::{self, WrapErr};
use gasbench_execution::{EngineApi, engine_api::forkchoice_request};
use gasbench_types::{
    aliases::BlockHash,
    constants::{EMPTY_RECIPIENT, FUNDING_FILE, GAS_BUMP_FILE},
};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    artifacts::{ArtifactStore, PayloadPair},
    error::ProxyError,
    fs,
};

pub const DEFAULT_GAS_BUMP_RUNS: usize = 301;

#[derive(Debug, Clone)]
pub struct PreparationOptions {
    pub payload_dir: PathBuf,
    pub gas_bump_runs: usize,
    /// Fee recipient of the funding block.
    pub funding_recipient: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparationReport {
    pub gas_bump_blocks: usize,
    /// The block to configure as `finalized_block`, when funding succeeded.
    pub funding_block: Option<BlockHash>,
}

/// Builds, imports and canonicalises one block without transactions. Safe and finalized follow
/// the head.
pub async fn produce_empty_block(engine: &dyn EngineApi, recipient: &str) -> eyre::Result<(BlockHash, PayloadPair)> {
    let built = engine.get_payload(&[], recipient).await.wrap_err("engine_getPayloadV4 failed")?;
    let call = built.new_payload_call();
    engine.new_payload(&call).await.wrap_err("engine_newPayloadV4 failed")?;

    let fcs = ForkchoiceState {
        head_block_hash: built.block_hash,
        safe_block_hash: built.block_hash,
        finalized_block_hash: built.block_hash,
    };
    engine.forkchoice_updated(fcs).await.wrap_err("engine_forkchoiceUpdatedV3 failed")?;

    Ok((built.block_hash, PayloadPair::from_requests(&call.request(), &forkchoice_request(&fcs))?))
}

/// Regenerates `gas-bump.txt` and `funding.txt`. A failing step stops its run and is logged; the
/// report says how far it got.
pub async fn generate(engine: &dyn EngineApi, options: &PreparationOptions) -> eyre::Result<PreparationReport> {
    let store = ArtifactStore::new(&options.payload_dir);
    let gas_bump = store.global_file(GAS_BUMP_FILE);
    let funding = store.global_file(FUNDING_FILE);
    fs::truncate(&gas_bump)?;
    fs::truncate(&funding)?;

    let mut report = PreparationReport::default();
    info!(runs = options.gas_bump_runs, "Generating gas bump payloads");
    for run in 0..options.gas_bump_runs {
        match produce_empty_block(engine, EMPTY_RECIPIENT).await {
            Ok((_, pair)) => {
                store.append(&gas_bump, &pair)?;
                report.gas_bump_blocks += 1;
            }
            Err(e) => {
                warn!(run, "Gas bump failed: {e:#}");
                break;
            }
        }
    }

    match produce_empty_block(engine, &options.funding_recipient).await {
        Ok((block_hash, pair)) => {
            store.append(&funding, &pair)?;
            info!(block = %block_hash, "Funding block produced");
            report.funding_block = Some(block_hash);
        }
        Err(e) => warn!("Funding block failed: {e:#}"),
    }

    Ok(report)
}

/// Block hash of the last `engine_newPayload*` request in a payload file.
pub fn latest_block_hash(path: &Path) -> Result<Option<BlockHash>, ProxyError> {
    let Some(content) = fs::read_optional(path)? else { return Ok(None) };

    let hash = content
        .lines()
        .rev()
        .filter_map(|line| serde_json::from_str::<Value>(line.trim()).ok())
        .filter(|req| req.get("method").and_then(Value::as_str).is_some_and(|m| m.starts_with("engine_newPayload")))
        .find_map(|req| req.pointer("/params/0/blockHash")?.as_str()?.parse().ok());
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;

    use super::*;

    #[test]
    fn latest_block_hash_skips_noise() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FUNDING_FILE);
        assert_eq!(latest_block_hash(&path).unwrap(), None);

        let np = |b: u8| {
            format!(r#"{{"jsonrpc":"2.0","id":1,"method":"engine_newPayloadV4","params":[{{"blockHash":"{}"}},[],"0x00",[]]}}"#, B256::repeat_byte(b))
        };
        let fcu = r#"{"jsonrpc":"2.0","id":1,"method":"engine_forkchoiceUpdatedV3","params":[{},null]}"#;
        std::fs::write(&path, format!("{}\n{fcu}\n{}\n{fcu}\ngarbage\n\n", np(1), np(2))).unwrap();

        assert_eq!(latest_block_hash(&path).unwrap(), Some(B256::repeat_byte(2)));
    }
}
