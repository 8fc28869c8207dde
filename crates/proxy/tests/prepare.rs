mod common;

use common::{MockEngineApi, block_hash, methods, read_lines};
use gasbench_proxy::prepare::{PreparationOptions, generate, latest_block_hash};
use gasbench_types::constants::{EMPTY_RECIPIENT, FUNDING_FILE, GAS_BUMP_FILE};
use serde_json::{Value, json};

#[tokio::test]
async fn preparation_payloads_are_regenerated() {
    let dir = tempfile::tempdir().unwrap();
    let gas_bump = dir.path().join(GAS_BUMP_FILE);
    std::fs::write(&gas_bump, "stale\n").unwrap();

    let engine = MockEngineApi::default();
    let options = PreparationOptions {
        payload_dir: dir.path().to_path_buf(),
        gas_bump_runs: 3,
        funding_recipient: "0x00000000000000000000000000000000000000f0".into(),
    };
    let report = generate(&engine, &options).await.unwrap();

    assert_eq!(report.gas_bump_blocks, 3);
    assert_eq!(report.funding_block, Some(block_hash(4)));

    let calls = engine.get_payload_calls.lock().unwrap().clone();
    assert!(calls[..3].iter().all(|(txs, recipient)| txs.is_empty() && recipient == EMPTY_RECIPIENT));
    assert_eq!(calls[3].1, options.funding_recipient);

    let bump = read_lines(&gas_bump);
    assert_eq!(bump.len(), 6);
    assert_eq!(methods(&bump[..2]), ["engine_newPayloadV4", "engine_forkchoiceUpdatedV3"]);
    let fcs: &Value = &bump[1]["params"][0];
    assert_eq!(fcs["headBlockHash"], fcs["finalizedBlockHash"]);
    assert_eq!(fcs["safeBlockHash"], json!(block_hash(1)));

    let funding = dir.path().join(FUNDING_FILE);
    assert_eq!(read_lines(&funding).len(), 2);
    assert_eq!(latest_block_hash(&funding).unwrap(), Some(block_hash(4)));
}

#[tokio::test]
async fn failed_gas_bump_still_funds() {
    let dir = tempfile::tempdir().unwrap();
    let engine = MockEngineApi::default();
    engine.fail_next("forkchoice_updated");

    let options = PreparationOptions {
        payload_dir: dir.path().to_path_buf(),
        gas_bump_runs: 5,
        funding_recipient: "0x00000000000000000000000000000000000000f0".into(),
    };
    let report = generate(&engine, &options).await.unwrap();

    assert_eq!(report.gas_bump_blocks, 0);
    assert!(report.funding_block.is_some());
    assert_eq!(std::fs::read_to_string(dir.path().join(GAS_BUMP_FILE)).unwrap(), "");
}
