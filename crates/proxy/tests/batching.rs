mod common;

use std::time::Duration;

use common::{TestProxy, metadata_header, send_raw, send_raw_global};
use gasbench_proxy::{batcher::BufferedTx, pause::PauseContext};
use gasbench_types::{
    Phase, ScenarioKey,
    control::{PauseRequest, ResumeSignal},
};
use serde_json::json;

#[tokio::test]
async fn scenario_switch_produces_previous_batch_first() {
    let t = TestProxy::new();
    t.request(send_raw("a.py::t", "setup", "0x01")).await;
    t.request(send_raw("a.py::t", "setup", "0x02")).await;
    t.request(send_raw("b.py::t", "setup", "0x03")).await;

    assert_eq!(t.engine.produced(), [vec!["0x01".to_string(), "0x02".into()]]);
    assert_eq!(t.proxy.batcher().active_group(), Some(ScenarioKey::new("b", "t", Phase::Setup)));

    t.flush().await;
    assert_eq!(t.engine.produced()[1], ["0x03"]);
}

#[tokio::test]
async fn batched_request_bodies_are_split_per_call() {
    let t = TestProxy::new();
    let body = json!([
        send_raw("a.py::t", "testing", "0x01"),
        {"jsonrpc": "2.0", "id": 9, "method": "eth_blockNumber", "params": []},
        send_raw("a.py::t", "testing", "0x02"),
    ]);
    t.request(body).await;
    t.flush().await;

    assert_eq!(t.engine.produced(), [vec!["0x01".to_string(), "0x02".into()]]);
}

#[tokio::test]
async fn header_metadata_is_used_when_id_has_none() {
    let t = TestProxy::new();
    let body = serde_json::to_vec(&send_raw_global("0x01")).unwrap();
    t.proxy.hooks().on_request(&metadata_header("x/h.py::t", "cleanup"), &body).await.unwrap();

    assert_eq!(t.proxy.batcher().active_group(), Some(ScenarioKey::new("h", "t", Phase::Cleanup)));
}

#[tokio::test]
async fn invalid_transactions_and_bodies_are_not_batched() {
    let t = TestProxy::new();
    t.request(send_raw("a.py::t", "setup", "deadbeef")).await;
    t.request(json!({"jsonrpc": "2.0", "id": 1, "method": "eth_sendRawTransaction", "params": []})).await;
    assert!(t.proxy.hooks().on_request(&Default::default(), b"<html>").await.unwrap().is_empty());

    assert!(t.proxy.batcher().is_idle());
}

#[tokio::test(start_paused = true)]
async fn quiet_batches_are_produced_by_the_monitor() {
    let mut t = TestProxy::new();
    t.proxy.spawn_background();

    t.request(send_raw("a.py::t", "setup", "0x01")).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    t.request(send_raw("a.py::t", "setup", "0x02")).await;

    // 450ms after the last transaction: still inside the quiet period.
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert!(t.engine.produced().is_empty());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(t.engine.produced(), [vec!["0x01".to_string(), "0x02".into()]]);
    assert!(t.proxy.batcher().is_idle());

    t.proxy.stop().await;
}

#[tokio::test(start_paused = true)]
async fn quiet_batches_wait_while_paused() {
    let mut t = TestProxy::new();
    t.proxy.spawn_background();

    let ctx = PauseContext { scenario: "s__t".into(), phase: Phase::Cleanup, stage: 1, block_hash: None };
    t.proxy.pause().request_pause(ctx).unwrap();
    // Buffered behind the hooks' back, the way a request racing the pause would be.
    let key = ScenarioKey::new("a", "t", Phase::Setup);
    assert!(t.proxy.batcher().record(key, BufferedTx { raw: "0x01".into(), call_id: json!(1) }).is_none());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(t.engine.produced().is_empty());
    assert!(!t.proxy.batcher().is_idle());

    let request: PauseRequest =
        serde_json::from_slice(&std::fs::read(t.proxy.pause().pause_file()).unwrap()).unwrap();
    let signal = serde_json::to_vec(&ResumeSignal::answering(&request)).unwrap();
    std::fs::write(t.proxy.pause().resume_file(), signal).unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!t.proxy.pause().is_paused());
    assert_eq!(t.engine.produced(), [vec!["0x01".to_string()]]);

    t.proxy.stop().await;
}

#[tokio::test]
async fn stop_discards_buffered_transactions() {
    let mut t = TestProxy::new();
    t.proxy.spawn_background();
    t.request(send_raw("a.py::t", "setup", "0x01")).await;

    let TestProxy { proxy, engine, dir: _dir } = t;
    let batcher = proxy.batcher().clone();
    proxy.stop().await;

    assert!(batcher.is_idle());
    assert!(engine.produced().is_empty());
}
