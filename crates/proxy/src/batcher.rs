//! Groups intercepted raw transactions into per-scenario batches.
//!
//! A batch closes when traffic for a different scenario key arrives (forced) or when no
//! transaction has been recorded for `quiet_period` (quiet). Production always happens outside
//! the lock on the detached batch.

use std::{mem, time::Duration};

use gasbench_types::ScenarioKey;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info};

/// A raw transaction together with the JSON-RPC id of the call that carried it.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedTx {
    pub raw: String,
    pub call_id: Value,
}

/// Transactions of one scenario key, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub key: ScenarioKey,
    pub transactions: Vec<BufferedTx>,
}

impl Batch {
    pub fn raw_transactions(&self) -> Vec<String> {
        self.transactions.iter().map(|tx| tx.raw.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[derive(Debug, Default)]
struct BatchState {
    active: Option<ScenarioKey>,
    buffer: Vec<BufferedTx>,
    last_touched: Option<Instant>,
}

impl BatchState {
    fn detach(&mut self) -> Option<Batch> {
        let key = self.active.take()?;
        self.last_touched = None;
        let transactions = mem::take(&mut self.buffer);
        (!transactions.is_empty()).then_some(Batch { key, transactions })
    }
}

#[derive(Debug)]
pub struct Batcher {
    quiet_period: Duration,
    state: Mutex<BatchState>,
}

impl Batcher {
    pub fn new(quiet_period: Duration) -> Self {
        Self { quiet_period, state: Mutex::default() }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    pub fn record(&self, key: ScenarioKey, tx: BufferedTx) -> Option<Batch> {
        self.record_at(key, tx, Instant::now())
    }

    /// Buffers `tx` under `key`. When another key is accumulating, its buffer is detached and
    /// returned; the caller must produce it before forwarding the new request.
    pub fn record_at(&self, key: ScenarioKey, tx: BufferedTx, now: Instant) -> Option<Batch> {
        let mut state = self.state.lock();

        let forced = match &state.active {
            Some(active) if *active != key => state.detach(),
            _ => None,
        };
        if let Some(batch) = &forced {
            info!(target: "production", from = %batch.key, to = %key, txs = batch.len(), "Scenario changed, flushing batch");
        }

        state.active = Some(key);
        state.buffer.push(tx);
        state.last_touched = Some(now);
        debug!(buffered = state.buffer.len(), "Recorded transaction");

        forced
    }

    /// Detaches the buffer once `now` is at least `quiet_period` past the last recorded
    /// transaction.
    pub fn take_if_quiet(&self, now: Instant) -> Option<Batch> {
        let mut state = self.state.lock();
        let last = state.last_touched?;
        if state.buffer.is_empty() || now.saturating_duration_since(last) < self.quiet_period {
            return None;
        }
        state.detach()
    }

    /// Detaches whatever is buffered, regardless of the quiet period.
    pub fn take(&self) -> Option<Batch> {
        self.state.lock().detach()
    }

    /// Drops the buffer without producing it. Returns how many transactions were dropped.
    pub fn discard(&self) -> usize {
        let dropped = self.state.lock().detach().map(|b| b.len()).unwrap_or_default();
        if dropped > 0 {
            info!(target: "production", dropped, "Discarded buffered transactions");
        }
        dropped
    }

    pub fn active_group(&self) -> Option<ScenarioKey> {
        self.state.lock().active.clone()
    }

    pub fn is_idle(&self) -> bool {
        self.state.lock().active.is_none()
    }
}
