//! Pause/resume handshake with the orchestrator.
//!
//! When the proxy reaches a point where the node's filesystem should be swapped (a scenario's
//! cleanup was produced and the next scenario starts), it writes `_control/pause.json` and holds
//! every incoming request until the orchestrator answers with a matching `_control/resume.json`.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use gasbench_types::{
    Phase, ScenarioKey,
    aliases::BlockHash,
    constants::{CONTROL_DIR, PAUSE_FILE, RESUME_FILE},
    control::{PauseRequest, ResumeSignal, unix_timestamp},
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{error::ProxyError, fs};

/// Armed by a cleanup production: the overlay for the next scenario should be prepared once its
/// traffic shows up.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayMarker {
    pub key: ScenarioKey,
    pub stage: u64,
    pub block_hash: BlockHash,
}

/// What a pause request reports to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct PauseContext {
    pub scenario: String,
    pub phase: Phase,
    pub stage: u64,
    pub block_hash: Option<BlockHash>,
}

impl From<&OverlayMarker> for PauseContext {
    fn from(marker: &OverlayMarker) -> Self {
        Self {
            scenario: marker.key.scenario_name(),
            phase: marker.key.phase,
            stage: marker.stage,
            block_hash: Some(marker.block_hash),
        }
    }
}

/// Why traffic should pause the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseTrigger {
    /// A pending overlay marker met traffic that confirms the scenario boundary.
    Overlay,
    /// First phased traffic with `prime_overlay` enabled.
    Prime,
}

/// Outcome of one look at the resume file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeCheck {
    NotPaused,
    Waiting,
    Mismatch,
    Resumed(Uuid),
}

#[derive(Debug, Default)]
struct PauseState {
    outstanding: Option<PauseRequest>,
    pending_overlay: Option<OverlayMarker>,
    primed: bool,
}

#[derive(Debug)]
pub struct PauseCoordinator {
    pause_file: PathBuf,
    resume_file: PathBuf,
    prime_overlay: bool,
    confirmation_scenarios: HashSet<String>,
    state: Mutex<PauseState>,
    paused: watch::Sender<bool>,
    shutdown: CancellationToken,
}

impl PauseCoordinator {
    pub fn new(
        payload_dir: &Path,
        prime_overlay: bool,
        confirmation_scenarios: impl IntoIterator<Item = String>,
    ) -> Self {
        let control_dir = payload_dir.join(CONTROL_DIR);
        Self {
            pause_file: control_dir.join(PAUSE_FILE),
            resume_file: control_dir.join(RESUME_FILE),
            prime_overlay,
            confirmation_scenarios: confirmation_scenarios.into_iter().collect(),
            state: Mutex::default(),
            paused: watch::Sender::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    /// Releases every waiter with [`ProxyError::ShuttingDown`] once `token` is cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn pause_file(&self) -> &Path {
        &self.pause_file
    }

    pub fn resume_file(&self) -> &Path {
        &self.resume_file
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().outstanding.is_some()
    }

    /// The pause request currently waiting for a resume.
    pub fn outstanding(&self) -> Option<PauseRequest> {
        self.state.lock().outstanding.clone()
    }

    pub fn pending_overlay(&self) -> Option<OverlayMarker> {
        self.state.lock().pending_overlay.clone()
    }

    pub fn arm_overlay(&self, marker: OverlayMarker) {
        info!(target: "pause", scenario = %marker.key, stage = marker.stage, block = %marker.block_hash, "Overlay pending");
        self.state.lock().pending_overlay = Some(marker);
    }

    /// Writes a new pause request unless one is already outstanding.
    pub fn request_pause(&self, ctx: PauseContext) -> Option<Uuid> {
        let mut state = self.state.lock();
        self.pause_locked(&mut state, ctx)
    }

    fn pause_locked(&self, state: &mut PauseState, ctx: PauseContext) -> Option<Uuid> {
        if let Some(current) = &state.outstanding {
            debug!(target: "pause", token = %current.token, scenario = ctx.scenario, "Already paused");
            return None;
        }

        let request = PauseRequest {
            token: Uuid::new_v4(),
            scenario: ctx.scenario,
            phase: ctx.phase,
            stage: ctx.stage,
            block_hash: ctx.block_hash,
            timestamp: unix_timestamp(),
        };
        if let Err(e) = self.write_pause_file(&request) {
            warn!(target: "pause", error = %e, scenario = request.scenario, "Failed to write pause request, not pausing");
            return None;
        }

        info!(
            target: "pause",
            token = %request.token,
            scenario = request.scenario,
            phase = %request.phase,
            stage = request.stage,
            "Paused, waiting for orchestrator"
        );
        let token = request.token;
        state.outstanding = Some(request);
        self.paused.send_replace(true);
        Some(token)
    }

    fn write_pause_file(&self, request: &PauseRequest) -> Result<(), ProxyError> {
        let data =
            serde_json::to_vec_pretty(request).map_err(|e| ProxyError::json(&self.pause_file, e))?;
        fs::write_atomic(&self.pause_file, &data)
    }

    /// Whether a request carrying traffic for `key` crosses a scenario boundary.
    pub fn traffic_trigger(&self, key: &ScenarioKey, phased_produced: bool) -> Option<PauseTrigger> {
        if !key.phase.is_phased() {
            return None;
        }
        let state = self.state.lock();
        if state.outstanding.is_some() {
            return None;
        }
        match &state.pending_overlay {
            Some(marker) if !marker.key.same_scenario(key) => Some(PauseTrigger::Overlay),
            _ if self.prime_overlay && !state.primed && !phased_produced => Some(PauseTrigger::Prime),
            _ => None,
        }
    }

    /// Whether a truthy `eth_getTransactionByHash` result for `key` confirms the boundary.
    pub fn confirmation_trigger(&self, key: &ScenarioKey) -> Option<PauseTrigger> {
        if !key.phase.is_phased() {
            return None;
        }
        let state = self.state.lock();
        let marker = state.pending_overlay.as_ref()?;
        if state.outstanding.is_some() {
            return None;
        }
        let confirmed = !marker.key.same_scenario(key) ||
            self.confirmation_scenarios.contains(&key.scenario_name());
        confirmed.then_some(PauseTrigger::Overlay)
    }

    /// Requests the pause for a trigger. The overlay marker is consumed only when the pause is
    /// actually written; priming happens at most once.
    pub fn fire(&self, trigger: PauseTrigger, key: &ScenarioKey) -> Option<Uuid> {
        let mut state = self.state.lock();
        match trigger {
            PauseTrigger::Overlay => {
                let ctx = PauseContext::from(state.pending_overlay.as_ref()?);
                let token = self.pause_locked(&mut state, ctx)?;
                state.pending_overlay = None;
                Some(token)
            }
            PauseTrigger::Prime => {
                if state.primed {
                    return None;
                }
                let ctx = PauseContext {
                    scenario: key.scenario_name(),
                    phase: key.phase,
                    stage: 0,
                    block_hash: None,
                };
                let token = self.pause_locked(&mut state, ctx)?;
                state.primed = true;
                Some(token)
            }
        }
    }

    /// Looks at the resume file once. A signal echoing the outstanding token and scenario clears
    /// the pause, deletes the file and wakes every waiter; anything else leaves the file alone.
    pub fn poll_resume(&self) -> ResumeCheck {
        let mut state = self.state.lock();
        let Some(current) = &state.outstanding else { return ResumeCheck::NotPaused };

        let raw = match fs::read_optional(&self.resume_file) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ResumeCheck::Waiting,
            Err(e) => {
                warn!(target: "pause", error = %e, "Failed to read resume file");
                return ResumeCheck::Waiting;
            }
        };

        let signal: ResumeSignal = match serde_json::from_str(&raw) {
            Ok(signal) => signal,
            Err(e) => {
                warn!(target: "pause", error = %e, "Ignoring malformed resume file");
                return ResumeCheck::Mismatch;
            }
        };
        if !signal.matches(&current.token, &current.scenario) {
            warn!(
                target: "pause",
                expected_token = %current.token,
                expected_scenario = current.scenario,
                got_token = %signal.token,
                got_scenario = signal.scenario,
                "Resume signal does not match outstanding pause"
            );
            return ResumeCheck::Mismatch;
        }

        let token = current.token;
        if let Err(e) = fs::remove_if_exists(&self.resume_file) {
            warn!(target: "pause", error = %e, "Failed to delete consumed resume file");
        }
        state.outstanding = None;
        self.paused.send_replace(false);
        info!(target: "pause", %token, scenario = signal.scenario, "Resumed");
        ResumeCheck::Resumed(token)
    }

    /// Returns once no pause is outstanding, or fails when the proxy shuts down first.
    pub async fn wait_until_resumed(&self) -> Result<(), ProxyError> {
        let mut rx = self.paused.subscribe();
        tokio::select! {
            biased;
            // The sender lives as long as `self`, so this only completes once unpaused.
            _ = rx.wait_for(|paused| !*paused) => Ok(()),
            _ = self.shutdown.cancelled() => Err(ProxyError::ShuttingDown),
        }
    }
}
