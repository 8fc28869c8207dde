//! Orchestrator side of the pause/resume handshake.
//!
//! The orchestrator swaps the node's filesystem when it sees `pause.json` and then calls into
//! this module to release the proxy.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use color_eyre::eyre;
use gasbench_types::{
    constants::{CONTROL_DIR, PAUSE_FILE, RESUME_FILE},
    control::{PauseRequest, ResumeSignal},
};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::{error::ProxyError, fs};

pub const DEFAULT_RESUME_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_RESUME_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// The proxy deleted the resume file.
    Acknowledged,
    /// The file was still there when the wait ran out.
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct ControlDir {
    dir: PathBuf,
}

impl ControlDir {
    pub fn new(payload_dir: &Path) -> Self {
        Self { dir: payload_dir.join(CONTROL_DIR) }
    }

    pub fn pause_file(&self) -> PathBuf {
        self.dir.join(PAUSE_FILE)
    }

    pub fn resume_file(&self) -> PathBuf {
        self.dir.join(RESUME_FILE)
    }

    pub fn read_pause_request(&self) -> Result<Option<PauseRequest>, ProxyError> {
        let path = self.pause_file();
        let Some(raw) = fs::read_optional(&path)? else { return Ok(None) };
        serde_json::from_str(&raw).map(Some).map_err(|e| ProxyError::json(path, e))
    }

    /// Replaces any stale resume file with `signal`, atomically.
    pub fn write_resume(&self, signal: &ResumeSignal) -> Result<(), ProxyError> {
        let path = self.resume_file();
        fs::remove_if_exists(&path)?;
        let data = serde_json::to_vec_pretty(signal).map_err(|e| ProxyError::json(&path, e))?;
        fs::write_atomic(&path, &data)
    }

    /// Waits until the proxy consumed (deleted) the resume file.
    pub async fn wait_consumed(&self, timeout: Duration, poll: Duration) -> ResumeOutcome {
        let path = self.resume_file();
        let deadline = Instant::now() + timeout;
        while path.exists() {
            if Instant::now() >= deadline {
                return ResumeOutcome::TimedOut;
            }
            tokio::time::sleep(poll).await;
        }
        ResumeOutcome::Acknowledged
    }
}

/// Answers the outstanding pause request and waits for the proxy to pick the answer up.
///
/// A timeout is reported but is not an error; the proxy may simply be slow to poll.
pub async fn resume(control: &ControlDir, timeout: Duration, poll: Duration) -> eyre::Result<(PauseRequest, ResumeOutcome)> {
    let request = control.read_pause_request()?.ok_or_else(|| ProxyError::NoPauseRequest(control.pause_file()))?;

    control.write_resume(&ResumeSignal::answering(&request))?;
    info!(target: "pause", token = %request.token, scenario = request.scenario, "Resume signal written");

    let outcome = control.wait_consumed(timeout, poll).await;
    match outcome {
        ResumeOutcome::Acknowledged => {
            info!(target: "pause", token = %request.token, scenario = request.scenario, "Resume acknowledged")
        }
        ResumeOutcome::TimedOut => warn!(
            target: "pause",
            token = %request.token,
            scenario = request.scenario,
            timeout_secs = timeout.as_secs(),
            "Resume signal not consumed in time"
        ),
    }
    Ok((request, outcome))
}

#[cfg(test)]
mod tests {
    use gasbench_types::Phase;
    use uuid::Uuid;

    use super::*;

    fn pause_request() -> PauseRequest {
        PauseRequest {
            token: Uuid::new_v4(),
            scenario: "file__a".into(),
            phase: Phase::Cleanup,
            stage: 2,
            block_hash: None,
            timestamp: 1.0,
        }
    }

    #[tokio::test]
    async fn missing_pause_request_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let control = ControlDir::new(dir.path());
        let err = resume(&control, Duration::from_millis(10), Duration::from_millis(1)).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<ProxyError>(), Some(ProxyError::NoPauseRequest(_))));
    }

    #[tokio::test]
    async fn unconsumed_resume_times_out_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let control = ControlDir::new(dir.path());
        let request = pause_request();
        fs::write_atomic(&control.pause_file(), &serde_json::to_vec(&request).unwrap()).unwrap();

        let (read, outcome) =
            resume(&control, Duration::from_millis(30), Duration::from_millis(5)).await.unwrap();
        assert_eq!(read, request);
        assert_eq!(outcome, ResumeOutcome::TimedOut);

        let signal: ResumeSignal =
            serde_json::from_str(&std::fs::read_to_string(control.resume_file()).unwrap()).unwrap();
        assert!(signal.matches(&request.token, "file__a"));
    }

    #[tokio::test]
    async fn consumed_resume_is_acknowledged() {
        let dir = tempfile::tempdir().unwrap();
        let control = ControlDir::new(dir.path());
        fs::write_atomic(&control.pause_file(), &serde_json::to_vec(&pause_request()).unwrap()).unwrap();

        let consumer = tokio::spawn({
            let path = control.resume_file();
            async move {
                while !path.exists() {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
                std::fs::remove_file(path).unwrap();
            }
        });

        let (_, outcome) =
            resume(&control, Duration::from_secs(5), Duration::from_millis(5)).await.unwrap();
        assert_eq!(outcome, ResumeOutcome::Acknowledged);
        consumer.await.unwrap();
    }
}
