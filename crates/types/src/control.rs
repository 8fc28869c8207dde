//! Messages exchanged with the orchestrator through the control directory.
//!
//! The proxy writes a [`PauseRequest`] when it reaches a point where the node's filesystem can be
//! swapped. The orchestrator answers with a [`ResumeSignal`] echoing the token and scenario, and
//! the proxy deletes the resume file once it has accepted it.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{aliases::BlockHash, phase::Phase};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseRequest {
    pub token: Uuid,
    pub scenario: String,
    pub phase: Phase,
    pub stage: u64,
    pub block_hash: Option<BlockHash>,
    pub timestamp: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResumeSignal {
    pub token: Uuid,
    pub scenario: String,
    #[serde(default)]
    pub timestamp: f64,
}

impl ResumeSignal {
    pub fn answering(pause: &PauseRequest) -> Self {
        Self { token: pause.token, scenario: pause.scenario.clone(), timestamp: unix_timestamp() }
    }

    pub fn matches(&self, token: &Uuid, scenario: &str) -> bool {
        &self.token == token && self.scenario == scenario
    }
}

/// One line of the scenario order file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOrderEntry {
    pub index: u32,
    pub name: String,
}

/// Seconds since the epoch with sub-second precision, as the orchestrator expects.
pub fn unix_timestamp() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or_default()
}
