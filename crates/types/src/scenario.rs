//! Scenario identity derived from test metadata attached to intercepted JSON-RPC calls.
//!
//! The test harness tags every call either through a structured JSON-RPC `id` or through the
//! `X-EEST-ID` header. Both carry `{testId, phase, txIndex}` where `testId` is a pytest node id
//! such as `tests/benchmark/test_worst_compute.py::test_worst_add[fork_Prague-gas-value_30M]`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{constants::GLOBAL_NOPHASE, phase::Phase};

const GAS_VALUE_MARKER: &str = "-gas-value_";
const UNSAFE_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Test metadata as sent by the harness.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMetadata {
    #[serde(default)]
    pub test_id: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub tx_index: Option<Value>,
}

impl TestMetadata {
    /// Reads metadata embedded in a JSON-RPC `id`, which is either an object or a string holding
    /// one. Ids without a `testId` carry no metadata.
    pub fn from_id(id: &Value) -> Option<Self> {
        match id {
            Value::Object(_) => Self::from_value(id.clone()),
            Value::String(s) => Self::from_json(s),
            _ => None,
        }
    }

    /// Reads metadata from the raw `X-EEST-ID` header value.
    pub fn from_header(raw: &str) -> Option<Self> {
        Self::from_json(raw)
    }

    fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str::<Value>(raw.trim()).ok().and_then(Self::from_value)
    }

    fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let meta: Self = serde_json::from_value(value).ok()?;
        meta.test_id.as_deref().is_some_and(|id| !id.trim().is_empty()).then_some(meta)
    }
}

/// Identifies the logical test scenario and lifecycle phase a transaction belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioKey {
    pub file_base: String,
    pub test_name: String,
    pub phase: Phase,
}

impl ScenarioKey {
    /// The reserved bucket for traffic without test metadata.
    pub fn global() -> Self {
        Self {
            file_base: GLOBAL_NOPHASE.to_string(),
            test_name: GLOBAL_NOPHASE.to_string(),
            phase: Phase::GlobalNoPhase,
        }
    }

    pub fn new(file_base: impl Into<String>, test_name: impl Into<String>, phase: Phase) -> Self {
        Self { file_base: file_base.into(), test_name: test_name.into(), phase }
    }

    /// Derives the key for a call, falling back to the global bucket without metadata.
    pub fn from_metadata(meta: Option<&TestMetadata>) -> Self {
        let Some(meta) = meta else { return Self::global() };
        let test_id = meta.test_id.as_deref().unwrap_or("unknown");
        let (file_path, test_name) = test_id.split_once("::").unwrap_or((test_id, "unknown_test"));

        let file_name = file_path.rsplit('/').next().unwrap_or(file_path);
        let file_base = file_name.strip_suffix(".py").unwrap_or(file_name);

        Self {
            file_base: sanitize_component(file_base),
            test_name: sanitize_component(test_name),
            phase: Phase::from_metadata(meta.phase.as_deref()),
        }
    }

    pub fn is_global(&self) -> bool {
        !self.phase.is_phased()
    }

    /// Whether both keys belong to the same test, regardless of phase.
    pub fn same_scenario(&self, other: &Self) -> bool {
        self.file_base == other.file_base && self.test_name == other.test_name
    }

    /// Filename stem of the scenario's artifacts.
    pub fn scenario_name(&self) -> String {
        scenario_name(&self.file_base, &self.test_name)
    }
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}[{}]", self.file_base, self.test_name, self.phase)
    }
}

/// Strips path separators and parent references from one metadata component.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned = raw
        .trim()
        .trim_matches(|c: char| c == '/' || c == '\\')
        .replace(['/', '\\'], "_")
        .replace("..", ".");
    if cleaned.is_empty() { "unknown".to_string() } else { cleaned }
}

/// Builds the artifact stem for a `(file_base, test_name)` pair.
///
/// A `-gas-value_<v>` parameter is moved to the end of the name so that the same test at
/// different gas values sorts together, then characters unsafe in filenames become `_`.
pub fn scenario_name(file_base: &str, test_name: &str) -> String {
    let raw = format!("{file_base}__{test_name}");
    let normalized = match split_gas_value(&raw) {
        Some((base, token)) => format!("{base}{token}"),
        None => raw,
    };
    normalized.replace(UNSAFE_FILENAME_CHARS, "_")
}

/// Splits `raw` into the name without its gas-value token and the token itself.
fn split_gas_value(raw: &str) -> Option<(String, &str)> {
    let start = raw.find(GAS_VALUE_MARKER)?;
    let value_start = start + GAS_VALUE_MARKER.len();
    let value_len = raw[value_start..].find([']', '-']).unwrap_or(raw.len() - value_start);
    if value_len == 0 {
        return None;
    }
    let end = value_start + value_len;
    let token = &raw[start..end];
    Some((format!("{}{}", &raw[..start], &raw[end..]), token))
}
