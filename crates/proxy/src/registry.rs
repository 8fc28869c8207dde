//! First-seen ordering of scenarios, mirrored to `scenario_order.json` for the replay tooling.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use gasbench_types::{constants::SCENARIO_ORDER_FILE, control::ScenarioOrderEntry};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{error::ProxyError, fs};

#[derive(Default)]
struct RegistryInner {
    by_name: HashMap<String, u32>,
    entries: Vec<ScenarioOrderEntry>,
}

/// Assigns every scenario name a stable 1-based index.
pub struct ScenarioRegistry {
    order_file: PathBuf,
    inner: Mutex<RegistryInner>,
}

impl ScenarioRegistry {
    pub fn new(payload_dir: &Path) -> Self {
        Self { order_file: payload_dir.join(SCENARIO_ORDER_FILE), inner: Mutex::default() }
    }

    /// Returns the index of `name`, assigning the next one on first sight.
    ///
    /// A failed order-file write is logged; the in-memory assignment stands either way.
    pub fn register(&self, name: &str) -> u32 {
        let mut inner = self.inner.lock();
        if let Some(index) = inner.by_name.get(name) {
            return *index;
        }

        let index = inner.entries.len() as u32 + 1;
        inner.by_name.insert(name.to_string(), index);
        inner.entries.push(ScenarioOrderEntry { index, name: name.to_string() });
        debug!(index, name, "Registered scenario");

        if let Err(e) = self.persist(&inner.entries) {
            warn!(error = %e, "Failed to write scenario order");
        }
        index
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.inner.lock().by_name.get(name).copied()
    }

    pub fn entries(&self) -> Vec<ScenarioOrderEntry> {
        self.inner.lock().entries.clone()
    }

    pub fn order_file(&self) -> &Path {
        &self.order_file
    }

    fn persist(&self, entries: &[ScenarioOrderEntry]) -> Result<(), ProxyError> {
        let data = serde_json::to_vec_pretty(entries)
            .map_err(|e| ProxyError::json(&self.order_file, e))?;
        fs::write_atomic(&self.order_file, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_assigned_in_first_seen_order() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ScenarioRegistry::new(dir.path());

        assert_eq!(registry.register("a__x"), 1);
        assert_eq!(registry.register("b__y"), 2);
        assert_eq!(registry.register("a__x"), 1);
        assert_eq!(registry.register("c__z"), 3);
        assert_eq!(registry.get("b__y"), Some(2));
        assert_eq!(registry.get("missing"), None);

        let on_disk: Vec<ScenarioOrderEntry> =
            serde_json::from_slice(&std::fs::read(registry.order_file()).unwrap()).unwrap();
        assert_eq!(on_disk, registry.entries());
        assert_eq!(
            on_disk.iter().map(|e| (e.index, e.name.as_str())).collect::<Vec<_>>(),
            [(1, "a__x"), (2, "b__y"), (3, "c__z")]
        );
    }

    #[test]
    fn unwritable_order_file_keeps_assignments() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the payload directory should be makes every write fail.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let registry = ScenarioRegistry::new(&blocker);

        assert_eq!(registry.register("a"), 1);
        assert_eq!(registry.register("b"), 2);
        assert_eq!(registry.entries().len(), 2);
    }
}
