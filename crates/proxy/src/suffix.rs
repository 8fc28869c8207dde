//! Appends the benchmark gas value to every scenario artifact name.

use std::{
    fs::{read_dir, rename},
    path::{Path, PathBuf},
};

use gasbench_types::Phase;
use itertools::Itertools;
use tracing::{debug, warn};

use crate::error::ProxyError;

/// Keeps alphanumerics, `-` and `_`; bare numbers get `M`, a trailing `m` is upper-cased.
pub fn normalize_suffix(value: &str) -> Option<String> {
    let cleaned: String = value.chars().filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_')).collect();
    let cleaned = if cleaned.is_empty() { value.trim().to_string() } else { cleaned };
    if cleaned.is_empty() {
        return None;
    }

    if cleaned.to_uppercase().ends_with('M') {
        Some(cleaned.to_uppercase())
    } else if cleaned.chars().all(|c| c.is_ascii_digit()) {
        Some(format!("{cleaned}M"))
    } else {
        Some(cleaned)
    }
}

/// Renames `setup|testing|cleanup/<index>/<stem>.txt` to `<stem>_<suffix>.txt`. Files already
/// carrying the suffix or a `gas-value` marker are left alone; a taken target name gets `_1`,
/// `_2`, ... appended. Returns the renames performed.
pub fn append_suffix(payload_dir: &Path, value: &str) -> Result<Vec<(PathBuf, PathBuf)>, ProxyError> {
    let Some(suffix) = normalize_suffix(value) else { return Ok(Vec::new()) };
    let mut renamed = Vec::new();

    for phase in Phase::PHASED {
        let phase_dir = payload_dir.join(phase.as_str());
        if !phase_dir.is_dir() {
            continue;
        }
        for index_dir in sorted_entries(&phase_dir)?.into_iter().filter(|p| p.is_dir()) {
            for path in sorted_entries(&index_dir)? {
                if path.extension().is_none_or(|ext| ext != "txt") {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
                if stem.ends_with(&format!("_{suffix}")) || stem.contains("gas-value") {
                    continue;
                }

                let mut target = path.with_file_name(format!("{stem}_{suffix}.txt"));
                let mut counter = 1;
                while target.exists() {
                    target = path.with_file_name(format!("{stem}_{suffix}_{counter}.txt"));
                    counter += 1;
                }

                match rename(&path, &target) {
                    Ok(()) => {
                        debug!(from = %path.display(), to = %target.display(), "Renamed payload file");
                        renamed.push((path, target));
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to rename payload file"),
                }
            }
        }
    }
    Ok(renamed)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, ProxyError> {
    let entries = read_dir(dir).map_err(|e| ProxyError::io(dir, e))?;
    Ok(entries.filter_map(|e| e.ok().map(|e| e.path())).sorted().collect())
}

#[cfg(test)]
mod tests {
    use std::fs::{create_dir_all, write};

    use super::*;

    #[test]
    fn suffix_normalisation() {
        assert_eq!(normalize_suffix("100").as_deref(), Some("100M"));
        assert_eq!(normalize_suffix("60m").as_deref(), Some("60M"));
        assert_eq!(normalize_suffix(" 45M ").as_deref(), Some("45M"));
        assert_eq!(normalize_suffix("fast-run").as_deref(), Some("fast-run"));
        assert_eq!(normalize_suffix("1/0").as_deref(), Some("10M"));
        assert_eq!(normalize_suffix("   "), None);
    }

    #[test]
    fn renames_indexed_payload_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let testing = root.join("testing/000001");
        let setup = root.join("setup/000001");
        create_dir_all(&testing).unwrap();
        create_dir_all(&setup).unwrap();

        write(testing.join("a__t.txt"), "x").unwrap();
        write(testing.join("a__t_100M.txt"), "taken").unwrap();
        write(testing.join("b__t-gas-value_5M.txt"), "x").unwrap();
        write(setup.join("a__t.txt"), "x").unwrap();
        write(setup.join("notes.md"), "x").unwrap();

        let renamed = append_suffix(root, "100").unwrap();
        assert_eq!(renamed.len(), 2);

        assert!(setup.join("a__t_100M.txt").exists());
        assert!(setup.join("notes.md").exists());
        // The pre-existing `_100M` file is already suffixed and the new one collides with it.
        assert!(testing.join("a__t_100M.txt").exists());
        assert!(testing.join("a__t_100M_1.txt").exists());
        assert!(testing.join("b__t-gas-value_5M.txt").exists());
        assert!(!testing.join("a__t.txt").exists());
    }
}
