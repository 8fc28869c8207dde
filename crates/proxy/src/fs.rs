//! Small file helpers shared by the artifact store, the registry and the control files.
//!
//! Files are opened per operation so the orchestrator can read or move them at any time.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use crate::error::ProxyError;

fn ensure_parent(path: &Path) -> Result<(), ProxyError> {
    if let Some(parent_dir) = path.parent() {
        fs::create_dir_all(parent_dir).map_err(|e| ProxyError::io(parent_dir, e))?;
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `data` to a sibling temporary file and renames it over `path`, so readers never observe
/// a partially written file.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), ProxyError> {
    ensure_parent(path)?;
    let tmp = tmp_path(path);

    let mut f = fs::File::create(&tmp).map_err(|e| ProxyError::io(&tmp, e))?;
    f.write_all(data).map_err(|e| ProxyError::io(&tmp, e))?;
    f.sync_all().map_err(|e| ProxyError::io(&tmp, e))?;
    drop(f);

    fs::rename(&tmp, path).map_err(|e| ProxyError::io(path, e))
}

/// Appends each line followed by a newline, creating the file and its parents when missing.
pub fn append_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<(), ProxyError> {
    ensure_parent(path)?;
    let mut f = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ProxyError::io(path, e))?;

    let mut buf = String::new();
    for line in lines {
        buf.push_str(line.as_ref());
        buf.push('\n');
    }
    f.write_all(buf.as_bytes()).map_err(|e| ProxyError::io(path, e))
}

/// Replaces the file's content.
pub fn overwrite(path: &Path, content: &str) -> Result<(), ProxyError> {
    ensure_parent(path)?;
    fs::write(path, content).map_err(|e| ProxyError::io(path, e))
}

/// Truncates the file, creating it when missing.
pub fn truncate(path: &Path) -> Result<(), ProxyError> {
    overwrite(path, "")
}

/// Reads the file, mapping "not found" to `None`.
pub fn read_optional(path: &Path) -> Result<Option<String>, ProxyError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ProxyError::io(path, e)),
    }
}

/// Removes the file; a missing file is not an error.
pub fn remove_if_exists(path: &Path) -> Result<(), ProxyError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ProxyError::io(path, e)),
    }
}
