#![allow(missing_docs)]

use std::{fs, path::Path};

use crate::{config::Config, error::ConfigError};

/// Load configuration from file
pub fn load_config(config_file: &Path) -> Result<Config, ConfigError> {
    let content =
        fs::read_to_string(config_file).map_err(|_| ConfigError::OpenFile(config_file.to_path_buf()))?;
    serde_json::from_str(&content)
        .map_err(|e| ConfigError::Parse { path: config_file.to_path_buf(), message: e.to_string() })
}

/// Save configuration to file
pub fn save_config(config_file: &Path, config: &Config) -> Result<(), ConfigError> {
    save(config_file, &serde_json::to_string_pretty(config).map_err(|e| ConfigError::ToJSON(e.to_string()))?)
}

fn save(path: &Path, data: &str) -> Result<(), ConfigError> {
    use std::io::Write;

    if let Some(parent_dir) = path.parent() {
        fs::create_dir_all(parent_dir).map_err(|_| ConfigError::ParentDir(parent_dir.to_path_buf()))?;
    }

    let mut f = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|_| ConfigError::OpenFile(path.to_path_buf()))?;

    f.write_all(data.as_bytes()).map_err(|_| ConfigError::WriteFile(path.to_path_buf()))?;

    Ok(())
}
