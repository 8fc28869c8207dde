use std::path::PathBuf;

use thiserror::Error;

/// Error messages for commands
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error creating parent directory
    #[error("Error creating parent directory: {}", .0.display())]
    ParentDir(PathBuf),

    /// Error opening file
    #[error("Error opening file: {}", .0.display())]
    OpenFile(PathBuf),

    /// Error writing file
    #[error("Error writing file: {}", .0.display())]
    WriteFile(PathBuf),

    /// Error parsing the configuration file
    #[error("Error parsing {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Error serializing the configuration
    #[error("Error converting to JSON: {0}")]
    ToJSON(String),

    /// Invalid value in an otherwise well-formed configuration
    #[error("Invalid {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}
