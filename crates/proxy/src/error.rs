#![allow(missing_docs)]

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the proxy's own bookkeeping: artifact files, the scenario order and control files.
///
/// Engine API failures stay `ExecutionError`s and reach the producer through `eyre::Report`.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No pause request at {0}")]
    NoPauseRequest(PathBuf),

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Proxy is shutting down")]
    ShuttingDown,
}

impl ProxyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json { path: path.into(), source }
    }
}
