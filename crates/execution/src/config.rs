#![allow(missing_docs)]
use std::{path::PathBuf, time::Duration};

use url::Url;

use crate::engine_api::methods::DEFAULT_ENGINE_TIMEOUT;

/// Holds all necessary parameters to talk to the execution node's Engine API.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Authenticated Engine API endpoint, e.g. `http://127.0.0.1:8551`.
    pub engine_url: Url,
    /// Hex-encoded JWT secret. Read again for every Engine API call.
    pub jwt_secret_path: PathBuf,
    /// Upper bound for a single Engine API call.
    pub engine_timeout: Duration,
}

impl ExecutionConfig {
    pub fn new(engine_url: Url, jwt_secret_path: impl Into<PathBuf>) -> Self {
        Self {
            engine_url,
            jwt_secret_path: jwt_secret_path.into(),
            engine_timeout: DEFAULT_ENGINE_TIMEOUT,
        }
    }

    pub fn with_engine_timeout(mut self, timeout: Duration) -> Self {
        self.engine_timeout = timeout;
        self
    }
}
