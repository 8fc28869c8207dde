use std::sync::Arc;

use color_eyre::eyre;

use crate::{
    config::ExecutionConfig,
    engine_api::{EngineApi, client::EngineApiClient, jwt::JwtSecretFile},
    transport::http::HttpTransport,
};

/// The main client for interacting with an execution layer node.
///
/// Wraps the authenticated Engine API client used for block production behind the
/// [`EngineApi`] trait so callers can swap in a mock.
#[derive(Clone)]
pub struct ExecutionClient {
    pub engine: Arc<dyn EngineApi>,
}

impl ExecutionClient {
    /// Creates a new `ExecutionClient` from the given configuration.
    pub fn new(config: ExecutionConfig) -> eyre::Result<Self> {
        let transport = HttpTransport::new(config.engine_url)?
            .with_jwt(JwtSecretFile::new(config.jwt_secret_path));
        let engine: Arc<dyn EngineApi> =
            Arc::new(EngineApiClient::new(transport).with_timeout(config.engine_timeout));

        Ok(Self { engine })
    }

    pub fn engine(&self) -> Arc<dyn EngineApi> {
        Arc::clone(&self.engine)
    }
}
