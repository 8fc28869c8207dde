// crates/execution/src/lib.rs

pub mod client;
pub mod config;
pub mod engine_api;
pub mod error;
pub mod transport;

pub use client::ExecutionClient;
pub use config::ExecutionConfig;
pub use engine_api::{BuiltPayload, EngineApi, NewPayloadCall};
pub use error::ExecutionError;
