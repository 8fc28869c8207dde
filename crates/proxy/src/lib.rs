//! Intercepting JSON-RPC proxy that turns benchmark test traffic into replayable Engine API
//! payloads.
#![allow(missing_docs)]

pub mod artifacts;
pub mod batcher;
pub mod control;
pub mod error;
pub mod fs;
pub mod hooks;
pub mod pause;
pub mod prepare;
pub mod producer;
pub mod registry;
pub mod server;
pub mod suffix;

mod proxy;

pub use error::ProxyError;
pub use proxy::{ProxyOptions, StatefulProxy};
