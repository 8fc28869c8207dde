#![allow(missing_docs)]

use std::time::Duration;

use thiserror::Error;

/// Defines the specific error types for the execution client.
///
/// Functions throughout the crate return `eyre::Result`; these variants classify the failure so
/// callers can still match on specific kinds with `downcast_ref`.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request to {method} timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    #[error("JSON-RPC error (code {code}): {message}")]
    JsonRpc { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JWT error: {0}")]
    Jwt(String),
}
