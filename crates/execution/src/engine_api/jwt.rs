// Engine API authentication.
//
// Tokens carry only an `iat` claim, as the Engine API specification requires, and are signed
// with HS256 using the shared secret. The secret file is read again for every token because the
// orchestrator may regenerate it between node restarts; nothing is cached.

use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use color_eyre::eyre;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use crate::ExecutionError;

#[derive(Debug, Serialize, Deserialize)]
/// Claims for the JWT token, as required by the Engine API specification.
struct Claims {
    iat: u64,
}

/// Signs Engine API bearer tokens with a hex secret stored on disk.
#[derive(Debug, Clone)]
pub struct JwtSecretFile {
    path: PathBuf,
}

impl JwtSecretFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and decodes the secret. Surrounding whitespace and a `0x` prefix are ignored.
    pub fn read_secret(&self) -> eyre::Result<Vec<u8>> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            ExecutionError::Jwt(format!("failed to read {}: {e}", self.path.display()))
        })?;
        let trimmed = raw.trim();
        let hex_str = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let secret = hex::decode(hex_str).map_err(|e| {
            ExecutionError::Jwt(format!("invalid hex secret in {}: {e}", self.path.display()))
        })?;
        if secret.is_empty() {
            return Err(ExecutionError::Jwt(format!("empty secret in {}", self.path.display())).into());
        }
        Ok(secret)
    }

    /// Returns a freshly issued token.
    pub fn token(&self) -> eyre::Result<String> {
        let secret = self.read_secret()?;
        let iat = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let token = encode(&Header::default(), &Claims { iat }, &EncodingKey::from_secret(&secret))
            .map_err(|e| ExecutionError::Jwt(e.to_string()))?;
        Ok(token)
    }
}
