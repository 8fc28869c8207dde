//! The JSON configuration shared with the orchestrator, which writes it before starting the proxy.

use std::{fmt, net::SocketAddr, path::PathBuf, time::Duration};

use alloy_primitives::B256;
use clap::ValueEnum;
use gasbench_execution::ExecutionConfig;
use gasbench_proxy::{ProxyOptions, producer::ProducerOptions};
use gasbench_types::constants::EMPTY_RECIPIENT;
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

pub use crate::file::{load_config, save_config};
use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "proxy_config.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// The node's plain JSON-RPC endpoint; every request is forwarded here.
    pub rpc_direct: Url,
    /// Authenticated Engine API endpoint.
    pub engine_url: Url,
    pub jwt_hex_path: PathBuf,
    /// Block hash used as safe/finalized until the first global production. Empty means unset.
    #[serde(default)]
    pub finalized_block: String,
    #[serde(default = "default_payload_dir")]
    pub payload_dir: PathBuf,
    /// The orchestrator kept `setup-global-test.txt` from an earlier run.
    #[serde(default)]
    pub reuse_globals: bool,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_engine_timeout_secs")]
    pub engine_timeout_secs: u64,
    #[serde(default = "default_recipient")]
    pub recipient: String,
    #[serde(default)]
    pub prime_overlay: bool,
    #[serde(default)]
    pub overlay_confirmation_scenarios: Vec<String>,
    #[serde(default = "default_failure_escalation_threshold")]
    pub failure_escalation_threshold: u32,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Only warnings plus production and pause events.
    #[serde(default)]
    pub log_light: bool,
    #[serde(default)]
    pub worker_threads: usize,
}

fn default_payload_dir() -> PathBuf {
    PathBuf::from("eest_stateful")
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8549))
}

fn default_quiet_period_ms() -> u64 {
    500
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_engine_timeout_secs() -> u64 {
    90
}

fn default_recipient() -> String {
    EMPTY_RECIPIENT.to_string()
}

fn default_failure_escalation_threshold() -> u32 {
    5
}

impl Config {
    /// Apply environment variable overrides.
    ///
    /// Supported variables:
    /// - GASBENCH_RPC_DIRECT
    /// - GASBENCH_ENGINE_URL
    /// - GASBENCH_JWT_PATH
    /// - GASBENCH_PAYLOAD_DIR
    /// - GASBENCH_FINALIZED_BLOCK
    /// - GASBENCH_QUIET_PERIOD_MS
    pub fn apply_env_overrides(&mut self) {
        fn get(key: &str) -> Option<String> {
            std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        }

        if let Some(v) = get("GASBENCH_RPC_DIRECT") {
            match v.parse::<Url>() {
                Ok(url) => self.rpc_direct = url,
                Err(_) => warn!(value = %v, "Invalid GASBENCH_RPC_DIRECT, ignoring"),
            }
        }
        if let Some(v) = get("GASBENCH_ENGINE_URL") {
            match v.parse::<Url>() {
                Ok(url) => self.engine_url = url,
                Err(_) => warn!(value = %v, "Invalid GASBENCH_ENGINE_URL, ignoring"),
            }
        }
        if let Some(v) = get("GASBENCH_JWT_PATH") {
            self.jwt_hex_path = PathBuf::from(v);
        }
        if let Some(v) = get("GASBENCH_PAYLOAD_DIR") {
            self.payload_dir = PathBuf::from(v);
        }
        if let Some(v) = get("GASBENCH_FINALIZED_BLOCK") {
            match v.parse::<B256>() {
                Ok(_) => self.finalized_block = v,
                Err(_) => warn!(value = %v, "Invalid GASBENCH_FINALIZED_BLOCK, ignoring"),
            }
        }
        if let Some(v) = get("GASBENCH_QUIET_PERIOD_MS") {
            match v.parse::<u64>() {
                Ok(n) => self.quiet_period_ms = n,
                Err(_) => warn!(value = %v, "Invalid GASBENCH_QUIET_PERIOD_MS, ignoring"),
            }
        }
    }

    pub fn finalized_block(&self) -> Result<Option<B256>, ConfigError> {
        let raw = self.finalized_block.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(|e| ConfigError::InvalidValue {
            field: "finalized_block",
            message: format!("{raw}: {e}"),
        })
    }

    pub fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig::new(self.engine_url.clone(), &self.jwt_hex_path)
            .with_engine_timeout(Duration::from_secs(self.engine_timeout_secs))
    }

    pub fn proxy_options(&self) -> Result<ProxyOptions, ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval_ms",
                message: "must be positive".to_string(),
            });
        }

        Ok(ProxyOptions {
            listen_addr: self.listen_addr,
            rpc_direct: self.rpc_direct.clone(),
            payload_dir: self.payload_dir.clone(),
            quiet_period: Duration::from_millis(self.quiet_period_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            prime_overlay: self.prime_overlay,
            overlay_confirmation_scenarios: self.overlay_confirmation_scenarios.clone(),
            producer: ProducerOptions {
                recipient: self.recipient.clone(),
                finalized_block: self.finalized_block()?,
                reuse_globals: self.reuse_globals,
                failure_escalation_threshold: self.failure_escalation_threshold.max(1),
            },
        })
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig { log_file: self.log_file.clone(), light: self.log_light, ..Default::default() }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoggingConfig {
    pub log_level: LogLevel,
    pub log_format: LogFormat,
    pub log_file: Option<PathBuf>,
    pub light: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plaintext,
    Json,
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const MINIMAL: &str = r#"{
        "rpc_direct": "http://127.0.0.1:8545",
        "engine_url": "http://127.0.0.1:8551",
        "jwt_hex_path": "/tmp/jwt.hex"
    }"#;

    fn clear_env() {
        for key in [
            "GASBENCH_RPC_DIRECT",
            "GASBENCH_ENGINE_URL",
            "GASBENCH_JWT_PATH",
            "GASBENCH_PAYLOAD_DIR",
            "GASBENCH_FINALIZED_BLOCK",
            "GASBENCH_QUIET_PERIOD_MS",
        ] {
            // SAFETY: env-mutating tests are serialised.
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let config: Config = serde_json::from_str(MINIMAL).unwrap();
        assert_eq!(config.payload_dir, PathBuf::from("eest_stateful"));
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:8549");
        assert_eq!(config.quiet_period_ms, 500);
        assert_eq!(config.poll_interval_ms, 200);
        assert_eq!(config.engine_timeout_secs, 90);
        assert_eq!(config.recipient, "EMPTY");
        assert_eq!(config.failure_escalation_threshold, 5);
        assert!(!config.reuse_globals && !config.prime_overlay && !config.log_light);
        assert_eq!(config.finalized_block().unwrap(), None);

        let options = config.proxy_options().unwrap();
        assert_eq!(options.quiet_period, Duration::from_millis(500));
        assert_eq!(config.execution_config().engine_timeout, Duration::from_secs(90));
    }

    #[test]
    fn missing_endpoints_are_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{"jwt_hex_path": "x"}"#).is_err());
    }

    #[test]
    fn finalized_block_is_validated() {
        let mut config: Config = serde_json::from_str(MINIMAL).unwrap();
        config.finalized_block = format!("{}", B256::repeat_byte(7));
        assert_eq!(config.finalized_block().unwrap(), Some(B256::repeat_byte(7)));

        config.finalized_block = "0x1234".into();
        assert!(config.proxy_options().is_err());
    }

    #[test]
    #[serial]
    fn env_overrides_apply_and_invalid_values_are_ignored() {
        clear_env();
        let mut config: Config = serde_json::from_str(MINIMAL).unwrap();
        // SAFETY: env-mutating tests are serialised.
        unsafe {
            std::env::set_var("GASBENCH_PAYLOAD_DIR", " /data/payloads ");
            std::env::set_var("GASBENCH_QUIET_PERIOD_MS", "not-a-number");
            std::env::set_var("GASBENCH_ENGINE_URL", "http://10.0.0.2:8551");
            std::env::set_var("GASBENCH_FINALIZED_BLOCK", "0xzz");
            std::env::set_var("GASBENCH_JWT_PATH", "");
        }
        config.apply_env_overrides();
        clear_env();

        assert_eq!(config.payload_dir, PathBuf::from("/data/payloads"));
        assert_eq!(config.quiet_period_ms, 500);
        assert_eq!(config.engine_url.as_str(), "http://10.0.0.2:8551/");
        assert_eq!(config.finalized_block, "");
        assert_eq!(config.jwt_hex_path, PathBuf::from("/tmp/jwt.hex"));
    }

    #[test]
    fn config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DEFAULT_CONFIG_FILE);
        let mut config: Config = serde_json::from_str(MINIMAL).unwrap();
        config.overlay_confirmation_scenarios = vec!["a__b".into()];

        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
        assert!(matches!(load_config(&dir.path().join("missing.json")), Err(ConfigError::OpenFile(_))));
    }
}
