//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{
    cmd::{prepare::PrepareCmd, resume::ResumeCmd, start::StartCmd, suffix::SuffixCmd},
    config::{DEFAULT_CONFIG_FILE, LogFormat, LogLevel},
};

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(version, about = "Stateful Engine API payload proxy for gas benchmarks")]
pub struct Args {
    /// Proxy configuration file (JSON)
    #[arg(long, global = true, env = "GASBENCH_PROXY_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log level (default: `info`)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log format (default: `plaintext`)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Run the intercepting proxy
    #[command(alias = "proxy")]
    Start(StartCmd),

    /// Generate the gas bump and funding payloads
    Prepare(PrepareCmd),

    /// Answer the outstanding pause request (orchestrator side)
    Resume(ResumeCmd),

    /// Append the gas value to every scenario payload file name
    Suffix(SuffixCmd),
}

impl Args {
    pub fn new() -> Self {
        Args::parse()
    }
}

impl Default for Args {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands_and_global_flags() {
        let args =
            Args::try_parse_from(["gasbench", "proxy", "--config", "c.json", "--log-level", "debug"])
                .unwrap();
        assert_eq!(args.config, PathBuf::from("c.json"));
        assert_eq!(args.log_level, Some(LogLevel::Debug));
        assert!(matches!(args.command, Commands::Start(_)));

        let args = Args::try_parse_from(["gasbench", "suffix", "100"]).unwrap();
        assert!(matches!(args.command, Commands::Suffix(SuffixCmd { ref value, .. }) if value == "100"));

        let args = Args::try_parse_from([
            "gasbench",
            "prepare",
            "--funding-recipient",
            "0x00000000000000000000000000000000000000f0",
        ])
        .unwrap();
        match args.command {
            Commands::Prepare(cmd) => assert_eq!(cmd.runs, 301),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
