#![allow(missing_docs)]
//! Stateful payload proxy for Engine API gas benchmarks.

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, eyre};
use gasbench_cli::{
    args::{Args, Commands},
    cmd::{prepare::PrepareCmd, resume::ResumeCmd, start::StartCmd, suffix::SuffixCmd},
    config::{self, Config},
    logging, runtime,
};
use tracing::{info, trace};

/// Main entry point for the application
///
/// This function:
/// - Parses command-line arguments
/// - Loads configuration from file
/// - Initializes logging system
/// - Sets up error handling
/// - Runs the selected command
fn main() -> Result<()> {
    color_eyre::install()?;

    // Also forward panics to tracing so they show up alongside proxy logs.
    // This supplements color-eyre's pretty panic output on stderr.
    install_tracing_panic_hook();

    let args = Args::new();

    // Commands that only touch the payload directory run without a configuration file.
    let config = match &args.command {
        Commands::Resume(ResumeCmd { payload_dir: Some(_), .. }) |
        Commands::Suffix(SuffixCmd { payload_dir: Some(_), .. }) => None,
        _ => Some(load_config(&args.config)?),
    };

    // Override logging configuration (if exists) with optional command-line parameters.
    let mut logging = config.as_ref().map(Config::logging).unwrap_or_default();
    if let Some(log_level) = args.log_level {
        logging.log_level = log_level;
    }
    if let Some(log_format) = args.log_format {
        logging.log_format = log_format;
    }

    // This is a drop guard responsible for flushing any remaining logs when the program terminates.
    // It must be assigned to a binding that is not _, as _ will result in the guard being dropped
    // immediately.
    let _guard = logging::init(&logging)?;

    trace!("Command-line parameters: {args:?}");
    if config.is_some() {
        info!(file = %args.config.display(), "Loaded configuration");
    }

    match (&args.command, config) {
        (Commands::Start(cmd), Some(config)) => start(cmd, config),
        (Commands::Prepare(cmd), Some(config)) => prepare(&args, cmd, config),
        (Commands::Resume(cmd), config) => resume(cmd, config),
        (Commands::Suffix(cmd), config) => suffix(cmd, config),
        (_, None) => Err(eyre!("Missing configuration")),
    }
}

fn install_tracing_panic_hook() {
    use std::panic;

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let msg: &str = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "panic"
        };

        let bt = std::backtrace::Backtrace::force_capture();
        tracing::error!(target = "panic", %location, message = %msg, backtrace = %format!("{bt}"), "panic occurred");

        default_hook(info);
    }));
}

fn load_config(path: &Path) -> Result<Config> {
    let mut config = config::load_config(path)
        .map_err(|error| eyre!("Failed to load configuration file: {error}"))?;
    config.apply_env_overrides();
    Ok(config)
}

fn payload_dir(explicit: Option<&PathBuf>, config: Option<Config>) -> Result<PathBuf> {
    match (explicit, config) {
        (Some(dir), _) => Ok(dir.clone()),
        (None, Some(config)) => Ok(config.payload_dir),
        (None, None) => Err(eyre!("No payload directory given")),
    }
}

fn start(cmd: &StartCmd, mut config: Config) -> Result<()> {
    cmd.apply(&mut config);
    trace!(?config, "Configuration");

    let rt = runtime::build_runtime(config.worker_threads)?;
    rt.block_on(cmd.run(config)).map_err(|error| eyre!("Failed to run the proxy: {error:#}"))
}

fn prepare(args: &Args, cmd: &PrepareCmd, config: Config) -> Result<()> {
    let rt = runtime::build_runtime(config.worker_threads)?;
    rt.block_on(cmd.run(config, &args.config))
}

fn resume(cmd: &ResumeCmd, config: Option<Config>) -> Result<()> {
    let dir = payload_dir(cmd.payload_dir.as_ref(), config)?;
    let rt = runtime::build_runtime(1)?;
    rt.block_on(cmd.run(dir))
}

fn suffix(cmd: &SuffixCmd, config: Option<Config>) -> Result<()> {
    let dir = payload_dir(cmd.payload_dir.as_ref(), config)?;
    cmd.run(&dir)
}
