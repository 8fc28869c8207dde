use std::fs::OpenOptions;

use color_eyre::eyre;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    Layer, Registry,
    filter::EnvFilter,
    fmt::{self, MakeWriter, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LogLevel, LoggingConfig};

/// Timestamp prefix of every log line.
const TIME_FORMAT: &str = "%H:%M:%S";

/// Targets still shown in light mode.
const LIGHT_TARGETS: &[&str] = &["production", "pause"];

/// Drop guards of the non-blocking writers.
#[must_use = "logs are lost when the guard is dropped"]
pub struct LogGuard {
    _guards: Vec<WorkerGuard>,
}

/// Initialize logging.
///
/// Returns a drop guard responsible for flushing any remaining logs when the program terminates.
/// The guard must be assigned to a binding that is not _, as _ will result in the guard being
/// dropped immediately.
pub fn init(config: &LoggingConfig) -> eyre::Result<LogGuard> {
    let filter = build_tracing_filter(config);
    let mut guards = Vec::new();

    let (stdout, guard) = tracing_appender::non_blocking(std::io::stdout());
    guards.push(guard);
    let mut layers = vec![fmt_layer(stdout, config.log_format, enable_ansi())];

    if let Some(path) = &config.log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let (writer, guard) = tracing_appender::non_blocking(file);
        guards.push(guard);
        layers.push(fmt_layer(writer, config.log_format, false));
    }

    tracing_subscriber::registry().with(layers).with(filter).try_init()?;

    Ok(LogGuard { _guards: guards })
}

fn fmt_layer<W>(writer: W, format: LogFormat, ansi: bool) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_thread_ids(false);

    match format {
        LogFormat::Plaintext => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Check if both stdout and stderr are proper terminal (tty),
/// so that we know whether or not to enable colored output,
/// using ANSI escape codes. If either is not, eg. because
/// stdout is redirected to a file, we don't enable colored output.
pub fn enable_ansi() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}

/// Common prefixes of the crates targeted by the default log level.
const TARGET_CRATES: &[&str] = &["gasbench", "gasbench_cli", "gasbench_execution", "gasbench_proxy"];

/// Build a tracing directive setting the log level for the
/// crates to the given `log_level`.
pub fn default_directive(log_level: LogLevel) -> String {
    use itertools::Itertools;

    TARGET_CRATES
        .iter()
        .map(|&c| format!("{c}={log_level}"))
        .chain(LIGHT_TARGETS.iter().map(|&t| format!("{t}={log_level}")))
        .join(",")
}

/// Warnings everywhere, `info` for production and pause events.
pub fn light_directive() -> String {
    use itertools::Itertools;

    std::iter::once("warn".to_string()).chain(LIGHT_TARGETS.iter().map(|t| format!("{t}=info"))).join(",")
}

/// Builds a tracing filter from `RUST_LOG` when set, otherwise from the configured level or
/// light mode.
fn build_tracing_filter(config: &LoggingConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let (default, directives) = if config.light {
        (LevelFilter::WARN, light_directive())
    } else {
        (LevelFilter::INFO, default_directive(config.log_level))
    };
    EnvFilter::builder().with_default_directive(default.into()).parse_lossy(directives)
}
