//! Log output for the `emulog` binary.
//!
//! By default every subcommand logs to stderr ([`init_cli`]). With
//! `--log-to-file`, a batch `analyze` run also keeps a JSON record of each
//! attachment's trip through the pipeline ([`init_production`]): the
//! detected container format, rate-limit rejections, extraction failures and
//! per-attachment parse timing, so a moderator can reconstruct why a report
//! came out the way it did.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// File name prefix of the JSON pipeline log; rotation appends the date.
pub const LOG_FILE_PREFIX: &str = "emulog.log";

/// Pipeline events always kept in the file, regardless of `RUST_LOG`.
const FILE_DIRECTIVES: &str = "info,emulog=debug";

/// Keeps the JSON file writer alive.
///
/// Dropping it flushes pending pipeline events to disk.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Log to stderr and to `{logs_dir}/emulog.log.YYYY-MM-DD`.
///
/// The file receives the per-attachment `debug` events of the intake
/// pipeline (`>>> parsing log`, `<<< finished parsing`, decompression
/// results) as JSON, one object per line. Stderr follows `RUST_LOG`
/// (default: `info`).
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created or a global
/// subscriber is already installed.
pub fn init_production(logs_dir: &Path) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir).map_err(|e| {
        anyhow::anyhow!(
            "failed to create logs directory {}: {e}",
            logs_dir.display()
        )
    })?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let pipeline_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new(FILE_DIRECTIVES));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter());

    tracing_subscriber::registry()
        .with(pipeline_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(LoggingGuard { _guard: guard })
}

/// Log to stderr only. A second call is a no-op.
pub fn init_cli() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
