//! Tracing configuration for Postit
//!
//! - Human-facing command output goes to stdout, so log lines go to stderr.
//! - A plain-text copy of every log line lands in `logs/postit.log` under the
//!   application data directory.
//! - `log` records emitted by dependencies (and by the store layer, which still
//!   uses `log`) are bridged into tracing.

use std::{fs, io, path::Path, sync::OnceLock};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, prelude::*, registry};

const LOG_FILE_NAME: &str = "postit.log";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Check if running in development environment
fn is_development() -> bool {
    cfg!(debug_assertions)
}

/// Build the default filter directives for tracing
///
/// - **Development**: debug for our crates
/// - **Production**: info for our crates
/// - HTTP and connection pool internals are kept at warn either way
fn build_filter_directives(is_dev: bool) -> Vec<String> {
    let app_level = if is_dev { "debug" } else { "info" };
    let mut directives = vec![app_level.to_string()];
    for target in ["postit", "pt_app", "pt_infra", "pt_platform"] {
        directives.push(format!("{target}={app_level}"));
    }
    directives.extend(
        ["hyper=warn", "hyper_util=warn", "reqwest=warn", "rustls=warn", "r2d2=warn"]
            .into_iter()
            .map(String::from),
    );
    directives
}

/// Initialize the tracing subscriber
///
/// Respects `RUST_LOG`; falls back to [`build_filter_directives`]. When `quiet` is
/// set only warnings reach stderr, the log file still gets everything the filter
/// lets through.
///
/// ## Errors
///
/// Returns `Err` if a subscriber or a `log` logger is already registered.
pub fn init_tracing_subscriber(logs_dir: &Path, quiet: bool) -> anyhow::Result<()> {
    let is_dev = is_development();

    let filter_directives = build_filter_directives(is_dev);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter_directives.join(",")));

    let stderr_writer: BoxMakeWriter = BoxMakeWriter::new(io::stderr);
    let file_writer = match build_file_writer(logs_dir) {
        Ok(writer) => Some(writer),
        Err(err) => {
            eprintln!("Failed to initialize file logging, logging to stderr only: {err}");
            None
        }
    };

    let stderr_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
        .with_level(true)
        .with_target(true)
        .with_ansi(cfg!(not(test)))
        .with_writer(stderr_writer)
        .with_filter(if quiet {
            tracing_subscriber::filter::LevelFilter::WARN
        } else {
            tracing_subscriber::filter::LevelFilter::TRACE
        });

    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_timer(fmt::time::ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer)
    });

    let subscriber = registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;

    Ok(())
}

fn build_file_writer(logs_dir: &Path) -> anyhow::Result<NonBlocking> {
    fs::create_dir_all(logs_dir)?;

    let file_appender = tracing_appender::rolling::never(logs_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    LOG_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Tracing log guard already initialized"))?;

    Ok(non_blocking)
}
