//! Tracing subscriber setup for broker processes.

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

// The non-blocking writer stops flushing once its guard drops, so the guard
// lives for the whole process.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("SVCLITE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging.
///
/// With a log directory, output goes to a daily-rolled `svclite.log`
/// through a non-blocking writer; otherwise to stderr. Filtering honors
/// `SVCLITE_LOG`, then `RUST_LOG`, defaulting to `info`. Safe to call more
/// than once; later calls are no-ops.
pub fn init_logging(log_dir: Option<&Path>) {
    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "svclite.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_target(true)
                        .with_ansi(false),
                )
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .try_init();
        }
    }
}
