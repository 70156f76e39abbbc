//! Structured logging setup shared by the `playground_server` binary and the
//! `codezone_cli` dev binaries: an `EnvFilter` layer plus a rolling file
//! appender (`tracing-appender`) so a long-lived desktop process doesn't
//! lose its history on restart.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global tracing subscriber. The returned [`WorkerGuard`] must
/// be held for the lifetime of the process; dropping it flushes and stops
/// the background writer thread.
pub fn init(log_dir: &str, file_prefix: &str) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    guard
}
