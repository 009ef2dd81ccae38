//! Structured logging setup: one layer to stderr, one to a file rolled
//! fresh per process start (not on a fixed daily/hourly cadence — the file
//! name itself is timestamped at startup).

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Must be kept alive for the lifetime of the process; dropping it stops
/// the non-blocking file writer from flushing.
pub struct LogGuard(#[allow(dead_code)] WorkerGuard);

pub fn init(log_dir: &str) -> LogGuard {
    let filename = format!("osu-room-host-{}.log", chrono::Utc::now().format("%Y%m%dT%H%M%SZ"));
    let file_appender = tracing_appender::rolling::never(log_dir, filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_target(false).with_writer(non_blocking))
        .init();

    LogGuard(guard)
}

/// Log a fatal startup condition. Modeled as an `error`-level event carrying
/// `critical = true`, since `tracing`'s level enum has no dedicated tier for
/// it.
#[macro_export]
macro_rules! critical {
    ($($arg:tt)*) => {
        tracing::error!(critical = true, $($arg)*)
    };
}
