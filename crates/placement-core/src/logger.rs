//! Minimal stderr logger for the `log` facade.
//!
//! Lines look like `[  0.412s  WARN placement_session::session] message`.
//! Install once at startup with [`init_with_level`]. With the `tracing`
//! feature, [`init_tracing`] installs a `tracing-subscriber` instead and
//! bridges `log` records into it.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:7.3}s {:>5} {}] {}",
            elapsed,
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger with the provided level filter.
///
/// Only the first call installs anything; later calls keep the original
/// level and return `Ok(())`. Fails if another `log` backend is already set.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StderrLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install a global `tracing` subscriber filtered by `RUST_LOG` (default
/// `info`) and route `log` records through it.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = if json {
        tracing::subscriber::set_global_default(
            fmt()
                .with_env_filter(filter)
                .with_span_events(FmtSpan::CLOSE)
                .json()
                .flatten_event(true)
                .finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            fmt()
                .with_env_filter(filter)
                .with_span_events(FmtSpan::CLOSE)
                .with_timer(fmt::time::Uptime::default())
                .finish(),
        )
    };
    if installed.is_ok() {
        let _ = tracing_log::LogTracer::init();
    }
}
