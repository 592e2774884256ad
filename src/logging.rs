//! Tracing setup: console output, plus an optional non-blocking log file.

use crate::config::Settings;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Map `-v` repetitions to a level for this crate.
pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the verbosity flag.
///
/// When `general.log_file` is non-empty, events are also appended to that
/// file under the data directory.
pub fn init(verbose: u8, settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kimi_agent={}", level_for(verbose))));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = file_appender(settings).map(|appender| {
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);

        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(writer)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}

/// Appender for the configured log file, never rotated.
fn file_appender(settings: &Settings) -> Option<RollingFileAppender> {
    let name = settings.general.log_file.as_deref()?;
    if name.is_empty() {
        return None;
    }
    let dir = settings.data_dir();
    std::fs::create_dir_all(&dir).ok()?;
    Some(tracing_appender::rolling::never(dir, name))
}
