//! Structured Logger
//!
//! Wraps `tracing` with a console layer (plain or JSON), an optional daily
//! rolling NDJSON file, and `RUST_LOG`-driven level control.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
pub struct LoggerOptions {
    /// Fallback filter when `RUST_LOG` is unset, e.g. `info` or `perceptor=debug`.
    pub level: String,
    /// Directory for `perceptor.log.YYYY-MM-DD`; console only when `None`.
    pub dir: Option<PathBuf>,
    /// Emit JSON on the console instead of human-readable lines.
    pub json: bool,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            json: false,
        }
    }
}

/// Initialize the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process. Calling this twice is harmless; the second
/// call leaves the first subscriber in place.
pub fn init_logger(options: &LoggerOptions) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&options.level));

    let (file_layer, guard) = match &options.dir {
        Some(dir) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "perceptor.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_json = options
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stdout));
    let console_plain = (!options.json).then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_json)
        .with(console_plain)
        .with(file_layer)
        .try_init();

    guard
}
