/// Console + file logging via `tracing-subscriber`.
///
/// The filter comes from `$LIVEWATCH_LOG`, then `$RUST_LOG`, then the config
/// `log_level`. Log lines go to stderr and, when the log file can be opened,
/// are mirrored (without ANSI colours) to `logs/livewatch.log`.
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "LIVEWATCH_LOG";

/// Resolves the filter directive, preferring environment overrides.
fn filter_directive(config_level: &str) -> String {
    std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| config_level.to_string())
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Installs the global subscriber. Falls back to console-only logging when
/// the log file cannot be opened.
pub fn init(config_level: &str, log_file: &Path) {
    let filter = EnvFilter::try_new(filter_directive(config_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file, file_error) = match open_log_file(log_file) {
        Ok(f) => (Some(f), None),
        Err(e) => (None, Some(e)),
    };
    let file_layer = file.map(|f| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(f))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        tracing::warn!("cannot open log file {}: {e}; logging to console only", log_file.display());
    }
}
