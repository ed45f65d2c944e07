//! Logging Infrastructure
//!
//! Structured logging setup: stderr by default, daily rolling file when a
//! log directory is configured and exists.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize the logger at `info`
pub fn init_logger() {
    init_logger_with_file("info", None);
}

/// Initialize the logger with optional file output
///
/// `RUST_LOG` directives take precedence over `level`.
pub fn init_logger_with_file(level: &str, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.is_dir() {
            let file_appender = tracing_appender::rolling::daily(log_path, "kitchen-terminal");
            if let Err(e) = subscriber.with_ansi(false).with_writer(file_appender).try_init() {
                eprintln!("Logger already installed, file logging to {dir} not enabled: {e}");
            }
            return;
        }
        eprintln!("Log directory {dir} does not exist, logging to stderr");
    }

    if let Err(e) = subscriber.with_writer(std::io::stderr).try_init() {
        eprintln!("Logger already installed: {e}");
    }
}
