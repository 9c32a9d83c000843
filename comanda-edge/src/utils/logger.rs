//! Logging Infrastructure
//!
//! Logs go to stderr (stdout carries rendered ticket bytes for the CLI) or to
//! a daily rolling file when a log directory exists.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, None, None);
}

/// Initialize the logger with optional file output
///
/// `RUST_LOG` wins over `log_level` when set.
pub fn init_logger_with_file(log_level: Option<&str>, json: Option<bool>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    let file_dir = log_dir
        .map(Path::new)
        .filter(|p| p.exists())
        .and_then(Path::to_str);

    // try_init: a second call (tests, embedding) keeps the first subscriber
    match (file_dir, json.unwrap_or(false)) {
        (Some(dir), true) => {
            let appender = tracing_appender::rolling::daily(dir, "comanda-edge");
            let _ = subscriber.json().with_writer(appender).try_init();
        }
        (Some(dir), false) => {
            let appender = tracing_appender::rolling::daily(dir, "comanda-edge");
            let _ = subscriber.with_ansi(false).with_writer(appender).try_init();
        }
        (None, true) => {
            let _ = subscriber.json().with_writer(std::io::stderr).try_init();
        }
        (None, false) => {
            let _ = subscriber.with_writer(std::io::stderr).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        init_logger_with_file(Some("debug"), Some(false), Some("/nonexistent/comanda-logs"));
        init_logger();
    }
}
