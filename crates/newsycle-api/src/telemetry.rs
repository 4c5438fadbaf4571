//! Tracing subscriber setup shared by the server and the CLI
//!
//! Logs go to stderr so command output on stdout stays clean.
//!
//! Author: hephaex@gmail.com

use newsycle_core::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset: the configured level, then any
/// per-target directives
pub fn default_directives(logging: &LoggingConfig, extra: &str) -> String {
    match extra.trim() {
        "" => logging.level.clone(),
        extra => format!("{},{}", logging.level, extra),
    }
}

/// Install the global subscriber from logging configuration
///
/// `RUST_LOG` still takes precedence over the configured level.
pub fn init_tracing(logging: &LoggingConfig, extra: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(logging, extra).into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}
