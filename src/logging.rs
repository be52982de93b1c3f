//! Structured logging setup.
//!
//! Logs go to stderr, except while the terminal view owns the screen. Then
//! they are appended to a file so no log line draws over the frame.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

/// Writer for log output: the file at `log_file` in append mode, or stderr.
pub fn log_writer(log_file: Option<&Path>) -> Result<BoxMakeWriter> {
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Ok(BoxMakeWriter::new(Mutex::new(file)))
        }
        None => Ok(BoxMakeWriter::new(std::io::stderr)),
    }
}

/// Initialise the global `tracing` subscriber. `RUST_LOG` filters (default
/// `kenobot=info`); `KENOBOT_LOG_JSON` switches to JSON lines.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kenobot=info"));
    let writer = log_writer(log_file)?;

    if std::env::var("KENOBOT_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(writer)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_ansi(log_file.is_none())
            .with_writer(writer)
            .init();
    }
    Ok(())
}
