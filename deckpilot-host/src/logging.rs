//! Log output setup

use std::fs::OpenOptions;
use std::io;
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing::Level;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use crate::config::LoggingConfig;

/// Parse a configured level name
pub fn parse_level(name: &str) -> Option<Level> {
    Level::from_str(name.trim()).ok()
}

/// Install the global subscriber: stderr, plus the log file if configured
pub fn init(config: &LoggingConfig) -> Result<()> {
    let level = parse_level(&config.level)
        .ok_or_else(|| anyhow!("invalid log level {:?}", config.level))?;

    let writer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(io::stderr.and(Mutex::new(file)))
        }
        None => BoxMakeWriter::new(io::stderr),
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(config.file.is_none())
        .with_writer(writer)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}
