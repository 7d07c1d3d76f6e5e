use std::path::PathBuf;

use clap::Parser;

/// Drive slide decks from the deckpilot button remote
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "deckpilot", about, version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory containing .pptx and .pdf decks
    #[arg(long, value_name = "DIR")]
    pub presentations_dir: Option<PathBuf>,

    /// Bluetooth address of the remote (AA:BB:CC:DD:EE:FF)
    #[arg(long, value_name = "ADDRESS")]
    pub device: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Start with the display in windowed mode
    #[arg(long, default_value_t = false)]
    pub windowed: bool,

    /// Do not read keyboard controls from stdin (for running as a service)
    #[arg(long, default_value_t = false)]
    pub no_keyboard: bool,
}
