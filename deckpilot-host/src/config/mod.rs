//! Host configuration
//!
//! Settings come from an optional TOML file, then a handful of CLI flags
//! override the most common values. Everything is validated once at
//! startup; an invalid value is fatal there and nowhere else.

mod cli;
mod validation;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::link::AddressType;

pub use cli::Cli;

pub const DEFAULT_PRESENTATIONS_DIR: &str = "presentations";
pub const DEFAULT_WORK_DIR: &str = "/tmp/deckpilot";
pub const DEFAULT_MTU: u16 = deckpilot_protocol::ATT_MTU;

/// Complete host configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Directory scanned for `.pptx` and `.pdf` decks
    pub presentations_dir: PathBuf,
    /// Scratch space for converted PDFs and page rasters
    pub work_dir: PathBuf,
    pub device: DeviceConfig,
    pub link: LinkConfig,
    pub render: RenderConfig,
    pub cache: CacheConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            presentations_dir: PathBuf::from(DEFAULT_PRESENTATIONS_DIR),
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            device: DeviceConfig::default(),
            link: LinkConfig::default(),
            render: RenderConfig::default(),
            cache: CacheConfig::default(),
            display: DisplayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Remote identity
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Bluetooth address of the remote
    pub address: String,
    pub address_type: AddressType,
    pub service_uuid: String,
    pub characteristic_uuid: String,
    pub mtu: u16,
    /// BlueZ `gatttool` binary
    pub gatttool: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            address_type: AddressType::Auto,
            service_uuid: String::new(),
            characteristic_uuid: String::new(),
            mtu: DEFAULT_MTU,
            gatttool: "gatttool".to_string(),
        }
    }
}

/// Reconnect policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    pub backoff_initial_ms: u32,
    pub backoff_max_ms: u32,
    /// Consecutive failures before the device is reported unreachable
    pub unreachable_after: u32,
    /// How long one notification read blocks before checking for shutdown
    pub poll_interval_ms: u64,
    /// How long to wait for the CCCD write to be acknowledged
    pub subscribe_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            backoff_initial_ms: 1000,
            backoff_max_ms: 30_000,
            unreachable_after: 5,
            poll_interval_ms: 1000,
            subscribe_timeout_ms: 5000,
        }
    }
}

/// Page rasterisation
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Target frame width in pixels
    pub width: u32,
    /// Target frame height in pixels
    pub height: u32,
    pub libreoffice: String,
    pub pdfinfo: String,
    pub pdftoppm: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            libreoffice: "libreoffice".to_string(),
            pdfinfo: "pdfinfo".to_string(),
            pdftoppm: "pdftoppm".to_string(),
        }
    }
}

/// Slide cache ceilings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub max_bytes: usize,
    /// Convert the next slide in the background after showing one
    pub prefetch: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 48,
            // 48 full-HD RGB frames
            max_bytes: 48 * 1920 * 1080 * 3,
            prefetch: true,
        }
    }
}

/// Display surface
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// Where the surface writes the current frame and view state
    pub output_dir: PathBuf,
    pub start_fullscreen: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_WORK_DIR).join("display"),
            start_fullscreen: true,
        }
    }
}

/// Log output
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Optional log file, appended to in addition to stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl HostConfig {
    /// Read a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse TOML text; missing keys take their defaults
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Build the startup configuration from CLI flags
    ///
    /// Loads `--config` if given, applies the overrides and validates.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.presentations_dir {
            self.presentations_dir = dir.clone();
        }
        if let Some(address) = &cli.device {
            self.device.address = address.clone();
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
        if cli.windowed {
            self.display.start_fullscreen = false;
        }
    }
}
