//! Error types for the host service
//!
//! One enum per layer. Only [`ConfigError`] is ever fatal, and only at
//! startup; everything else is logged and handled by the layer above.

use std::io;
use std::path::PathBuf;

use deckpilot_protocol::TokenError;

/// Startup configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("device.address {value:?} is not a Bluetooth address (AA:BB:CC:DD:EE:FF)")]
    InvalidAddress { value: String },

    #[error("device.{field} {value:?} is not a UUID")]
    InvalidUuid { field: &'static str, value: String },

    #[error("logging.level {value:?} is not one of trace, debug, info, warn, error")]
    InvalidLogLevel { value: String },

    #[error("{0}")]
    Invalid(String),
}

/// Wireless link errors
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// An established link went away
    #[error("link lost: {0}")]
    LinkLost(String),

    /// The device could not be reached with any address type
    #[error("device {address} unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    /// The service, characteristic or CCCD could not be resolved
    #[error("GATT discovery failed: {0}")]
    Discovery(String),

    /// Notifications could not be enabled
    #[error("failed to enable notifications after {attempts} attempts")]
    Subscribe { attempts: u32 },

    /// The BLE tool could not be started
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },
}

/// A notification payload that is not a command token
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("malformed command payload {payload:?} ({reason:?})")]
    Malformed { payload: Vec<u8>, reason: TokenError },
}

/// Page counting or rasterisation failed
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("expected output {0} was not produced")]
    MissingOutput(PathBuf),

    #[error("unexpected output from {tool}: {detail}")]
    Malformed { tool: String, detail: String },

    #[error("invalid raster: {0}")]
    Raster(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Slide cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Source file missing or unreadable and the slide is not cached
    #[error("presentation {path} unavailable: {source}")]
    PresentationUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Page count could not be determined, so the deck cannot be opened
    #[error("presentation {path} could not be opened: {source}")]
    OpenFailure {
        path: PathBuf,
        #[source]
        source: ConvertError,
    },

    /// The page could not be converted; other pages may still work
    #[error("slide {index} could not be converted: {source}")]
    ConversionFailure {
        index: usize,
        #[source]
        source: ConvertError,
    },

    #[error("slide {index} out of range (deck has {page_count})")]
    SlideOutOfRange { index: usize, page_count: usize },

    /// The source was modified since it was loaded; reload its metadata
    #[error("presentation {path} changed on disk")]
    PresentationChanged { path: PathBuf },
}

/// Display surface errors
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode view: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to encode frame: {0}")]
    Image(#[from] image::ImageError),
}
