//! deckpilot host service
//!
//! Receives commands from the button remote over BLE and drives a slide
//! deck on a display surface.
//!
//! ```text
//!  link thread                          runtime thread
//! ┌──────────────────────┐             ┌────────────────────────────────┐
//! │ Central (gatttool)   │  HostInput  │ NavigationState                │
//! │ HostSession + Backoff├──────┬─────►│ Library ─ SlideCache ─ Surface │
//! └──────────────────────┘      │      └────────────────────────────────┘
//!  keyboard thread ─────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod input;
pub mod keyboard;
pub mod library;
pub mod link;
pub mod logging;
pub mod render;
pub mod runtime;
pub mod surface;

pub use config::{Cli, HostConfig};
pub use error::{CacheError, ConfigError, ConvertError, LinkError};
pub use input::{HostInput, LinkStatus};
pub use runtime::Runtime;
