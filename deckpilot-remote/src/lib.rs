//! Deckpilot button remote
//!
//! Hardware-agnostic controller application: two button pins and a BLE
//! peripheral are handed to [`Remote`], which is ticked every 10 ms. A board
//! crate supplies the `embedded-hal` pins and a [`deckpilot_hal::GattServer`]
//! implementation, then either calls [`Remote::tick`] from its own loop or
//! spawns [`runner::run`] (feature `embassy`).

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod remote;
#[cfg(feature = "embassy")]
pub mod runner;

pub use config::RemoteConfig;
pub use error::RemoteError;
pub use remote::{Remote, Status};
