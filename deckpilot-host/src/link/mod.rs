//! Wireless link to the button remote
//!
//! [`Central`] connects to the remote and enables notifications on its
//! command characteristic; the resulting [`NotificationLink`] yields raw
//! payloads. The [`runner`] drives a central on its own thread, folds its
//! results through the host session reducer and forwards decoded commands
//! onto the input queue.

pub mod gatttool;
pub mod parse;
pub mod runner;

use std::fmt;
use std::time::Duration;

use deckpilot_protocol::{DeviceAddress, Uuid};
use serde::Deserialize;

use crate::error::LinkError;

pub use gatttool::GatttoolCentral;
pub use runner::{LinkPolicy, LinkRunner};

/// Bluetooth address type used when connecting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    Random,
    Public,
    /// Try random first, then public
    Auto,
}

impl AddressType {
    /// Concrete address types to try, in order
    pub fn candidates(self) -> &'static [AddressType] {
        match self {
            AddressType::Random => &[AddressType::Random],
            AddressType::Public => &[AddressType::Public],
            AddressType::Auto => &[AddressType::Random, AddressType::Public],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AddressType::Random => "random",
            AddressType::Public => "public",
            AddressType::Auto => "auto",
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated identity of the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub address: DeviceAddress,
    pub address_type: AddressType,
    pub service: Uuid,
    pub characteristic: Uuid,
    pub mtu: u16,
}

/// An established, subscribed link
pub trait NotificationLink {
    /// Wait up to `timeout` for the next notification payload
    ///
    /// `Ok(None)` means nothing arrived in time. Any error means the link
    /// is gone and must be dropped.
    fn next_notification(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, LinkError>;
}

/// Something that can connect to the remote
pub trait Central {
    type Link: NotificationLink;

    /// Connect, resolve the command characteristic and enable notifications
    fn connect(&mut self, target: &LinkTarget) -> Result<Self::Link, LinkError>;
}
