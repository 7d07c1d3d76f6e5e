//! Deckpilot wire protocol
//!
//! This crate defines what travels between the button remote and the host
//! over the BLE link. The link carries a single characteristic whose value is
//! one short ASCII token per notification:
//!
//! ```text
//! ┌─────────┬──────────────────────────────────────────┐
//! │ "Ready" │ initial value, written once at boot      │
//! │ "UP"    │ short press on the UP button             │
//! │ "DOWN"  │ short press on the DOWN button           │
//! │ "SELECT"│ long press on either button              │
//! └─────────┴──────────────────────────────────────────┘
//! ```
//!
//! Tokens are never batched; each notification carries exactly one.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod gatt;
pub mod identity;

pub use command::{Command, Notification, TokenError, MAX_TOKEN_LEN};
pub use gatt::{ATT_MTU, CCCD_ENABLE_NOTIFY, CCCD_UUID16};
pub use identity::{DeviceAddress, IdentityError, Uuid};
