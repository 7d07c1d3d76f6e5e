//! Deckpilot Hardware Abstraction Layer
//!
//! This crate defines the hardware traits the button remote is written
//! against. A board crate implements them for a concrete radio and GPIO
//! block; tests implement them with in-memory fakes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (deckpilot-remote)         │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  deckpilot-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  board GPIO   │       │  BLE stack    │
//! │ (embedded-hal)│       │ (GattServer)  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::InputPin`] - Digital input (re-exported from `embedded-hal`)
//! - [`radio::GattServer`] - BLE peripheral exposing the command characteristic

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod radio;

pub use gpio::{ActiveLevel, InputPin};
pub use radio::{EventQueue, GattServer, PeripheralEvent};
