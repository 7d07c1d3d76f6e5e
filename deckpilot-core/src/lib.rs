//! Board-agnostic core logic for the deckpilot remote and host
//!
//! This crate contains all logic that has real state and timing but no
//! I/O of its own:
//!
//! - Button decoding (debounce and long-press detection)
//! - Link session reducers for the controller and the host
//! - Reconnect backoff policy
//! - Navigation state machine for the deck list and slide view
//! - Controller timing constants
//!
//! Time is always passed in as a monotonic millisecond value, so every
//! piece can be driven with synthetic time in tests.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod input;
pub mod navigation;
pub mod session;
pub mod timing;
