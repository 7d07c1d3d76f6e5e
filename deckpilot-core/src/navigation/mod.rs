//! Host navigation state machine
//!
//! Interprets commands against the current view (deck list or a single
//! slide of an open deck). Navigation is owned by one consumer and mutated
//! only in response to a command or a render outcome fed back by it.

pub mod catalog;
pub mod machine;

pub use catalog::{DeckCatalog, DeckUnavailable};
pub use machine::{Mode, NavigationState, OpenDeck, Transition};
