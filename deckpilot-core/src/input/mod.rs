//! Button input decoding
//!
//! Two buttons are sampled on a fixed tick and decoded independently with
//! identical logic. The only state they share is the timestamp of the last
//! emitted command, which enforces the debounce window across both.

pub mod button;
pub mod decoder;

pub use button::{step, ButtonId, ButtonState};
pub use decoder::{Decoder, Sample};
