//! Per-button press state
//!
//! A button is an explicit record stepped by the pure function [`step`].
//! The record is reset on every release.

use deckpilot_protocol::Command;

use crate::timing::{debounce_elapsed, LONG_PRESS_THRESHOLD_MS};

/// Physical button identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonId {
    Up,
    Down,
}

impl ButtonId {
    /// Command emitted by a short press on this button
    pub fn short_command(self) -> Command {
        match self {
            ButtonId::Up => Command::Up,
            ButtonId::Down => Command::Down,
        }
    }
}

/// Press state of a single button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonState {
    /// Released
    #[default]
    Idle,
    /// Held since `since_ms`, no long press reported yet
    Pressed { since_ms: u64 },
    /// Held since `since_ms`; `Select` was already emitted for this press
    LongPressReported { since_ms: u64 },
}

impl ButtonState {
    /// Check if the button is logically held
    pub fn is_held(&self) -> bool {
        !matches!(self, ButtonState::Idle)
    }

    /// Press start timestamp while held
    pub fn press_start(&self) -> Option<u64> {
        match *self {
            ButtonState::Idle => None,
            ButtonState::Pressed { since_ms } | ButtonState::LongPressReported { since_ms } => {
                Some(since_ms)
            }
        }
    }

    /// Check if a long press was reported for the current press
    pub fn long_press_reported(&self) -> bool {
        matches!(self, ButtonState::LongPressReported { .. })
    }
}

/// Advance one button by one sample
///
/// # Arguments
/// - `state`: record before this sample
/// - `button`: which button the record belongs to
/// - `pressed`: logical level sampled this tick
/// - `now_ms`: monotonic time of the sample
/// - `last_emit_ms`: time of the last command emitted by either button
///
/// Returns the new record and the command to emit, if any.
pub fn step(
    state: ButtonState,
    button: ButtonId,
    pressed: bool,
    now_ms: u64,
    last_emit_ms: Option<u64>,
) -> (ButtonState, Option<Command>) {
    use ButtonState::*;

    match (state, pressed) {
        (Idle, false) => (Idle, None),
        (Idle, true) => (Pressed { since_ms: now_ms }, None),

        (Pressed { since_ms }, true) => {
            let held = now_ms.saturating_sub(since_ms);
            if held >= LONG_PRESS_THRESHOLD_MS && debounce_elapsed(now_ms, last_emit_ms) {
                (LongPressReported { since_ms }, Some(Command::Select))
            } else {
                (state, None)
            }
        }
        (Pressed { since_ms }, false) => {
            let held = now_ms.saturating_sub(since_ms);
            if held < LONG_PRESS_THRESHOLD_MS && debounce_elapsed(now_ms, last_emit_ms) {
                (Idle, Some(button.short_command()))
            } else {
                (Idle, None)
            }
        }

        (LongPressReported { .. }, true) => (state, None),
        (LongPressReported { .. }, false) => (Idle, None),
    }
}
