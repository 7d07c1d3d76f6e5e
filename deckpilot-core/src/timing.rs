//! Controller timing constants
//!
//! All controller waits are elapsed-time comparisons against a monotonic
//! millisecond tick; nothing blocks.

/// Period of the controller loop (ms)
pub const TICK_INTERVAL_MS: u64 = 10;

/// Hold time after which a press counts as a long press (ms)
pub const LONG_PRESS_THRESHOLD_MS: u64 = 1000;

/// Minimum spacing between two emitted commands, any button (ms)
pub const COMMAND_DEBOUNCE_MS: u64 = 1500;

/// Interval between controller status reports (ms)
pub const STATUS_INTERVAL_MS: u64 = 5000;

/// Returns true if a command may be emitted at `now_ms`
///
/// The very first command after boot is never held back.
pub fn debounce_elapsed(now_ms: u64, last_emit_ms: Option<u64>) -> bool {
    match last_emit_ms {
        Some(last) => now_ms.saturating_sub(last) >= COMMAND_DEBOUNCE_MS,
        None => true,
    }
}
