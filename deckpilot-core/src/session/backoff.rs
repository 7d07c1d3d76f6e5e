//! Bounded exponential backoff

/// Delay policy between reconnect attempts
///
/// Delays start at `initial_ms`, double after every failure and saturate
/// at `max_ms`. A successful connection resets the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Backoff {
    initial_ms: u32,
    max_ms: u32,
    next_ms: u32,
}

impl Backoff {
    /// Create a policy; `max_ms` is raised to `initial_ms` if smaller
    pub fn new(initial_ms: u32, max_ms: u32) -> Self {
        let initial_ms = initial_ms.max(1);
        Self {
            initial_ms,
            max_ms: max_ms.max(initial_ms),
            next_ms: initial_ms,
        }
    }

    /// Delay to wait before the next attempt
    pub fn next_delay(&mut self) -> u32 {
        let delay = self.next_ms;
        self.next_ms = delay.saturating_mul(2).min(self.max_ms);
        delay
    }

    /// Start over from the initial delay
    pub fn reset(&mut self) {
        self.next_ms = self.initial_ms;
    }

    /// Upper bound of any returned delay
    pub fn max_ms(&self) -> u32 {
        self.max_ms
    }
}
