//! BLE peripheral abstraction
//!
//! The remote exposes one service with one read/write/notify characteristic.
//! The radio stack owns the GATT database; the application only sets the
//! characteristic value, pushes notifications and reacts to peer events.

use heapless::Deque;

/// Connection events raised by the radio stack
///
/// Connect and disconnect callbacks of the underlying stack are turned into
/// values of this type and drained once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PeripheralEvent {
    /// A central connected
    Connected,
    /// The connected central went away (or the link timed out)
    Disconnected,
}

/// Bounded queue between radio callbacks and the tick loop
///
/// Stack callbacks push events; [`GattServer::poll_event`] implementations
/// pop them. When full, the oldest event is discarded so the queue always
/// ends with the most recent peer state.
#[derive(Debug, Default)]
pub struct EventQueue<const N: usize> {
    events: Deque<PeripheralEvent, N>,
    overflowed: u32,
}

impl<const N: usize> EventQueue<N> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            events: Deque::new(),
            overflowed: 0,
        }
    }

    /// Record an event raised by the stack
    pub fn push(&mut self, event: PeripheralEvent) {
        if self.events.is_full() {
            self.events.pop_front();
            self.overflowed = self.overflowed.saturating_add(1);
        }
        // Cannot fail: a slot was freed above
        let _ = self.events.push_back(event);
    }

    /// Take the oldest pending event
    pub fn pop(&mut self) -> Option<PeripheralEvent> {
        self.events.pop_front()
    }

    /// Number of events discarded because the queue was full
    pub fn overflowed(&self) -> u32 {
        self.overflowed
    }
}

/// GATT server exposing the command characteristic
pub trait GattServer {
    /// Error type for radio operations
    type Error;

    /// Set the characteristic value without notifying
    ///
    /// Used once at boot to publish the presence sentinel.
    fn set_value(&mut self, value: &[u8]) -> Result<(), Self::Error>;

    /// Start (or restart) advertising the service
    fn start_advertising(&mut self) -> Result<(), Self::Error>;

    /// Update the characteristic value and notify the subscribed central
    fn notify(&mut self, value: &[u8]) -> Result<(), Self::Error>;

    /// Take the next pending peer event, if any
    fn poll_event(&mut self) -> Option<PeripheralEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_fifo() {
        let mut queue: EventQueue<4> = EventQueue::new();
        queue.push(PeripheralEvent::Connected);
        queue.push(PeripheralEvent::Disconnected);
        assert_eq!(queue.pop(), Some(PeripheralEvent::Connected));
        assert_eq!(queue.pop(), Some(PeripheralEvent::Disconnected));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_queue_overflow_keeps_latest() {
        let mut queue: EventQueue<2> = EventQueue::new();
        queue.push(PeripheralEvent::Connected);
        queue.push(PeripheralEvent::Disconnected);
        queue.push(PeripheralEvent::Connected);
        assert_eq!(queue.overflowed(), 1);
        assert_eq!(queue.pop(), Some(PeripheralEvent::Disconnected));
        assert_eq!(queue.pop(), Some(PeripheralEvent::Connected));
    }
}
