//! Host side of the link
//!
//! The host connects to one configured device, subscribes to the command
//! characteristic and, whenever the link drops or an attempt fails, waits
//! according to a [`Backoff`] before trying again. It never gives up; after
//! a run of consecutive failures the device is reported unreachable once.

use super::backoff::Backoff;

/// Host link state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostLinkState {
    #[default]
    Disconnected,
    /// Connection and subscription in progress
    Connecting,
    /// Subscribed; notifications flow
    Connected,
    /// Waiting out a backoff delay
    Waiting,
}

/// Events folded by the host session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostEvent {
    /// Service started
    Start,
    /// Connected and subscribed
    Connected,
    /// Connection or subscription attempt failed
    ConnectFailed,
    /// An established link went away
    LinkLost,
    /// The backoff delay has elapsed
    RetryDue,
}

/// I/O the caller should perform next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostAction {
    /// Attempt to connect and subscribe
    Connect,
    /// Receive notifications until the link drops
    Listen,
    /// Sleep, then feed [`HostEvent::RetryDue`]
    Wait { delay_ms: u32 },
}

/// Link changes worth surfacing to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkReport {
    Connected,
    Lost,
    /// Consecutive failures reached the reporting threshold
    Unreachable { failures: u32 },
}

/// Host session reducer
#[derive(Debug, Clone)]
pub struct HostSession {
    state: HostLinkState,
    backoff: Backoff,
    failures: u32,
    unreachable_after: u32,
    unreachable_reported: bool,
}

impl HostSession {
    /// Create a session
    ///
    /// # Arguments
    /// - `backoff`: delay policy between attempts
    /// - `unreachable_after`: consecutive failures before reporting
    pub fn new(backoff: Backoff, unreachable_after: u32) -> Self {
        Self {
            state: HostLinkState::Disconnected,
            backoff,
            failures: 0,
            unreachable_after: unreachable_after.max(1),
            unreachable_reported: false,
        }
    }

    /// Current link state
    pub fn state(&self) -> HostLinkState {
        self.state
    }

    /// Consecutive failed attempts since the last successful connection
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Fold one event
    ///
    /// Returns the next action (none if the event does not apply in the
    /// current state) and an optional report.
    pub fn handle(&mut self, event: HostEvent) -> (Option<HostAction>, Option<LinkReport>) {
        use HostEvent::*;
        use HostLinkState::*;

        match (self.state, event) {
            (Disconnected, Start) | (Waiting, RetryDue) => {
                self.state = Connecting;
                (Some(HostAction::Connect), None)
            }

            (Connecting, HostEvent::Connected) => {
                self.state = HostLinkState::Connected;
                self.backoff.reset();
                self.failures = 0;
                self.unreachable_reported = false;
                (Some(HostAction::Listen), Some(LinkReport::Connected))
            }

            (Connecting, ConnectFailed) => {
                self.state = Waiting;
                self.failures = self.failures.saturating_add(1);

                let report = if self.failures >= self.unreachable_after
                    && !self.unreachable_reported
                {
                    self.unreachable_reported = true;
                    Some(LinkReport::Unreachable {
                        failures: self.failures,
                    })
                } else {
                    None
                };

                let delay_ms = self.backoff.next_delay();
                (Some(HostAction::Wait { delay_ms }), report)
            }

            (HostLinkState::Connected, LinkLost) => {
                self.state = Waiting;
                let delay_ms = self.backoff.next_delay();
                (Some(HostAction::Wait { delay_ms }), Some(LinkReport::Lost))
            }

            _ => (None, None),
        }
    }
}
