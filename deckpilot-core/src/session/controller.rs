//! Controller side of the link
//!
//! The controller advertises one service, accepts a single central and
//! pushes command notifications while connected. Losing the central
//! restarts advertising; it is never fatal.

use deckpilot_protocol::Command;

/// Link state of one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Advertising,
    Connected,
}

impl ConnectionState {
    /// Check if notifications can be delivered
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Events folded by the controller session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionEvent {
    /// Radio is up and may start advertising
    Start,
    /// Advertising could not be started
    AdvertisingFailed,
    /// A central connected
    PeerConnected,
    /// The central disconnected
    PeerDisconnected,
}

/// Radio actions requested by the reducer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionAction {
    StartAdvertising,
}

/// What to do with a decoded command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Route {
    /// Notify the connected central
    Notify(Command),
    /// No central; the command is discarded
    Drop(Command),
}

/// Counters reported with the periodic status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionStats {
    /// Commands delivered as notifications
    pub sent: u32,
    /// Commands discarded while no central was connected
    pub dropped: u32,
    /// Notifications the radio failed to send
    pub failed: u32,
    /// Centrals accepted since boot
    pub connections: u32,
}

/// Controller session reducer
#[derive(Debug, Clone, Default)]
pub struct ControllerSession {
    state: ConnectionState,
    stats: SessionStats,
}

impl ControllerSession {
    /// Create a session in the `Disconnected` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current link state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Counters since boot
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Fold one event and return the radio action to perform, if any
    pub fn handle(&mut self, event: SessionEvent) -> Option<SessionAction> {
        use ConnectionState::*;
        use SessionEvent::*;

        let (next, action) = match (self.state, event) {
            (Disconnected, Start) => (Advertising, Some(SessionAction::StartAdvertising)),
            (Advertising, AdvertisingFailed) => (Disconnected, None),

            // Some stacks report the connection before advertising is
            // acknowledged; accept it from either idle state
            (Disconnected | Advertising, PeerConnected) => {
                self.stats.connections = self.stats.connections.saturating_add(1);
                (Connected, None)
            }

            (Connected, PeerDisconnected) => (Advertising, Some(SessionAction::StartAdvertising)),

            _ => (self.state, None),
        };

        self.state = next;
        action
    }

    /// Route a decoded command according to the link state
    pub fn route(&mut self, cmd: Command) -> Route {
        if self.state.is_connected() {
            Route::Notify(cmd)
        } else {
            self.stats.dropped = self.stats.dropped.saturating_add(1);
            Route::Drop(cmd)
        }
    }

    /// Record the outcome of a notification attempt
    pub fn record_notify(&mut self, delivered: bool) {
        if delivered {
            self.stats.sent = self.stats.sent.saturating_add(1);
        } else {
            self.stats.failed = self.stats.failed.saturating_add(1);
        }
    }
}
