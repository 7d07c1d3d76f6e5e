//! Remote configuration
//!
//! Timing is fixed at compile time (see `deckpilot_core::timing`); only the
//! wiring of the two buttons varies between boards.

use deckpilot_hal::ActiveLevel;

/// Board wiring of the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RemoteConfig {
    /// Level at which the UP button reads as pressed
    pub up_level: ActiveLevel,
    /// Level at which the DOWN button reads as pressed
    pub down_level: ActiveLevel,
}

impl RemoteConfig {
    /// Both buttons pull to ground when pressed (internal pull-ups)
    pub const fn active_low() -> Self {
        Self {
            up_level: ActiveLevel::Low,
            down_level: ActiveLevel::Low,
        }
    }
}
