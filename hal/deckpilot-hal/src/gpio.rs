//! GPIO input abstractions
//!
//! Button pins use the `embedded-hal` 1.0 digital input trait directly so
//! that any board HAL can be plugged in without an adapter layer.

pub use embedded_hal::digital::{ErrorType, InputPin};

/// Electrical level at which a button reads as pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActiveLevel {
    /// Pressed pulls the pin to ground (internal pull-up wiring)
    #[default]
    Low,
    /// Pressed drives the pin high (pull-down wiring)
    High,
}

impl ActiveLevel {
    /// Map a raw pin reading to a logical pressed state
    pub fn is_pressed(self, pin_high: bool) -> bool {
        match self {
            ActiveLevel::Low => !pin_high,
            ActiveLevel::High => pin_high,
        }
    }
}

/// Read a pin and report whether its button is pressed
pub fn read_pressed<P: InputPin>(pin: &mut P, level: ActiveLevel) -> Result<bool, P::Error> {
    Ok(level.is_pressed(pin.is_high()?))
}
