//! Two-button decoder
//!
//! Called once per tick with the sampled button levels. Emits at most one
//! command per tick; UP is stepped before DOWN, and any emission refreshes
//! the shared timestamp before DOWN is considered.

use deckpilot_protocol::Command;

use super::button::{step, ButtonId, ButtonState};

/// Logical levels of both buttons at one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    pub up: bool,
    pub down: bool,
}

impl Sample {
    pub const RELEASED: Sample = Sample {
        up: false,
        down: false,
    };
}

/// Decoder for the UP and DOWN buttons
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    up: ButtonState,
    down: ButtonState,
    /// Time of the last emitted command, any button
    last_emit_ms: Option<u64>,
}

impl Decoder {
    /// Create a decoder with both buttons released and no prior emission
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one sample
    pub fn tick(&mut self, now_ms: u64, sample: Sample) -> Option<Command> {
        let mut emitted = None;

        for (button, pressed) in [(ButtonId::Up, sample.up), (ButtonId::Down, sample.down)] {
            let slot = match button {
                ButtonId::Up => &mut self.up,
                ButtonId::Down => &mut self.down,
            };

            let (next, cmd) = step(*slot, button, pressed, now_ms, self.last_emit_ms);
            *slot = next;

            if let Some(cmd) = cmd {
                self.last_emit_ms = Some(now_ms);
                emitted = Some(cmd);
            }
        }

        emitted
    }

    /// Current record of one button
    pub fn button(&self, button: ButtonId) -> ButtonState {
        match button {
            ButtonId::Up => self.up,
            ButtonId::Down => self.down,
        }
    }

    /// Time of the last emitted command
    pub fn last_emit_ms(&self) -> Option<u64> {
        self.last_emit_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::{COMMAND_DEBOUNCE_MS, LONG_PRESS_THRESHOLD_MS, TICK_INTERVAL_MS};
    use proptest::prelude::*;
    use std::vec::Vec;

    /// Run the decoder from `start` to `end` (exclusive) and collect emissions
    fn run(
        decoder: &mut Decoder,
        start: u64,
        end: u64,
        sample_at: impl Fn(u64) -> Sample,
    ) -> Vec<(u64, Command)> {
        let mut out = Vec::new();
        let mut t = start;
        while t < end {
            if let Some(cmd) = decoder.tick(t, sample_at(t)) {
                out.push((t, cmd));
            }
            t += TICK_INTERVAL_MS;
        }
        out
    }

    fn up_between(from: u64, to: u64) -> impl Fn(u64) -> Sample {
        move |t| Sample {
            up: t >= from && t < to,
            down: false,
        }
    }

    #[test]
    fn test_short_press_up() {
        let mut decoder = Decoder::new();
        let out = run(&mut decoder, 0, 3000, up_between(1000, 1600));
        assert_eq!(out, [(1600, Command::Up)]);
    }

    #[test]
    fn test_long_press_select_at_threshold() {
        let mut decoder = Decoder::new();
        let out = run(&mut decoder, 0, 3000, up_between(0, 1800));
        assert_eq!(out, [(1000, Command::Select)]);
        assert_eq!(decoder.button(ButtonId::Up), ButtonState::Idle);
    }

    #[test]
    fn test_down_short_press() {
        let mut decoder = Decoder::new();
        let out = run(&mut decoder, 0, 1000, |t| Sample {
            up: false,
            down: (100..300).contains(&t),
        });
        assert_eq!(out, [(300, Command::Down)]);
    }

    #[test]
    fn test_rapid_presses_debounced() {
        let mut decoder = Decoder::new();
        // Three taps 500 ms apart; only the first falls outside the window
        let out = run(&mut decoder, 0, 2000, |t| Sample {
            up: (0..100).contains(&t) || (500..600).contains(&t) || (1000..1100).contains(&t),
            down: false,
        });
        assert_eq!(out, [(100, Command::Up)]);
    }

    #[test]
    fn test_simultaneous_release_emits_once() {
        let mut decoder = Decoder::new();
        let out = run(&mut decoder, 0, 1000, |t| Sample {
            up: (0..200).contains(&t),
            down: (0..200).contains(&t),
        });
        assert_eq!(out, [(200, Command::Up)]);
        assert_eq!(decoder.button(ButtonId::Down), ButtonState::Idle);
    }

    #[test]
    fn test_buttons_long_press_independently() {
        let mut decoder = Decoder::new();
        // DOWN held across UP's long press; its own long press is reported
        // once the debounce window reopens
        let out = run(&mut decoder, 0, 4000, |t| Sample {
            up: (0..1200).contains(&t),
            down: (500..3000).contains(&t),
        });
        assert_eq!(out, [(1000, Command::Select), (2500, Command::Select)]);
    }

    proptest! {
        #[test]
        fn prop_emissions_respect_debounce(
            ups in proptest::collection::vec(any::<bool>(), 1..400),
            downs in proptest::collection::vec(any::<bool>(), 1..400),
        ) {
            let mut decoder = Decoder::new();
            let mut last: Option<u64> = None;
            let len = ups.len().min(downs.len());
            for i in 0..len {
                let now = i as u64 * TICK_INTERVAL_MS;
                let sample = Sample { up: ups[i], down: downs[i] };
                if decoder.tick(now, sample).is_some() {
                    if let Some(prev) = last {
                        prop_assert!(now - prev >= COMMAND_DEBOUNCE_MS);
                    }
                    last = Some(now);
                }
            }
        }

        #[test]
        fn prop_short_press_emits_exactly_once(
            start_tick in 0u64..100,
            held_ticks in 1u64..(LONG_PRESS_THRESHOLD_MS / TICK_INTERVAL_MS),
        ) {
            let mut decoder = Decoder::new();
            let from = start_tick * TICK_INTERVAL_MS;
            let to = from + held_ticks * TICK_INTERVAL_MS;
            let out = run(&mut decoder, 0, to + 2000, up_between(from, to));
            prop_assert_eq!(out, std::vec![(to, Command::Up)]);
        }

        #[test]
        fn prop_long_press_emits_single_select(
            start_tick in 0u64..100,
            held_ms in (LONG_PRESS_THRESHOLD_MS + 1)..5000,
        ) {
            let mut decoder = Decoder::new();
            let from = start_tick * TICK_INTERVAL_MS;
            let out = run(&mut decoder, 0, from + held_ms + 2000, up_between(from, from + held_ms));
            prop_assert_eq!(out, std::vec![(from + LONG_PRESS_THRESHOLD_MS, Command::Select)]);
        }
    }
}
