//! Remote control loop
//!
//! One cooperative tick function drives everything: it drains radio
//! events, samples both buttons, decodes commands and publishes them, and
//! emits a status report every [`STATUS_INTERVAL_MS`]. The loop never
//! sleeps; the caller invokes [`Remote::tick`] every [`TICK_INTERVAL_MS`]
//! with a monotonic timestamp.
//!
//! [`TICK_INTERVAL_MS`]: deckpilot_core::timing::TICK_INTERVAL_MS

use deckpilot_core::input::{Decoder, Sample};
use deckpilot_core::session::{
    ConnectionState, ControllerSession, Route, SessionAction, SessionEvent, SessionStats,
};
use deckpilot_core::timing::STATUS_INTERVAL_MS;
use deckpilot_hal::gpio::read_pressed;
use deckpilot_hal::{GattServer, InputPin, PeripheralEvent};
use deckpilot_protocol::{Command, Notification};

use crate::config::RemoteConfig;
use crate::error::RemoteError;

/// Snapshot reported by the periodic status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    pub uptime_ms: u64,
    pub state: ConnectionState,
    pub stats: SessionStats,
}

/// The button remote
pub struct Remote<U, D, G> {
    up: U,
    down: D,
    radio: G,
    config: RemoteConfig,
    decoder: Decoder,
    session: ControllerSession,
    next_status_ms: u64,
    last_status: Option<Status>,
}

impl<U, D, G, P> Remote<U, D, G>
where
    U: InputPin<Error = P>,
    D: InputPin<Error = P>,
    G: GattServer,
{
    /// Assemble a remote from its pins and radio
    pub fn new(up: U, down: D, radio: G, config: RemoteConfig) -> Self {
        Self {
            up,
            down,
            radio,
            config,
            decoder: Decoder::new(),
            session: ControllerSession::new(),
            next_status_ms: 0,
            last_status: None,
        }
    }

    /// Publish the presence sentinel and start advertising
    ///
    /// Failing to start advertising is not fatal; it is retried with every
    /// status report until it succeeds.
    pub fn boot(&mut self, now_ms: u64) -> Result<(), RemoteError<P, G::Error>> {
        self.radio
            .set_value(Notification::Ready.token().as_bytes())
            .map_err(RemoteError::Radio)?;

        self.apply(SessionEvent::Start);
        self.next_status_ms = now_ms + STATUS_INTERVAL_MS;

        #[cfg(feature = "defmt")]
        defmt::info!("Remote booted, link {}", self.session.state());

        Ok(())
    }

    /// Run one loop iteration
    ///
    /// Returns the command decoded this tick, whether or not it could be
    /// delivered.
    pub fn tick(&mut self, now_ms: u64) -> Result<Option<Command>, RemoteError<P, G::Error>> {
        while let Some(event) = self.radio.poll_event() {
            let event = match event {
                PeripheralEvent::Connected => SessionEvent::PeerConnected,
                PeripheralEvent::Disconnected => SessionEvent::PeerDisconnected,
            };
            self.apply(event);
        }

        let sample = Sample {
            up: read_pressed(&mut self.up, self.config.up_level).map_err(RemoteError::Pin)?,
            down: read_pressed(&mut self.down, self.config.down_level)
                .map_err(RemoteError::Pin)?,
        };

        let decoded = self.decoder.tick(now_ms, sample);
        if let Some(cmd) = decoded {
            self.publish(cmd);
        }

        if now_ms >= self.next_status_ms {
            self.report(now_ms);
            self.next_status_ms = now_ms + STATUS_INTERVAL_MS;
        }

        Ok(decoded)
    }

    /// Current link state
    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Most recent status report
    pub fn last_status(&self) -> Option<Status> {
        self.last_status
    }

    /// Access the radio
    pub fn radio(&self) -> &G {
        &self.radio
    }

    /// Mutable access to the radio
    pub fn radio_mut(&mut self) -> &mut G {
        &mut self.radio
    }

    /// Release the pins and radio
    pub fn release(self) -> (U, D, G) {
        (self.up, self.down, self.radio)
    }

    fn apply(&mut self, event: SessionEvent) {
        if let Some(SessionAction::StartAdvertising) = self.session.handle(event) {
            if self.radio.start_advertising().is_err() {
                #[cfg(feature = "defmt")]
                defmt::warn!("Failed to start advertising, will retry");

                self.session.handle(SessionEvent::AdvertisingFailed);
            }
        }
    }

    fn publish(&mut self, cmd: Command) {
        match self.session.route(cmd) {
            Route::Notify(cmd) => {
                let delivered = self.radio.notify(cmd.as_bytes()).is_ok();
                self.session.record_notify(delivered);

                if delivered {
                    #[cfg(feature = "defmt")]
                    defmt::info!("Sent {}", cmd.token());
                } else {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Notify failed for {}", cmd.token());
                }
            }
            Route::Drop(_cmd) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("No central, dropped {}", _cmd.token());
            }
        }
    }

    fn report(&mut self, now_ms: u64) {
        let status = Status {
            uptime_ms: now_ms,
            state: self.session.state(),
            stats: self.session.stats(),
        };
        self.last_status = Some(status);

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Status: {} sent={} dropped={} failed={} connections={}",
            status.state,
            status.stats.sent,
            status.stats.dropped,
            status.stats.failed,
            status.stats.connections
        );

        if status.state == ConnectionState::Disconnected {
            self.apply(SessionEvent::Start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckpilot_core::timing::TICK_INTERVAL_MS;
    use deckpilot_hal::gpio::ErrorType;
    use deckpilot_hal::EventQueue;
    use std::cell::Cell;
    use std::convert::Infallible;
    use std::rc::Rc;
    use std::vec::Vec;

    /// Active-low pin whose level is shared with the test
    #[derive(Clone, Default)]
    struct FakePin(Rc<Cell<bool>>);

    impl FakePin {
        fn press(&self, pressed: bool) {
            self.0.set(pressed);
        }
    }

    impl ErrorType for FakePin {
        type Error = Infallible;
    }

    impl InputPin for FakePin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(!self.0.get())
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(self.0.get())
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct RadioFault;

    #[derive(Default)]
    struct FakeRadio {
        value: Vec<u8>,
        notified: Vec<Vec<u8>>,
        advertise_calls: u32,
        fail_advertising: bool,
        fail_notify: bool,
        events: EventQueue<8>,
    }

    impl GattServer for FakeRadio {
        type Error = RadioFault;

        fn set_value(&mut self, value: &[u8]) -> Result<(), RadioFault> {
            self.value = value.to_vec();
            Ok(())
        }

        fn start_advertising(&mut self) -> Result<(), RadioFault> {
            self.advertise_calls += 1;
            if self.fail_advertising {
                Err(RadioFault)
            } else {
                Ok(())
            }
        }

        fn notify(&mut self, value: &[u8]) -> Result<(), RadioFault> {
            if self.fail_notify {
                return Err(RadioFault);
            }
            self.value = value.to_vec();
            self.notified.push(value.to_vec());
            Ok(())
        }

        fn poll_event(&mut self) -> Option<PeripheralEvent> {
            self.events.pop()
        }
    }

    struct Rig {
        remote: Remote<FakePin, FakePin, FakeRadio>,
        up: FakePin,
        down: FakePin,
        now: u64,
    }

    impl Rig {
        fn new() -> Self {
            let up = FakePin::default();
            let down = FakePin::default();
            let remote = Remote::new(
                up.clone(),
                down.clone(),
                FakeRadio::default(),
                RemoteConfig::active_low(),
            );
            Self {
                remote,
                up,
                down,
                now: 0,
            }
        }

        fn booted() -> Self {
            let mut rig = Self::new();
            rig.remote.boot(0).unwrap();
            rig
        }

        fn connect(&mut self) {
            self.remote
                .radio_mut()
                .events
                .push(PeripheralEvent::Connected);
            self.run_for(TICK_INTERVAL_MS);
        }

        /// Tick until `duration` has elapsed, collecting decoded commands
        fn run_for(&mut self, duration: u64) -> Vec<Command> {
            let end = self.now + duration;
            let mut out = Vec::new();
            while self.now < end {
                if let Some(cmd) = self.remote.tick(self.now).unwrap() {
                    out.push(cmd);
                }
                self.now += TICK_INTERVAL_MS;
            }
            out
        }

        fn tap(&mut self, pin: &FakePin, hold_ms: u64) -> Vec<Command> {
            pin.press(true);
            let mut out = self.run_for(hold_ms);
            pin.press(false);
            out.extend(self.run_for(TICK_INTERVAL_MS));
            out
        }
    }

    #[test]
    fn test_boot_sets_sentinel_and_advertises() {
        let rig = Rig::booted();
        assert_eq!(rig.remote.radio().value, b"Ready");
        assert_eq!(rig.remote.radio().advertise_calls, 1);
        assert_eq!(rig.remote.state(), ConnectionState::Advertising);
    }

    #[test]
    fn test_commands_notified_when_connected() {
        let mut rig = Rig::booted();
        rig.connect();
        assert_eq!(rig.remote.state(), ConnectionState::Connected);

        let up = rig.up.clone();
        assert_eq!(rig.tap(&up, 200), [Command::Up]);
        rig.run_for(1500);
        let down = rig.down.clone();
        assert_eq!(rig.tap(&down, 1200), [Command::Select]);

        let notified = &rig.remote.radio().notified;
        assert_eq!(notified.len(), 2);
        assert_eq!(notified[0], b"UP");
        assert_eq!(notified[1], b"SELECT");
    }

    #[test]
    fn test_commands_dropped_while_advertising() {
        let mut rig = Rig::booted();
        let up = rig.up.clone();
        assert_eq!(rig.tap(&up, 100), [Command::Up]);
        assert!(rig.remote.radio().notified.is_empty());

        rig.run_for(STATUS_INTERVAL_MS);
        let status = rig.remote.last_status().unwrap();
        assert_eq!(status.stats.dropped, 1);
        assert_eq!(status.stats.sent, 0);
    }

    #[test]
    fn test_disconnect_restarts_advertising() {
        let mut rig = Rig::booted();
        rig.connect();
        rig.remote
            .radio_mut()
            .events
            .push(PeripheralEvent::Disconnected);
        rig.run_for(TICK_INTERVAL_MS);

        assert_eq!(rig.remote.state(), ConnectionState::Advertising);
        assert_eq!(rig.remote.radio().advertise_calls, 2);
    }

    #[test]
    fn test_failed_notify_counted() {
        let mut rig = Rig::booted();
        rig.connect();
        rig.remote.radio_mut().fail_notify = true;
        let up = rig.up.clone();
        assert_eq!(rig.tap(&up, 100), [Command::Up]);

        rig.run_for(STATUS_INTERVAL_MS);
        let status = rig.remote.last_status().unwrap();
        assert_eq!(status.stats.failed, 1);
        assert_eq!(status.state, ConnectionState::Connected);
    }

    #[test]
    fn test_advertising_retried_on_status_interval() {
        let mut rig = Rig::new();
        rig.remote.radio_mut().fail_advertising = true;
        rig.remote.boot(0).unwrap();
        assert_eq!(rig.remote.state(), ConnectionState::Disconnected);

        rig.remote.radio_mut().fail_advertising = false;
        rig.run_for(STATUS_INTERVAL_MS + TICK_INTERVAL_MS);
        assert_eq!(rig.remote.state(), ConnectionState::Advertising);
        assert_eq!(rig.remote.radio().advertise_calls, 2);
    }

    #[test]
    fn test_status_reported_periodically() {
        let mut rig = Rig::booted();
        assert!(rig.remote.last_status().is_none());
        rig.run_for(STATUS_INTERVAL_MS + TICK_INTERVAL_MS);
        let status = rig.remote.last_status().unwrap();
        assert_eq!(status.uptime_ms, STATUS_INTERVAL_MS);
        assert_eq!(status.state, ConnectionState::Advertising);
    }
}
