//! Link thread
//!
//! Runs the connect / listen / back off cycle of the host session reducer
//! on a dedicated thread. Decoded commands and link status changes are sent
//! in receipt order onto the unbounded input queue; nothing else is shared
//! with the consumer.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use deckpilot_core::session::{Backoff, HostAction, HostEvent, HostSession};
use deckpilot_protocol::Notification;
use tracing::{debug, error, info, warn};

use super::{Central, LinkTarget, NotificationLink};
use crate::config::LinkConfig;
use crate::error::CommandError;
use crate::input::{HostInput, LinkStatus};

/// Longest single sleep while waiting; bounds shutdown latency
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Timing of the link thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkPolicy {
    pub backoff_initial_ms: u32,
    pub backoff_max_ms: u32,
    pub unreachable_after: u32,
    pub poll_interval: Duration,
}

impl From<&LinkConfig> for LinkPolicy {
    fn from(config: &LinkConfig) -> Self {
        Self {
            backoff_initial_ms: config.backoff_initial_ms,
            backoff_max_ms: config.backoff_max_ms,
            unreachable_after: config.unreachable_after,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }
}

/// Decode one notification payload
pub fn decode_payload(payload: &[u8]) -> Result<Notification, CommandError> {
    Notification::parse(payload).map_err(|reason| CommandError::Malformed {
        payload: payload.to_vec(),
        reason,
    })
}

/// Handle to the running link thread
pub struct LinkRunner {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LinkRunner {
    /// Start the link thread
    pub fn spawn<C>(
        central: C,
        target: LinkTarget,
        policy: LinkPolicy,
        inputs: Sender<HostInput>,
    ) -> io::Result<Self>
    where
        C: Central + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();

        let handle = thread::Builder::new()
            .name("deckpilot-link".to_string())
            .spawn(move || run(central, &target, &policy, &inputs, &flag))?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Ask the thread to stop and wait for it
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Link thread panicked");
            }
        }
    }
}

impl Drop for LinkRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

enum ListenEnd {
    Lost,
    Shutdown,
    QueueClosed,
}

/// Drive the session until shutdown or until the consumer goes away
pub fn run<C: Central>(
    mut central: C,
    target: &LinkTarget,
    policy: &LinkPolicy,
    inputs: &Sender<HostInput>,
    shutdown: &AtomicBool,
) {
    let backoff = Backoff::new(policy.backoff_initial_ms, policy.backoff_max_ms);
    let mut session = HostSession::new(backoff, policy.unreachable_after);
    let mut link: Option<C::Link> = None;

    let mut step = session.handle(HostEvent::Start);

    while !shutdown.load(Ordering::Relaxed) {
        let (action, report) = step;

        if let Some(report) = report {
            let status = LinkStatus::from(report);
            info!(?status, "Link status changed");
            if inputs.send(HostInput::Link(status)).is_err() {
                return;
            }
        }

        let event = match action {
            Some(HostAction::Connect) => {
                info!(address = %target.address, attempt = session.failures() + 1, "Connecting");
                match central.connect(target) {
                    Ok(connected) => {
                        link = Some(connected);
                        HostEvent::Connected
                    }
                    Err(e) => {
                        warn!(error = %e, "Connection attempt failed");
                        HostEvent::ConnectFailed
                    }
                }
            }
            Some(HostAction::Listen) => {
                let end = match link.as_mut() {
                    Some(active) => listen(active, policy, inputs, shutdown),
                    None => ListenEnd::Lost,
                };
                link = None;
                match end {
                    ListenEnd::Lost => HostEvent::LinkLost,
                    ListenEnd::Shutdown => break,
                    ListenEnd::QueueClosed => return,
                }
            }
            Some(HostAction::Wait { delay_ms }) => {
                debug!(delay_ms, "Waiting before reconnect");
                if !sleep_unless_shutdown(Duration::from_millis(u64::from(delay_ms)), shutdown) {
                    break;
                }
                HostEvent::RetryDue
            }
            None => {
                error!(state = ?session.state(), "Link session has no next action");
                break;
            }
        };

        step = session.handle(event);
    }

    info!("Link thread stopped");
}

fn listen<L: NotificationLink>(
    link: &mut L,
    policy: &LinkPolicy,
    inputs: &Sender<HostInput>,
    shutdown: &AtomicBool,
) -> ListenEnd {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return ListenEnd::Shutdown;
        }

        match link.next_notification(policy.poll_interval) {
            Ok(Some(payload)) => match decode_payload(&payload) {
                Ok(Notification::Command(cmd)) => {
                    info!(command = cmd.token(), "Received command");
                    if inputs.send(HostInput::Command(cmd)).is_err() {
                        return ListenEnd::QueueClosed;
                    }
                }
                Ok(Notification::Ready) => debug!("Remote reports ready"),
                Err(e) => warn!(error = %e, "Ignoring notification"),
            },
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Link lost");
                return ListenEnd::Lost;
            }
        }
    }
}

/// Sleep for `duration`; returns false if shutdown was requested meanwhile
fn sleep_unless_shutdown(duration: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        thread::sleep(remaining.min(SHUTDOWN_POLL));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkError;
    use crate::link::AddressType;
    use crossbeam_channel::RecvTimeoutError;
    use deckpilot_protocol::{Command, DeviceAddress, TokenError, Uuid};
    use std::collections::VecDeque;

    type Step = Result<Option<Vec<u8>>, LinkError>;

    struct ScriptedLink(VecDeque<Step>);

    impl NotificationLink for ScriptedLink {
        fn next_notification(&mut self, _timeout: Duration) -> Step {
            self.0
                .pop_front()
                .unwrap_or_else(|| Err(LinkError::LinkLost("script ended".to_string())))
        }
    }

    struct ScriptedCentral(VecDeque<Option<Vec<Step>>>);

    impl Central for ScriptedCentral {
        type Link = ScriptedLink;

        fn connect(&mut self, target: &LinkTarget) -> Result<ScriptedLink, LinkError> {
            match self.0.pop_front() {
                Some(Some(steps)) => Ok(ScriptedLink(steps.into())),
                _ => Err(LinkError::Unreachable {
                    address: target.address.to_string(),
                    reason: "scripted failure".to_string(),
                }),
            }
        }
    }

    fn target() -> LinkTarget {
        LinkTarget {
            address: DeviceAddress::parse("24:6F:28:A1:B2:C3").unwrap(),
            address_type: AddressType::Auto,
            service: Uuid::parse("4fafc201-1fb5-459e-8fcc-c5c9c331914b").unwrap(),
            characteristic: Uuid::parse("beb5483e-36e1-4688-b7f5-ea07361b26a8").unwrap(),
            mtu: 517,
        }
    }

    fn policy(unreachable_after: u32) -> LinkPolicy {
        LinkPolicy {
            backoff_initial_ms: 1,
            backoff_max_ms: 4,
            unreachable_after,
            poll_interval: Duration::from_millis(1),
        }
    }

    fn payload(token: &str) -> Step {
        Ok(Some(token.as_bytes().to_vec()))
    }

    /// Collect inputs until `stop` matches or a timeout passes
    fn collect_until(
        rx: &crossbeam_channel::Receiver<HostInput>,
        stop: HostInput,
    ) -> Vec<HostInput> {
        let mut out = Vec::new();
        loop {
            match rx.recv_timeout(Duration::from_secs(5)) {
                Ok(input) => {
                    let done = input == stop;
                    out.push(input);
                    if done {
                        return out;
                    }
                }
                Err(RecvTimeoutError::Timeout) => panic!("timed out, got {out:?}"),
                Err(RecvTimeoutError::Disconnected) => return out,
            }
        }
    }

    #[test]
    fn test_decode_payload() {
        assert_eq!(
            decode_payload(b"UP").unwrap(),
            Notification::Command(Command::Up)
        );
        let err = decode_payload(b"").unwrap_err();
        assert!(matches!(
            err,
            CommandError::Malformed {
                reason: TokenError::Empty,
                ..
            }
        ));
    }

    #[test]
    fn test_commands_forwarded_in_order_across_reconnect() {
        let central = ScriptedCentral(VecDeque::from([
            None,
            Some(vec![
                payload("Ready"),
                payload("UP"),
                payload("bogus"),
                Ok(None),
                payload("DOWN"),
                Err(LinkError::LinkLost("peer went away".to_string())),
            ]),
            Some(vec![payload("SELECT")]),
        ]));

        let (tx, rx) = crossbeam_channel::unbounded();
        let runner = LinkRunner::spawn(central, target(), policy(1), tx).unwrap();

        let inputs = collect_until(&rx, HostInput::Command(Command::Select));
        runner.shutdown();

        assert_eq!(
            inputs,
            vec![
                HostInput::Link(LinkStatus::Unreachable { failures: 1 }),
                HostInput::Link(LinkStatus::Connected),
                HostInput::Command(Command::Up),
                HostInput::Command(Command::Down),
                HostInput::Link(LinkStatus::Disconnected),
                HostInput::Link(LinkStatus::Connected),
                HostInput::Command(Command::Select),
            ]
        );
    }

    #[test]
    fn test_keeps_retrying_unreachable_device() {
        let central = ScriptedCentral(VecDeque::from([None, None, None, None]));
        let (tx, rx) = crossbeam_channel::unbounded();
        let runner = LinkRunner::spawn(central, target(), policy(3), tx).unwrap();

        let inputs = collect_until(&rx, HostInput::Link(LinkStatus::Unreachable { failures: 3 }));
        assert_eq!(inputs.len(), 1);

        // Still running after the report
        thread::sleep(Duration::from_millis(20));
        assert!(runner.handle.as_ref().is_some_and(|h| !h.is_finished()));
        runner.shutdown();
    }

    #[test]
    fn test_stops_when_queue_closed() {
        let central = ScriptedCentral(VecDeque::from([Some(vec![payload("UP")])]));
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);

        let shutdown = AtomicBool::new(false);
        // Returns instead of spinning once the receiver is gone
        run(central, &target(), &policy(1), &tx, &shutdown);
    }
}
