//! BLE central backed by BlueZ `gatttool`
//!
//! Discovery runs `gatttool` in one-shot mode (`--primary`,
//! `--characteristics`, `--char-desc`); the subscription is a long-lived
//! `--char-write-req ... --listen` child whose stdout is read on a separate
//! thread and handed over through a channel.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use deckpilot_protocol::gatt::supports_notify;
use deckpilot_protocol::{Uuid, CCCD_ENABLE_NOTIFY, CCCD_UUID16};
use tracing::{debug, info, trace, warn};

use super::parse::{
    is_write_ack, parse_characteristic, parse_descriptor, parse_notification, parse_service,
    Characteristic, ServiceRange,
};
use super::{AddressType, Central, LinkTarget, NotificationLink};
use crate::error::LinkError;

/// Attempts at enabling notifications before the connection counts as failed
pub const SUBSCRIBE_ATTEMPTS: u32 = 3;

/// Spacing between subscription attempts
pub const SUBSCRIBE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// `gatttool`-backed central
#[derive(Debug, Clone)]
pub struct GatttoolCentral {
    program: String,
    subscribe_timeout: Duration,
}

impl GatttoolCentral {
    pub fn new(program: impl Into<String>, subscribe_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            subscribe_timeout,
        }
    }

    fn base_args(target: &LinkTarget, address_type: AddressType) -> Vec<String> {
        vec![
            "-b".to_string(),
            target.address.to_string(),
            "-t".to_string(),
            address_type.as_str().to_string(),
        ]
    }

    /// Run a one-shot `gatttool` command and return its stdout
    fn run(
        &self,
        target: &LinkTarget,
        address_type: AddressType,
        extra: &[String],
    ) -> Result<String, LinkError> {
        let mut args = Self::base_args(target, address_type);
        args.extend_from_slice(extra);
        trace!(program = %self.program, ?args, "Running gatttool");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| LinkError::Spawn {
                tool: self.program.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() || stderr.contains("error") {
            return Err(LinkError::Unreachable {
                address: target.address.to_string(),
                reason: format!("{} ({})", stderr.trim(), output.status),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn find_service(
        &self,
        target: &LinkTarget,
        address_type: AddressType,
    ) -> Result<ServiceRange, LinkError> {
        let out = self.run(target, address_type, &["--primary".to_string()])?;
        out.lines()
            .filter_map(parse_service)
            .find(|s| s.uuid == target.service)
            .ok_or_else(|| LinkError::Discovery(format!("service {} not found", target.service)))
    }

    fn find_characteristic(
        &self,
        target: &LinkTarget,
        address_type: AddressType,
        service: &ServiceRange,
    ) -> Result<Characteristic, LinkError> {
        let args = [
            "--characteristics".to_string(),
            "-s".to_string(),
            format!("0x{:04x}", service.start),
            "-e".to_string(),
            format!("0x{:04x}", service.end),
        ];
        let out = self.run(target, address_type, &args)?;
        let characteristic = out
            .lines()
            .filter_map(parse_characteristic)
            .find(|c| c.uuid == target.characteristic)
            .ok_or_else(|| {
                LinkError::Discovery(format!(
                    "characteristic {} not found",
                    target.characteristic
                ))
            })?;

        if !supports_notify(characteristic.properties) {
            return Err(LinkError::Discovery(format!(
                "characteristic {} does not support notify (properties 0x{:02x})",
                target.characteristic, characteristic.properties
            )));
        }
        Ok(characteristic)
    }

    /// Locate the CCCD after the value handle, falling back to value + 1
    fn find_cccd(
        &self,
        target: &LinkTarget,
        address_type: AddressType,
        characteristic: &Characteristic,
        service: &ServiceRange,
    ) -> u16 {
        let fallback = characteristic.value_handle.saturating_add(1);
        let args = [
            "--char-desc".to_string(),
            "-s".to_string(),
            format!("0x{:04x}", fallback),
            "-e".to_string(),
            format!("0x{:04x}", service.end),
        ];

        let cccd = Uuid::from_u16(CCCD_UUID16);
        match self.run(target, address_type, &args) {
            Ok(out) => {
                if let Some(desc) = out
                    .lines()
                    .filter_map(parse_descriptor)
                    .find(|d| d.uuid == cccd)
                {
                    debug!(handle = desc.handle, "Found CCCD descriptor");
                    return desc.handle;
                }
                info!(handle = fallback, "CCCD not found, using value handle + 1");
            }
            Err(e) => {
                warn!(
                    error = %e,
                    handle = fallback,
                    "Descriptor discovery failed, using value handle + 1"
                );
            }
        }
        fallback
    }

    /// Start the listening child and wait for the CCCD write to be acknowledged
    fn listen(
        &self,
        target: &LinkTarget,
        address_type: AddressType,
        cccd: u16,
        value_handle: u16,
    ) -> Result<GatttoolLink, String> {
        let enable: String = CCCD_ENABLE_NOTIFY.iter().map(|b| format!("{b:02x}")).collect();

        let mut args = Self::base_args(target, address_type);
        args.extend([
            "-m".to_string(),
            target.mtu.to_string(),
            "--char-write-req".to_string(),
            "-a".to_string(),
            format!("0x{:04x}", cccd),
            "-n".to_string(),
            enable,
            "--listen".to_string(),
        ]);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to spawn {}: {e}", self.program))?;

        let stdout = child.stdout.take().ok_or("failed to capture stdout")?;
        let stderr = child.stderr.take().ok_or("failed to capture stderr")?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let tx_err = tx.clone();

        thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        thread::spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                if !line.trim().is_empty() && tx_err.send(line).is_err() {
                    break;
                }
            }
        });

        let mut link = GatttoolLink {
            child,
            lines: rx,
            value_handle,
        };

        let deadline = Instant::now() + self.subscribe_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match link.lines.recv_timeout(remaining) {
                Ok(line) if is_write_ack(&line) => return Ok(link),
                Ok(line) if line.to_ascii_lowercase().contains("error") => {
                    return Err(line);
                }
                Ok(line) => trace!(%line, "gatttool"),
                Err(RecvTimeoutError::Timeout) => {
                    return Err("timed out waiting for CCCD write".to_string())
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err("gatttool exited before subscribing".to_string())
                }
            }
        }
    }

    fn connect_with(
        &self,
        target: &LinkTarget,
        address_type: AddressType,
    ) -> Result<GatttoolLink, LinkError> {
        let service = self.find_service(target, address_type)?;
        let characteristic = self.find_characteristic(target, address_type, &service)?;
        let cccd = self.find_cccd(target, address_type, &characteristic, &service);

        for attempt in 1..=SUBSCRIBE_ATTEMPTS {
            info!(handle = cccd, attempt, "Enabling notifications");
            match self.listen(target, address_type, cccd, characteristic.value_handle) {
                Ok(link) => {
                    info!(%address_type, "Notifications enabled");
                    return Ok(link);
                }
                Err(reason) => {
                    warn!(attempt, %reason, "Failed to enable notifications");
                    if attempt < SUBSCRIBE_ATTEMPTS {
                        thread::sleep(SUBSCRIBE_RETRY_DELAY);
                    }
                }
            }
        }

        Err(LinkError::Subscribe {
            attempts: SUBSCRIBE_ATTEMPTS,
        })
    }
}

impl Central for GatttoolCentral {
    type Link = GatttoolLink;

    fn connect(&mut self, target: &LinkTarget) -> Result<GatttoolLink, LinkError> {
        let mut last_error = None;

        for &address_type in target.address_type.candidates() {
            debug!(address = %target.address, %address_type, "Connecting");
            match self.connect_with(target, address_type) {
                Ok(link) => return Ok(link),
                Err(e) => {
                    debug!(%address_type, error = %e, "Connection attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LinkError::Unreachable {
            address: target.address.to_string(),
            reason: "no address type to try".to_string(),
        }))
    }
}

/// Subscribed `gatttool --listen` child
pub struct GatttoolLink {
    child: Child,
    lines: Receiver<String>,
    value_handle: u16,
}

impl NotificationLink for GatttoolLink {
    fn next_notification(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, LinkError> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) => match parse_notification(&line) {
                    Some(n) if n.handle == self.value_handle => return Ok(Some(n.value)),
                    Some(n) => trace!(handle = n.handle, "Notification on another handle"),
                    None => debug!(%line, "gatttool"),
                },
                Err(RecvTimeoutError::Timeout) => {
                    return match self.child.try_wait() {
                        Ok(Some(status)) => {
                            Err(LinkError::LinkLost(format!("gatttool exited with {status}")))
                        }
                        Ok(None) => Ok(None),
                        Err(e) => Err(LinkError::LinkLost(e.to_string())),
                    };
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(LinkError::LinkLost("gatttool output closed".to_string()));
                }
            }
        }
    }
}

impl Drop for GatttoolLink {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
