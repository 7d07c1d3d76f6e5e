use deckpilot_protocol::{DeviceAddress, Uuid, ATT_MTU};

use super::HostConfig;
use crate::error::ConfigError;
use crate::link::LinkTarget;

impl HostConfig {
    /// Check every value once, before anything is started
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.link_target()?;

        if crate::logging::parse_level(&self.logging.level).is_none() {
            return Err(ConfigError::InvalidLogLevel {
                value: self.logging.level.clone(),
            });
        }

        // The remote's link requires the full notification MTU
        if self.device.mtu < ATT_MTU {
            return Err(ConfigError::Invalid(format!(
                "device.mtu must be at least {ATT_MTU}, got {}",
                self.device.mtu
            )));
        }
        if self.link.backoff_initial_ms == 0 {
            return Err(ConfigError::Invalid(
                "link.backoff_initial_ms must be non-zero".to_string(),
            ));
        }
        if self.link.backoff_max_ms < self.link.backoff_initial_ms {
            return Err(ConfigError::Invalid(format!(
                "link.backoff_max_ms ({}) must not be below link.backoff_initial_ms ({})",
                self.link.backoff_max_ms, self.link.backoff_initial_ms
            )));
        }
        if self.link.unreachable_after == 0 {
            return Err(ConfigError::Invalid(
                "link.unreachable_after must be non-zero".to_string(),
            ));
        }
        if self.link.poll_interval_ms == 0 || self.link.subscribe_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "link.poll_interval_ms and link.subscribe_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.render.width == 0 || self.render.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "render size must be non-zero, got {}x{}",
                self.render.width, self.render.height
            )));
        }
        if self.cache.max_entries == 0 || self.cache.max_bytes == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_entries and cache.max_bytes must be non-zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse the device identity
    pub fn link_target(&self) -> Result<LinkTarget, ConfigError> {
        let device = &self.device;

        let address =
            DeviceAddress::parse(&device.address).map_err(|_| ConfigError::InvalidAddress {
                value: device.address.clone(),
            })?;
        let service = Uuid::parse(&device.service_uuid).map_err(|_| ConfigError::InvalidUuid {
            field: "service_uuid",
            value: device.service_uuid.clone(),
        })?;
        let characteristic =
            Uuid::parse(&device.characteristic_uuid).map_err(|_| ConfigError::InvalidUuid {
                field: "characteristic_uuid",
                value: device.characteristic_uuid.clone(),
            })?;

        Ok(LinkTarget {
            address,
            address_type: device.address_type,
            service,
            characteristic,
            mtu: device.mtu,
        })
    }
}
