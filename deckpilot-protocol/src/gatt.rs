//! GATT layout shared by the controller and the host
//!
//! The controller exposes a single service with a single characteristic
//! that supports read, write and notify. The host enables notifications by
//! writing [`CCCD_ENABLE_NOTIFY`] to the Client Characteristic Configuration
//! Descriptor.

/// 16-bit UUID of the Client Characteristic Configuration Descriptor
pub const CCCD_UUID16: u16 = 0x2902;

/// CCCD value that enables notifications (little-endian 0x0001)
pub const CCCD_ENABLE_NOTIFY: [u8; 2] = [0x01, 0x00];

/// ATT MTU both sides negotiate; large enough that no token fragments
pub const ATT_MTU: u16 = 517;

/// Characteristic property bits advertised for the command characteristic
pub mod properties {
    /// Characteristic can be read
    pub const READ: u8 = 0x02;
    /// Characteristic can be written with response
    pub const WRITE: u8 = 0x08;
    /// Characteristic supports notifications
    pub const NOTIFY: u8 = 0x10;

    /// Full property set of the command characteristic
    pub const COMMAND: u8 = READ | WRITE | NOTIFY;
}

/// Returns true if the given property bits allow notifications
pub fn supports_notify(props: u8) -> bool {
    props & properties::NOTIFY != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_properties() {
        assert_eq!(properties::COMMAND, 0x1A);
        assert!(supports_notify(properties::COMMAND));
        assert!(!supports_notify(properties::READ | properties::WRITE));
    }

    #[test]
    fn test_mtu_fits_tokens() {
        // ATT notification overhead is 3 bytes
        assert!(ATT_MTU as usize - 3 >= crate::command::MAX_TOKEN_LEN);
    }
}
