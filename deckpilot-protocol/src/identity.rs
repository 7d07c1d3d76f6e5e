//! Device identity: Bluetooth addresses and UUIDs
//!
//! Both values are deployment-time configuration. They are parsed once at
//! startup; a value that does not parse is a fatal configuration error.

use core::fmt;

/// Errors from parsing identity strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdentityError {
    /// Wrong number of groups or digits
    InvalidLength,
    /// A character that is not a hex digit (or separator)
    InvalidDigit,
}

/// 48-bit Bluetooth device address, most significant octet first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceAddress(pub [u8; 6]);

impl DeviceAddress {
    /// Parse `AA:BB:CC:DD:EE:FF` (`-` is accepted as separator too)
    pub fn parse(text: &str) -> Result<Self, IdentityError> {
        let mut octets = [0u8; 6];
        let mut count = 0;

        for group in text.trim().split(|c| c == ':' || c == '-') {
            if count == octets.len() || group.len() != 2 {
                return Err(IdentityError::InvalidLength);
            }
            octets[count] = parse_hex_u8(group)?;
            count += 1;
        }

        if count != octets.len() {
            return Err(IdentityError::InvalidLength);
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

/// Bluetooth SIG base UUID (0000xxxx-0000-1000-8000-00805F9B34FB)
const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

/// 128-bit UUID
///
/// 16-bit short forms are expanded against the Bluetooth base UUID so that
/// `2902` and `00002902-0000-1000-8000-00805f9b34fb` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uuid(uuid::Uuid);

impl Uuid {
    /// Expand a 16-bit assigned number
    pub const fn from_u16(short: u16) -> Self {
        Self(uuid::Uuid::from_u128(BASE_UUID | ((short as u128) << 96)))
    }

    /// Parse either a 4-digit short UUID or the canonical 8-4-4-4-12 form
    pub fn parse(text: &str) -> Result<Self, IdentityError> {
        let text = text.trim();

        if text.len() == 4 {
            if !text.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(IdentityError::InvalidDigit);
            }
            let short = u16::from_str_radix(text, 16).map_err(|_| IdentityError::InvalidDigit)?;
            return Ok(Self::from_u16(short));
        }

        // Only the hyphenated form; uuid also takes simple, braced and urn
        if text.len() != 36 {
            return Err(IdentityError::InvalidLength);
        }
        uuid::Uuid::try_parse(text)
            .map(Self)
            .map_err(|_| IdentityError::InvalidDigit)
    }

    /// Returns the 16-bit short form if this UUID lies on the base UUID
    pub fn as_u16(&self) -> Option<u16> {
        let value = self.0.as_u128();
        let short = (value >> 96) as u32;
        if short <= u16::MAX as u32 && value & !(0xFFFF_u128 << 96) == BASE_UUID {
            Some(short as u16)
        } else {
            None
        }
    }

    pub fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }
}

impl From<uuid::Uuid> for Uuid {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Uuid {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=u128:x}", self.0.as_u128())
    }
}

fn parse_hex_u8(pair: &str) -> Result<u8, IdentityError> {
    if pair.len() != 2 {
        return Err(IdentityError::InvalidLength);
    }
    if !pair.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(IdentityError::InvalidDigit);
    }
    u8::from_str_radix(pair, 16).map_err(|_| IdentityError::InvalidDigit)
}
