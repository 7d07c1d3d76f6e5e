//! Parsers for `gatttool` output lines
//!
//! ```text
//! attr handle = 0x000c, end grp handle = 0xffff uuid: 4fafc201-1fb5-459e-8fcc-c5c9c331914b
//! handle = 0x000d, char properties = 0x1a, char value handle = 0x000e, uuid = beb5483e-...
//! handle = 0x000f, uuid = 00002902-0000-1000-8000-00805f9b34fb
//! Notification handle = 0x000e value: 55 50
//! ```

use deckpilot_protocol::Uuid;

/// A primary service and its handle range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceRange {
    pub start: u16,
    pub end: u16,
    pub uuid: Uuid,
}

/// A characteristic declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Characteristic {
    pub handle: u16,
    pub properties: u8,
    pub value_handle: u16,
    pub uuid: Uuid,
}

/// A descriptor handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub handle: u16,
    pub uuid: Uuid,
}

/// A notification received while listening
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationLine {
    pub handle: u16,
    pub value: Vec<u8>,
}

/// Value following `key` up to the next comma (or end of line)
fn field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let start = line.find(key)? + key.len();
    let rest = &line[start..];
    let end = rest.find(',').unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn hex_u16(text: &str) -> Option<u16> {
    u16::from_str_radix(text.trim().trim_start_matches("0x"), 16).ok()
}

fn hex_u8(text: &str) -> Option<u8> {
    u8::from_str_radix(text.trim().trim_start_matches("0x"), 16).ok()
}

/// Parse a `--primary` line
pub fn parse_service(line: &str) -> Option<ServiceRange> {
    let start = hex_u16(field(line, "attr handle =")?)?;
    let end_field = field(line, "end grp handle =")?;
    let end = hex_u16(end_field.split_whitespace().next()?)?;
    let uuid = Uuid::parse(line.split("uuid:").nth(1)?).ok()?;
    Some(ServiceRange { start, end, uuid })
}

/// Parse a `--characteristics` line
pub fn parse_characteristic(line: &str) -> Option<Characteristic> {
    Some(Characteristic {
        handle: hex_u16(field(line, "handle =")?)?,
        properties: hex_u8(field(line, "char properties =")?)?,
        value_handle: hex_u16(field(line, "char value handle =")?)?,
        uuid: Uuid::parse(field(line, "uuid =")?).ok()?,
    })
}

/// Parse a `--char-desc` line
pub fn parse_descriptor(line: &str) -> Option<Descriptor> {
    Some(Descriptor {
        handle: hex_u16(field(line, "handle =")?)?,
        uuid: Uuid::parse(field(line, "uuid =")?).ok()?,
    })
}

/// Parse a notification line printed by `--listen`
pub fn parse_notification(line: &str) -> Option<NotificationLine> {
    let rest = line.trim().strip_prefix("Notification handle =")?;
    let (handle, value) = rest.split_once("value:")?;
    let handle = hex_u16(handle)?;
    let value = value
        .split_whitespace()
        .map(hex_u8)
        .collect::<Option<Vec<u8>>>()?;
    Some(NotificationLine { handle, value })
}

/// Check for the acknowledgement of a `--char-write-req`
pub fn is_write_ack(line: &str) -> bool {
    line.contains("Characteristic value was written successfully")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE: &str = "4fafc201-1fb5-459e-8fcc-c5c9c331914b";
    const CHAR: &str = "beb5483e-36e1-4688-b7f5-ea07361b26a8";

    #[test]
    fn test_parse_service() {
        let line = format!("attr handle = 0x000c, end grp handle = 0xffff uuid: {SERVICE}");
        let service = parse_service(&line).unwrap();
        assert_eq!(service.start, 0x000c);
        assert_eq!(service.end, 0xffff);
        assert_eq!(service.uuid, Uuid::parse(SERVICE).unwrap());
    }

    #[test]
    fn test_parse_characteristic() {
        let line = format!(
            "handle = 0x000d, char properties = 0x1a, char value handle = 0x000e, uuid = {CHAR}"
        );
        let c = parse_characteristic(&line).unwrap();
        assert_eq!(c.handle, 0x000d);
        assert_eq!(c.properties, 0x1a);
        assert_eq!(c.value_handle, 0x000e);
        assert_eq!(c.uuid, Uuid::parse(CHAR).unwrap());
    }

    #[test]
    fn test_parse_descriptor() {
        let d = parse_descriptor("handle = 0x000f, uuid = 00002902-0000-1000-8000-00805f9b34fb")
            .unwrap();
        assert_eq!(d.handle, 0x000f);
        assert_eq!(d.uuid.as_u16(), Some(0x2902));
    }

    #[test]
    fn test_parse_notification() {
        let n = parse_notification("Notification handle = 0x000e value: 53 45 4c 45 43 54 ")
            .unwrap();
        assert_eq!(n.handle, 0x000e);
        assert_eq!(n.value, b"SELECT");
    }

    #[test]
    fn test_rejects_other_lines() {
        assert_eq!(parse_notification("Characteristic value was written successfully"), None);
        assert_eq!(parse_notification("Notification handle = 0x000e value: zz"), None);
        assert_eq!(parse_characteristic("Connecting to 24:6F:28:A1:B2:C3"), None);
        assert!(is_write_ack("Characteristic value was written successfully"));
    }
}
