use crate::error::{MessageError, Result};

/// Message header: marker (1) + code (1) + payload length (2 LE) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Leading sentinel of every inbound chunk.
pub const MESSAGE_MARKER: u8 = 0xA5;

/// Trailing sentinel closing every complete inbound message.
pub const MESSAGE_PADDING: u8 = 0x5A;

/// Parsed inbound message header.
///
/// Wire format of a complete message:
/// ```text
/// ┌────────────┬──────────┬─────────────┬──────────────────┬─────────────┐
/// │ Marker (1B)│ Code (1B)│ Length      │ Payload          │ Padding (1B)│
/// │ 0xA5       │          │ (2B LE)     │ (Length bytes)   │ 0x5A        │
/// └────────────┴──────────┴─────────────┴──────────────────┴─────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Status or report code.
    pub code: u8,
    /// Declared payload length in bytes.
    pub payload_length: usize,
}

impl MessageHeader {
    /// Parse the header from the first bytes of an inbound chunk.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(MessageError::Truncated {
                needed: HEADER_SIZE,
                got: buf.len(),
            });
        }
        if buf[0] != MESSAGE_MARKER {
            return Err(MessageError::InvalidMarker { found: buf[0] });
        }
        let payload_length = u16::from_le_bytes([buf[2], buf[3]]) as usize;
        Ok(Self {
            code: buf[1],
            payload_length,
        })
    }

    /// Total wire length of the message: header + payload + padding byte.
    pub fn total_length(&self) -> usize {
        HEADER_SIZE + self.payload_length + 1
    }

    /// Encode the header bytes, e.g. to re-synthesize the header over a
    /// reassembled message after a continued read.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let len = (self.payload_length as u16).to_le_bytes();
        [MESSAGE_MARKER, self.code, len[0], len[1]]
    }
}

/// Validate the padding byte that closes a complete message.
pub fn check_padding(byte: u8) -> Result<()> {
    if byte != MESSAGE_PADDING {
        return Err(MessageError::InvalidPadding { found: byte });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{REPORT_TOUCH, STATUS_OK};

    #[test]
    fn test_parse_valid_header() {
        let buf = [MESSAGE_MARKER, STATUS_OK, 0x34, 0x12];
        let header = MessageHeader::parse(&buf).unwrap();
        assert_eq!(header.code, STATUS_OK);
        assert_eq!(header.payload_length, 0x1234);
        assert_eq!(header.total_length(), 4 + 0x1234 + 1);
    }

    #[test]
    fn test_parse_invalid_marker() {
        let buf = [0x00, STATUS_OK, 0x00, 0x00];
        let result = MessageHeader::parse(&buf);
        assert!(matches!(
            result,
            Err(MessageError::InvalidMarker { found: 0x00 })
        ));
    }

    #[test]
    fn test_parse_truncated() {
        let buf = [MESSAGE_MARKER, STATUS_OK];
        let result = MessageHeader::parse(&buf);
        assert!(matches!(
            result,
            Err(MessageError::Truncated { needed: 4, got: 2 })
        ));
    }

    #[test]
    fn test_encode_roundtrip() {
        let header = MessageHeader {
            code: REPORT_TOUCH,
            payload_length: 300,
        };
        let bytes = header.encode();
        let reparsed = MessageHeader::parse(&bytes).unwrap();
        assert_eq!(reparsed, header);
    }

    #[test]
    fn test_check_padding() {
        assert!(check_padding(MESSAGE_PADDING).is_ok());
        assert!(matches!(
            check_padding(0x00),
            Err(MessageError::InvalidPadding { found: 0x00 })
        ));
    }
}
