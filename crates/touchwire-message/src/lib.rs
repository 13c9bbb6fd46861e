//! Wire message format for marker-framed touch-controller protocols.
//!
//! Every inbound message is framed with:
//! - A 1-byte marker (0xA5) for bus synchronization
//! - A 1-byte status or report code
//! - A 2-byte little-endian payload length
//! - The payload, closed by a 1-byte padding sentinel (0x5A)
//!
//! Outbound commands carry no marker: the first chunk of a write is the
//! opcode followed by a 2-byte little-endian payload length; follow-on
//! chunks are re-prefixed with the CONTINUE_WRITE opcode. Inbound messages
//! larger than one read chunk continue in chunks re-prefixed with the
//! marker and the CONTINUED_READ status.

pub mod codes;
pub mod error;
pub mod header;
pub mod info;

pub use error::{MessageError, Result};
pub use header::{MessageHeader, HEADER_SIZE, MESSAGE_MARKER, MESSAGE_PADDING};
pub use info::{
    AppStatus, ApplicationInfo, BootInfo, Identification, APPLICATION_INFO_SIZE, BOOT_INFO_SIZE,
    IDENTIFICATION_SIZE,
};
