use std::time::Duration;

use touchwire_bus::BusError;
use touchwire_message::MessageError;

/// Errors surfaced by the message engine.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A bus transaction failed.
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// The inbound byte stream does not parse as a message.
    #[error(transparent)]
    Frame(#[from] MessageError),

    /// The device answered a command with an error status.
    #[error("command 0x{command:02x} failed with status 0x{code:02x}")]
    ErrorStatus { command: u8, code: u8 },

    /// No response arrived within the configured timeout.
    #[error("command 0x{command:02x} timed out after {timeout:?}")]
    Timeout { command: u8, timeout: Duration },

    /// A failed read aborted the command before a response arrived.
    #[error("command 0x{command:02x} aborted before a response arrived")]
    Aborted { command: u8 },

    /// The command payload cannot be described by the 16-bit length field.
    #[error("command payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The raw read destination cannot hold even a chunk header.
    #[error("raw read of {length} bytes is below the 2-byte minimum")]
    RawReadTooShort { length: usize },

    /// A blocking command was issued from the reader context.
    #[error("blocking command issued from the reader context")]
    ReaderContext,

    /// The device did not land in the requested firmware mode.
    #[error("device stayed in mode 0x{mode:02x}")]
    ModeSwitch { mode: u8 },

    /// A response was shorter than the operation requires.
    #[error("response of {got} bytes, need {needed}")]
    ShortResponse { needed: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, CoreError>;
