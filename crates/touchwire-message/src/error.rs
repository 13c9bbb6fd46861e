/// Errors that can occur while parsing wire messages.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The chunk does not start with the message marker.
    #[error("invalid message marker (expected 0xa5, found 0x{found:02x})")]
    InvalidMarker { found: u8 },

    /// The byte closing a complete message is not the padding sentinel.
    #[error("invalid message padding (expected 0x5a, found 0x{found:02x})")]
    InvalidPadding { found: u8 },

    /// A continuation chunk carried a code other than CONTINUED_READ.
    #[error("unexpected code 0x{code:02x} in continuation chunk")]
    UnexpectedContinuation { code: u8 },

    /// Fewer bytes than the structure requires.
    #[error("truncated message ({got} bytes, need {needed})")]
    Truncated { needed: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, MessageError>;
