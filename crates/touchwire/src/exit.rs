use std::fmt;

use touchwire_core::CoreError;

// Exit code constants shared across subcommands.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const BUS_ERROR: i32 = 3;
pub const CHECK_FAILED: i32 = 30;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn core_error(context: &str, err: CoreError) -> CliError {
    let code = match &err {
        CoreError::Bus(_) => BUS_ERROR,
        CoreError::Frame(_) => DATA_INVALID,
        CoreError::Timeout { .. } => TIMEOUT,
        CoreError::ErrorStatus { .. }
        | CoreError::Aborted { .. }
        | CoreError::ModeSwitch { .. } => FAILURE,
        CoreError::PayloadTooLarge { .. } | CoreError::RawReadTooShort { .. } => USAGE,
        CoreError::ShortResponse { .. } => DATA_INVALID,
        CoreError::ReaderContext => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn timeout_maps_to_timeout_code() {
        let err = core_error(
            "identify failed",
            CoreError::Timeout {
                command: 0x02,
                timeout: Duration::from_secs(3),
            },
        );
        assert_eq!(err.code, TIMEOUT);
        assert!(err.message.starts_with("identify failed: "));
    }

    #[test]
    fn bus_failure_maps_to_bus_code() {
        let err = core_error(
            "read failed",
            CoreError::Bus(touchwire_bus::BusError::Detached),
        );
        assert_eq!(err.code, BUS_ERROR);
    }
}
