//! Status, report, and command code tables.
//!
//! The code byte of an inbound message selects its class: values below
//! `REPORT_IDENTIFY` are response status codes, values at or above it are
//! asynchronous report identifiers. `STATUS_INVALID` (0xFF) numerically
//! falls in report space; the read path handles it as a status first.

/// Nothing to report; the length field of an idle frame is meaningless.
pub const STATUS_IDLE: u8 = 0x00;

/// Successful response to the outstanding command.
pub const STATUS_OK: u8 = 0x01;

/// The device is still processing; the length field is meaningless.
pub const STATUS_BUSY: u8 = 0x02;

/// Continuation chunk of a message already in flight.
pub const STATUS_CONTINUED_READ: u8 = 0x03;

/// The command overflowed the device's receive buffer.
pub const STATUS_RECEIVE_BUFFER_OVERFLOW: u8 = 0x0C;

/// A command arrived while the previous one was still pending.
pub const STATUS_PREVIOUS_COMMAND_PENDING: u8 = 0x0D;

/// The device does not implement the command.
pub const STATUS_NOT_IMPLEMENTED: u8 = 0x0E;

/// The command failed.
pub const STATUS_ERROR: u8 = 0x0F;

/// No valid message; also preset as the response code before each command.
pub const STATUS_INVALID: u8 = 0xFF;

/// Identification report sent after every device reset.
pub const REPORT_IDENTIFY: u8 = 0x10;

/// Touch input report.
pub const REPORT_TOUCH: u8 = 0x11;

/// Delta capacitance image report.
pub const REPORT_DELTA: u8 = 0x12;

/// Raw capacitance image report.
pub const REPORT_RAW: u8 = 0x13;

/// Host-side checkpoint dispatched when a romboot host download is being
/// requested. Never produced by the device.
pub const REPORT_ROMBOOT_HOST_DOWNLOAD: u8 = 0xFE;

/// No command outstanding.
pub const CMD_NONE: u8 = 0x00;

/// Continuation chunk of a command already in flight.
pub const CMD_CONTINUE_WRITE: u8 = 0x01;

/// Request the identification structure.
pub const CMD_IDENTIFY: u8 = 0x02;

/// Software reset; answered by an identify report, not a response.
pub const CMD_RESET: u8 = 0x04;

/// Enable an asynchronous report by id.
pub const CMD_ENABLE_REPORT: u8 = 0x05;

/// Disable an asynchronous report by id.
pub const CMD_DISABLE_REPORT: u8 = 0x06;

/// Request the bootloader information structure.
pub const CMD_GET_BOOT_INFO: u8 = 0x10;

/// Switch to the application firmware; the device resets.
pub const CMD_RUN_APPLICATION_FIRMWARE: u8 = 0x14;

/// Switch to the bootloader; the device resets.
pub const CMD_RUN_BOOTLOADER_FIRMWARE: u8 = 0x1F;

/// Request the application information structure.
pub const CMD_GET_APPLICATION_INFO: u8 = 0x20;

/// Read a runtime configuration value.
pub const CMD_GET_DYNAMIC_CONFIG: u8 = 0x23;

/// Write a runtime configuration value.
pub const CMD_SET_DYNAMIC_CONFIG: u8 = 0x24;

/// Re-baseline the capacitance sensing.
pub const CMD_REZERO: u8 = 0x27;

/// Enter the low-power deep sleep state.
pub const CMD_ENTER_DEEP_SLEEP: u8 = 0x2C;

/// Leave the low-power deep sleep state.
pub const CMD_EXIT_DEEP_SLEEP: u8 = 0x2D;

/// Switch to the production test firmware; the device resets.
pub const CMD_ENTER_PRODUCTION_TEST_MODE: u8 = 0x31;

/// Switch to the rom bootloader; the device resets.
pub const CMD_ROMBOOT_RUN_BOOTLOADER_FIRMWARE: u8 = 0x40;

/// Stream a host-download image block to the rom bootloader.
pub const CMD_ROMBOOT_DOWNLOAD: u8 = 0x45;

/// Application firmware is running.
pub const MODE_APPLICATION_FIRMWARE: u8 = 0x01;

/// Host-downloaded application firmware is running.
pub const MODE_HOSTDOWNLOAD_FIRMWARE: u8 = 0x02;

/// Rom bootloader is running.
pub const MODE_ROMBOOTLOADER: u8 = 0x04;

/// Flash bootloader is running.
pub const MODE_BOOTLOADER: u8 = 0x0B;

/// TDDI flash bootloader is running.
pub const MODE_TDDI_BOOTLOADER: u8 = 0x0C;

/// TDDI host-download bootloader is running.
pub const MODE_TDDI_HOSTDOWNLOAD: u8 = 0x0D;

/// Production test firmware is running.
pub const MODE_PRODUCTION_TEST: u8 = 0x0E;

/// Runtime configuration knobs addressed by GET/SET_DYNAMIC_CONFIG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DynamicConfigId {
    NoDoze = 0x01,
    DisableNoiseMitigation = 0x02,
    InhibitFrequencyShift = 0x03,
    RequestedFrequency = 0x04,
    DisableHsync = 0x05,
    RezeroOnExitDeepSleep = 0x06,
    ChargerConnected = 0x07,
    NoBaselineRelaxation = 0x08,
    InWakeupGestureMode = 0x09,
    StimulusFingers = 0x0A,
    GripSuppressionEnabled = 0x0B,
    EnableThickGlove = 0x0C,
    EnableGlove = 0x0D,
}

/// True if the code byte identifies an asynchronous report rather than a
/// response status. Note that `STATUS_INVALID` lands here as well; the
/// read path intercepts it before routing.
pub fn is_report(code: u8) -> bool {
    code >= REPORT_IDENTIFY
}

/// True if the code byte is a status the read path handles inline.
pub fn is_status(code: u8) -> bool {
    code <= STATUS_ERROR || code == STATUS_INVALID
}

/// True if the mode byte indicates running firmware (application image).
pub fn is_firmware_mode(mode: u8) -> bool {
    mode == MODE_APPLICATION_FIRMWARE || mode == MODE_HOSTDOWNLOAD_FIRMWARE
}

/// Commands that intentionally reset the device. The identify report that
/// follows the reset completes them successfully in place of a response.
pub fn expects_reset(command: u8) -> bool {
    matches!(
        command,
        CMD_RESET
            | CMD_RUN_BOOTLOADER_FIRMWARE
            | CMD_RUN_APPLICATION_FIRMWARE
            | CMD_ENTER_PRODUCTION_TEST_MODE
            | CMD_ROMBOOT_RUN_BOOTLOADER_FIRMWARE
    )
}

/// Returns a human-readable name for a status code.
pub fn status_name(code: u8) -> &'static str {
    match code {
        STATUS_IDLE => "IDLE",
        STATUS_OK => "OK",
        STATUS_BUSY => "BUSY",
        STATUS_CONTINUED_READ => "CONTINUED_READ",
        STATUS_RECEIVE_BUFFER_OVERFLOW => "RECEIVE_BUFFER_OVERFLOW",
        STATUS_PREVIOUS_COMMAND_PENDING => "PREVIOUS_COMMAND_PENDING",
        STATUS_NOT_IMPLEMENTED => "NOT_IMPLEMENTED",
        STATUS_ERROR => "ERROR",
        STATUS_INVALID => "INVALID",
        _ => "UNKNOWN",
    }
}

/// Returns a human-readable name for a report id.
pub fn report_name(code: u8) -> &'static str {
    match code {
        REPORT_IDENTIFY => "IDENTIFY",
        REPORT_TOUCH => "TOUCH",
        REPORT_DELTA => "DELTA",
        REPORT_RAW => "RAW",
        REPORT_ROMBOOT_HOST_DOWNLOAD => "ROMBOOT_HOST_DOWNLOAD",
        _ => "UNKNOWN",
    }
}

/// Returns a human-readable name for a command opcode.
pub fn command_name(command: u8) -> &'static str {
    match command {
        CMD_NONE => "NONE",
        CMD_CONTINUE_WRITE => "CONTINUE_WRITE",
        CMD_IDENTIFY => "IDENTIFY",
        CMD_RESET => "RESET",
        CMD_ENABLE_REPORT => "ENABLE_REPORT",
        CMD_DISABLE_REPORT => "DISABLE_REPORT",
        CMD_GET_BOOT_INFO => "GET_BOOT_INFO",
        CMD_RUN_APPLICATION_FIRMWARE => "RUN_APPLICATION_FIRMWARE",
        CMD_RUN_BOOTLOADER_FIRMWARE => "RUN_BOOTLOADER_FIRMWARE",
        CMD_GET_APPLICATION_INFO => "GET_APPLICATION_INFO",
        CMD_GET_DYNAMIC_CONFIG => "GET_DYNAMIC_CONFIG",
        CMD_SET_DYNAMIC_CONFIG => "SET_DYNAMIC_CONFIG",
        CMD_REZERO => "REZERO",
        CMD_ENTER_DEEP_SLEEP => "ENTER_DEEP_SLEEP",
        CMD_EXIT_DEEP_SLEEP => "EXIT_DEEP_SLEEP",
        CMD_ENTER_PRODUCTION_TEST_MODE => "ENTER_PRODUCTION_TEST_MODE",
        CMD_ROMBOOT_RUN_BOOTLOADER_FIRMWARE => "ROMBOOT_RUN_BOOTLOADER_FIRMWARE",
        CMD_ROMBOOT_DOWNLOAD => "ROMBOOT_DOWNLOAD",
        _ => "UNKNOWN",
    }
}

/// Returns a human-readable name for a firmware mode.
pub fn mode_name(mode: u8) -> &'static str {
    match mode {
        MODE_APPLICATION_FIRMWARE => "APPLICATION_FIRMWARE",
        MODE_HOSTDOWNLOAD_FIRMWARE => "HOSTDOWNLOAD_FIRMWARE",
        MODE_ROMBOOTLOADER => "ROMBOOTLOADER",
        MODE_BOOTLOADER => "BOOTLOADER",
        MODE_TDDI_BOOTLOADER => "TDDI_BOOTLOADER",
        MODE_TDDI_HOSTDOWNLOAD => "TDDI_HOSTDOWNLOAD",
        MODE_PRODUCTION_TEST => "PRODUCTION_TEST",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_threshold() {
        assert!(!is_report(STATUS_ERROR));
        assert!(is_report(REPORT_IDENTIFY));
        assert!(is_report(REPORT_TOUCH));
        // INVALID numerically falls in report space.
        assert!(is_report(STATUS_INVALID));
        assert!(is_status(STATUS_INVALID));
        assert!(!is_status(REPORT_TOUCH));
    }

    #[test]
    fn test_expected_reset_commands() {
        assert!(expects_reset(CMD_RESET));
        assert!(expects_reset(CMD_RUN_APPLICATION_FIRMWARE));
        assert!(expects_reset(CMD_RUN_BOOTLOADER_FIRMWARE));
        assert!(expects_reset(CMD_ENTER_PRODUCTION_TEST_MODE));
        assert!(expects_reset(CMD_ROMBOOT_RUN_BOOTLOADER_FIRMWARE));
        assert!(!expects_reset(CMD_IDENTIFY));
        assert!(!expects_reset(CMD_REZERO));
    }

    #[test]
    fn test_firmware_modes() {
        assert!(is_firmware_mode(MODE_APPLICATION_FIRMWARE));
        assert!(is_firmware_mode(MODE_HOSTDOWNLOAD_FIRMWARE));
        assert!(!is_firmware_mode(MODE_BOOTLOADER));
        assert!(!is_firmware_mode(MODE_ROMBOOTLOADER));
    }

    #[test]
    fn test_names() {
        assert_eq!(status_name(STATUS_OK), "OK");
        assert_eq!(report_name(REPORT_TOUCH), "TOUCH");
        assert_eq!(command_name(CMD_IDENTIFY), "IDENTIFY");
        assert_eq!(mode_name(MODE_APPLICATION_FIRMWARE), "APPLICATION_FIRMWARE");
        assert_eq!(status_name(0x42), "UNKNOWN");
    }
}
