//! Device information structures carried in command responses.
//!
//! The device reports a partially filled structure while still booting, so
//! decoding zero-extends short payloads instead of failing.

use bytes::{Buf, BufMut};

/// Size of the identification payload.
pub const IDENTIFICATION_SIZE: usize = 24;

/// Size of the full application-info payload.
pub const APPLICATION_INFO_SIZE: usize = 44;

/// Size of the boot-info payload.
pub const BOOT_INFO_SIZE: usize = 10;

/// Identification structure, reported by the IDENTIFY command and by the
/// identify report that follows every device reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Identification {
    /// Protocol version.
    pub version: u8,
    /// Current firmware mode (MODE_* constant).
    pub mode: u8,
    /// ASCII part number, NUL-padded.
    pub part_number: [u8; 16],
    /// Firmware build id.
    pub build_id: u32,
    /// Largest write the device accepts, in bytes. Zero means unbounded.
    pub max_write_size: u16,
}

impl Identification {
    /// Decode from a response payload, zero-extending short payloads.
    pub fn from_payload(payload: &[u8]) -> Self {
        let mut image = [0u8; IDENTIFICATION_SIZE];
        let n = payload.len().min(IDENTIFICATION_SIZE);
        image[..n].copy_from_slice(&payload[..n]);

        let mut buf = &image[..];
        let version = buf.get_u8();
        let mode = buf.get_u8();
        let mut part_number = [0u8; 16];
        buf.copy_to_slice(&mut part_number);
        Self {
            version,
            mode,
            part_number,
            build_id: buf.get_u32_le(),
            max_write_size: buf.get_u16_le(),
        }
    }

    /// Encode into the wire payload.
    pub fn encode(&self) -> [u8; IDENTIFICATION_SIZE] {
        let mut out = [0u8; IDENTIFICATION_SIZE];
        let mut buf = &mut out[..];
        buf.put_u8(self.version);
        buf.put_u8(self.mode);
        buf.put_slice(&self.part_number);
        buf.put_u32_le(self.build_id);
        buf.put_u16_le(self.max_write_size);
        out
    }

    /// Part number as a printable string, trailing NULs stripped.
    pub fn part_number_string(&self) -> String {
        let end = self
            .part_number
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.part_number.len());
        String::from_utf8_lossy(&self.part_number[..end]).into_owned()
    }
}

/// Application status values carried in `ApplicationInfo::status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    Ok,
    Booting,
    Updating,
    BadAppConfig,
    Other(u16),
}

impl AppStatus {
    /// Decode from the raw 16-bit status field.
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0x00 => AppStatus::Ok,
            0x01 => AppStatus::Booting,
            0x02 => AppStatus::Updating,
            0x03 => AppStatus::BadAppConfig,
            other => AppStatus::Other(other),
        }
    }

    /// The raw wire value.
    pub fn raw(&self) -> u16 {
        match self {
            AppStatus::Ok => 0x00,
            AppStatus::Booting => 0x01,
            AppStatus::Updating => 0x02,
            AppStatus::BadAppConfig => 0x03,
            AppStatus::Other(other) => *other,
        }
    }

    /// True while the application is still coming up; callers should
    /// re-poll rather than accept the structure.
    pub fn is_transitional(&self) -> bool {
        matches!(self, AppStatus::Booting | AppStatus::Updating)
    }
}

/// Application firmware information (GET_APPLICATION_INFO response).
///
/// All fields are little-endian u16 on the wire except `customer_config_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplicationInfo {
    pub version: u16,
    /// Raw application status; see [`AppStatus`].
    pub status: u16,
    pub static_config_size: u16,
    pub dynamic_config_size: u16,
    pub app_config_start_write_block: u16,
    pub app_config_size: u16,
    pub max_touch_report_config_size: u16,
    pub max_touch_report_payload_size: u16,
    pub customer_config_id: [u8; 16],
    pub max_x: u16,
    pub max_y: u16,
    pub num_buttons: u16,
    pub num_image_rows: u16,
    pub num_image_cols: u16,
    pub has_hybrid_data: u16,
}

impl ApplicationInfo {
    /// Decode from a response payload, zero-extending short payloads.
    pub fn from_payload(payload: &[u8]) -> Self {
        let mut image = [0u8; APPLICATION_INFO_SIZE];
        let n = payload.len().min(APPLICATION_INFO_SIZE);
        image[..n].copy_from_slice(&payload[..n]);

        let mut buf = &image[..];
        let version = buf.get_u16_le();
        let status = buf.get_u16_le();
        let static_config_size = buf.get_u16_le();
        let dynamic_config_size = buf.get_u16_le();
        let app_config_start_write_block = buf.get_u16_le();
        let app_config_size = buf.get_u16_le();
        let max_touch_report_config_size = buf.get_u16_le();
        let max_touch_report_payload_size = buf.get_u16_le();
        let mut customer_config_id = [0u8; 16];
        buf.copy_to_slice(&mut customer_config_id);
        Self {
            version,
            status,
            static_config_size,
            dynamic_config_size,
            app_config_start_write_block,
            app_config_size,
            max_touch_report_config_size,
            max_touch_report_payload_size,
            customer_config_id,
            max_x: buf.get_u16_le(),
            max_y: buf.get_u16_le(),
            num_buttons: buf.get_u16_le(),
            num_image_rows: buf.get_u16_le(),
            num_image_cols: buf.get_u16_le(),
            has_hybrid_data: buf.get_u16_le(),
        }
    }

    /// Encode into the wire payload.
    pub fn encode(&self) -> [u8; APPLICATION_INFO_SIZE] {
        let mut out = [0u8; APPLICATION_INFO_SIZE];
        let mut buf = &mut out[..];
        buf.put_u16_le(self.version);
        buf.put_u16_le(self.status);
        buf.put_u16_le(self.static_config_size);
        buf.put_u16_le(self.dynamic_config_size);
        buf.put_u16_le(self.app_config_start_write_block);
        buf.put_u16_le(self.app_config_size);
        buf.put_u16_le(self.max_touch_report_config_size);
        buf.put_u16_le(self.max_touch_report_payload_size);
        buf.put_slice(&self.customer_config_id);
        buf.put_u16_le(self.max_x);
        buf.put_u16_le(self.max_y);
        buf.put_u16_le(self.num_buttons);
        buf.put_u16_le(self.num_image_rows);
        buf.put_u16_le(self.num_image_cols);
        buf.put_u16_le(self.has_hybrid_data);
        out
    }

    /// Application status as an enum.
    pub fn app_status(&self) -> AppStatus {
        AppStatus::from_raw(self.status)
    }
}

/// Bootloader information (GET_BOOT_INFO response).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootInfo {
    pub version: u8,
    pub status: u8,
    pub asic_id: u16,
    pub write_block_size_words: u8,
    pub erase_page_size_words: u16,
    pub max_write_payload_size: u16,
    pub last_reset_reason: u8,
}

impl BootInfo {
    /// Decode from a response payload, zero-extending short payloads.
    pub fn from_payload(payload: &[u8]) -> Self {
        let mut image = [0u8; BOOT_INFO_SIZE];
        let n = payload.len().min(BOOT_INFO_SIZE);
        image[..n].copy_from_slice(&payload[..n]);

        let mut buf = &image[..];
        Self {
            version: buf.get_u8(),
            status: buf.get_u8(),
            asic_id: buf.get_u16_le(),
            write_block_size_words: buf.get_u8(),
            erase_page_size_words: buf.get_u16_le(),
            max_write_payload_size: buf.get_u16_le(),
            last_reset_reason: buf.get_u8(),
        }
    }

    /// Encode into the wire payload.
    pub fn encode(&self) -> [u8; BOOT_INFO_SIZE] {
        let mut out = [0u8; BOOT_INFO_SIZE];
        let mut buf = &mut out[..];
        buf.put_u8(self.version);
        buf.put_u8(self.status);
        buf.put_u16_le(self.asic_id);
        buf.put_u8(self.write_block_size_words);
        buf.put_u16_le(self.erase_page_size_words);
        buf.put_u16_le(self.max_write_payload_size);
        buf.put_u8(self.last_reset_reason);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_identification() -> Identification {
        let mut part_number = [0u8; 16];
        part_number[..6].copy_from_slice(b"TD4150");
        Identification {
            version: 0x10,
            mode: 0x01,
            part_number,
            build_id: 4_171_958,
            max_write_size: 512,
        }
    }

    #[test]
    fn test_identification_roundtrip() {
        let id = sample_identification();
        let decoded = Identification::from_payload(&id.encode());
        assert_eq!(decoded, id);
        assert_eq!(decoded.part_number_string(), "TD4150");
    }

    #[test]
    fn test_identification_short_payload_zero_extends() {
        // Only version and mode present; everything else decodes as zero.
        let decoded = Identification::from_payload(&[0x10, 0x0B]);
        assert_eq!(decoded.version, 0x10);
        assert_eq!(decoded.mode, 0x0B);
        assert_eq!(decoded.build_id, 0);
        assert_eq!(decoded.max_write_size, 0);
        assert_eq!(decoded.part_number_string(), "");
    }

    #[test]
    fn test_application_info_roundtrip() {
        let info = ApplicationInfo {
            version: 2,
            status: 0x00,
            max_x: 719,
            max_y: 1599,
            num_image_rows: 18,
            num_image_cols: 32,
            ..Default::default()
        };
        let decoded = ApplicationInfo::from_payload(&info.encode());
        assert_eq!(decoded, info);
        assert_eq!(decoded.app_status(), AppStatus::Ok);
    }

    #[test]
    fn test_application_status_values() {
        assert_eq!(AppStatus::from_raw(0x01), AppStatus::Booting);
        assert!(AppStatus::Booting.is_transitional());
        assert!(AppStatus::Updating.is_transitional());
        assert!(!AppStatus::Ok.is_transitional());
        assert!(!AppStatus::BadAppConfig.is_transitional());
        assert_eq!(AppStatus::from_raw(0x77), AppStatus::Other(0x77));
        assert_eq!(AppStatus::Other(0x77).raw(), 0x77);
    }

    #[test]
    fn test_boot_info_roundtrip() {
        let info = BootInfo {
            version: 1,
            status: 0x01,
            asic_id: 0x4150,
            write_block_size_words: 2,
            erase_page_size_words: 32,
            max_write_payload_size: 256,
            last_reset_reason: 0x02,
        };
        let decoded = BootInfo::from_payload(&info.encode());
        assert_eq!(decoded, info);
    }

    #[test]
    fn test_app_info_booting_prefix() {
        // A booting device reports only the first two fields.
        let mut payload = Vec::new();
        payload.extend_from_slice(&2u16.to_le_bytes());
        payload.extend_from_slice(&1u16.to_le_bytes());
        let decoded = ApplicationInfo::from_payload(&payload);
        assert_eq!(decoded.app_status(), AppStatus::Booting);
        assert_eq!(decoded.max_x, 0);
    }
}
