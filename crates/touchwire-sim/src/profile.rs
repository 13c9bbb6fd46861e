//! Simulated device personality.

use touchwire_message::codes::MODE_APPLICATION_FIRMWARE;
use touchwire_message::{ApplicationInfo, BootInfo, Identification};

/// Everything fixed about a simulated device: what it reports about
/// itself and how cleanly it behaves. Runtime state (current mode,
/// dynamic config) lives in the device itself.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    /// Protocol version byte of the identification.
    pub version: u8,
    /// Mode the device boots into.
    pub boot_mode: u8,
    /// ASCII part number, up to 16 bytes.
    pub part_number: String,
    pub build_id: u32,
    /// Largest write the device accepts; zero advertises no limit.
    pub max_write_size: u16,
    pub application_info: ApplicationInfo,
    pub boot_info: BootInfo,
    /// How many application-info reads report a booting status before
    /// the application settles.
    pub booting_polls: u32,
    /// How many mode-switch commands leave the mode unchanged before
    /// one finally sticks.
    pub fail_mode_switches: u32,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            version: 2,
            boot_mode: MODE_APPLICATION_FIRMWARE,
            part_number: "TW4150".to_owned(),
            build_id: 4_150_001,
            max_write_size: 256,
            application_info: ApplicationInfo {
                version: 2,
                status: 0x00,
                static_config_size: 768,
                dynamic_config_size: 32,
                max_x: 719,
                max_y: 1599,
                num_image_rows: 32,
                num_image_cols: 18,
                ..Default::default()
            },
            boot_info: BootInfo {
                version: 1,
                status: 0x00,
                asic_id: 0x4150,
                write_block_size_words: 2,
                erase_page_size_words: 32,
                max_write_payload_size: 256,
                last_reset_reason: 0x01,
            },
            booting_polls: 0,
            fail_mode_switches: 0,
        }
    }
}

impl DeviceProfile {
    /// The identification image for the given current mode.
    pub fn identification(&self, mode: u8) -> Identification {
        let mut part_number = [0u8; 16];
        let bytes = self.part_number.as_bytes();
        let n = bytes.len().min(16);
        part_number[..n].copy_from_slice(&bytes[..n]);
        Identification {
            version: self.version,
            mode,
            part_number,
            build_id: self.build_id,
            max_write_size: self.max_write_size,
        }
    }
}
