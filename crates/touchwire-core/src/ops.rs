//! Device operations built on the command driver.
//!
//! Each operation issues one or more commands and interprets the
//! responses. Mode switches complete through the identify report the
//! device sends after rebooting, so their verification reads the retained
//! identification instead of asking again.

use std::thread;

use touchwire_bus::Bus;
use touchwire_message::codes::{
    is_firmware_mode, mode_name, DynamicConfigId, CMD_DISABLE_REPORT, CMD_ENABLE_REPORT,
    CMD_ENTER_DEEP_SLEEP, CMD_ENTER_PRODUCTION_TEST_MODE, CMD_EXIT_DEEP_SLEEP,
    CMD_GET_APPLICATION_INFO, CMD_GET_BOOT_INFO, CMD_GET_DYNAMIC_CONFIG, CMD_IDENTIFY,
    CMD_RESET, CMD_REZERO, CMD_ROMBOOT_RUN_BOOTLOADER_FIRMWARE, CMD_RUN_APPLICATION_FIRMWARE,
    CMD_RUN_BOOTLOADER_FIRMWARE, CMD_SET_DYNAMIC_CONFIG, MODE_APPLICATION_FIRMWARE,
    MODE_BOOTLOADER, MODE_HOSTDOWNLOAD_FIRMWARE, MODE_PRODUCTION_TEST, MODE_ROMBOOTLOADER,
    MODE_TDDI_BOOTLOADER,
};
use touchwire_message::{AppStatus, ApplicationInfo, BootInfo, Identification};
use tracing::{debug, error, info, warn};

use crate::engine::{lock, Engine};
use crate::error::{CoreError, Result};

/// Firmware images the device can be switched into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMode {
    Application,
    Bootloader,
    ProductionTest,
}

impl<B: Bus> Engine<B> {
    /// Identify the device and refresh the mode-specific info structure.
    ///
    /// The identification image is retained; [`Engine::identification`]
    /// serves it without bus traffic afterwards.
    pub fn identify(&self) -> Result<Identification> {
        let _guard = lock(&self.identify_mutex);

        let response = self.write_message(CMD_IDENTIFY, &[], None)?;
        let id = self.absorb_identification(&response.payload);

        self.fetch_mode_info(id.mode)?;
        Ok(id)
    }

    /// Refresh the info structure for the current mode without asking the
    /// device to identify again. Useful right after a mode switch, when
    /// the identify report has already updated the retained image.
    pub fn refresh_mode_info_for_current_mode(&self) -> Result<()> {
        let _guard = lock(&self.identify_mutex);
        let mode = self.identification().mode;
        self.fetch_mode_info(mode)
    }

    fn fetch_mode_info(&self, mode: u8) -> Result<()> {
        match mode {
            MODE_APPLICATION_FIRMWARE | MODE_HOSTDOWNLOAD_FIRMWARE => {
                self.get_application_info()?;
            }
            MODE_BOOTLOADER | MODE_TDDI_BOOTLOADER | MODE_ROMBOOTLOADER => {
                self.get_boot_info()?;
            }
            mode => {
                debug!(mode, "no info structure for this mode");
            }
        }
        Ok(())
    }

    /// Fetch application info, polling while the application reports a
    /// transitional status. Gives up quietly when the poll budget runs
    /// out and returns whatever the device last reported.
    pub fn get_application_info(&self) -> Result<ApplicationInfo> {
        let mut budget = self.config.app_status_poll_timeout;
        loop {
            let response = self.write_message(CMD_GET_APPLICATION_INFO, &[], None)?;
            let latest = ApplicationInfo::from_payload(&response.payload);
            lock(&self.device).app_info = Some(latest);

            let status = latest.app_status();
            if status.is_transitional() && !budget.is_zero() {
                debug!(status = ?status, "application still starting");
                thread::sleep(self.config.app_status_poll_period);
                budget = budget.saturating_sub(self.config.app_status_poll_period);
                continue;
            }
            return Ok(latest);
        }
    }

    /// Fetch bootloader info. The rom bootloader answers the same
    /// structure.
    pub fn get_boot_info(&self) -> Result<BootInfo> {
        let response = self.write_message(CMD_GET_BOOT_INFO, &[], None)?;
        let latest = BootInfo::from_payload(&response.payload);
        lock(&self.device).boot_info = Some(latest);
        Ok(latest)
    }

    /// Switch the device into `mode` and verify it got there.
    pub fn switch_mode(&self, mode: TargetMode) -> Result<()> {
        let _guard = lock(&self.reset_mutex);
        match mode {
            TargetMode::Application => self.run_application_firmware(),
            TargetMode::Bootloader => self.run_bootloader_firmware(),
            TargetMode::ProductionTest => self.enter_production_test_mode(),
        }
    }

    /// Ask the bootloader to start the application firmware.
    ///
    /// The switch occasionally fails on the first try right after flash
    /// activity, so a failed verification is retried once.
    pub fn run_application_firmware(&self) -> Result<()> {
        let mut retry = true;
        loop {
            self.write_message(
                CMD_RUN_APPLICATION_FIRMWARE,
                &[],
                Some(self.config.mode_switch_delay),
            )?;

            self.refresh_mode_info_for_current_mode()?;

            let id = self.identification();
            if !is_firmware_mode(id.mode) {
                let boot_status = self.boot_info().map(|info| info.status);
                error!(
                    mode = mode_name(id.mode),
                    boot_status, "failed to run application firmware"
                );
                if retry {
                    retry = false;
                    continue;
                }
                return Err(CoreError::ModeSwitch { mode: id.mode });
            }

            if let Some(info) = self.application_info() {
                let status = info.app_status();
                if status != AppStatus::Ok {
                    warn!(status = ?status, "application is up with a non-ok status");
                }
            }
            return Ok(());
        }
    }

    /// Drop the device into its bootloader. From the rom bootloader the
    /// dedicated romboot command is used and no verification is possible,
    /// because the device needs firmware before it can say more.
    pub fn run_bootloader_firmware(&self) -> Result<()> {
        let from_romboot = self.identification().mode == MODE_ROMBOOTLOADER;
        let command = if from_romboot {
            CMD_ROMBOOT_RUN_BOOTLOADER_FIRMWARE
        } else {
            CMD_RUN_BOOTLOADER_FIRMWARE
        };

        self.write_message(command, &[], Some(self.config.mode_switch_delay))?;

        self.refresh_mode_info_for_current_mode()?;

        if !from_romboot {
            let mode = self.identification().mode;
            if is_firmware_mode(mode) {
                error!(mode = mode_name(mode), "failed to enter bootloader mode");
                return Err(CoreError::ModeSwitch { mode });
            }
        }
        Ok(())
    }

    /// Switch into the production test firmware, retrying once.
    pub fn enter_production_test_mode(&self) -> Result<()> {
        let mut retry = true;
        loop {
            self.write_message(
                CMD_ENTER_PRODUCTION_TEST_MODE,
                &[],
                Some(self.config.mode_switch_delay),
            )?;

            // The identify report that completed the command already
            // refreshed the retained image.
            let mode = self.identification().mode;
            if mode != MODE_PRODUCTION_TEST {
                error!(
                    mode = mode_name(mode),
                    "failed to run production test firmware"
                );
                if retry {
                    retry = false;
                    continue;
                }
                return Err(CoreError::ModeSwitch { mode });
            }
            return Ok(());
        }
    }

    /// Read one dynamic configuration value.
    pub fn get_dynamic_config(&self, id: DynamicConfigId) -> Result<u16> {
        let response = self.write_message(CMD_GET_DYNAMIC_CONFIG, &[id as u8], None)?;
        if response.payload.len() < 2 {
            return Err(CoreError::ShortResponse {
                needed: 2,
                got: response.payload.len(),
            });
        }
        Ok(u16::from_le_bytes([response.payload[0], response.payload[1]]))
    }

    /// Write one dynamic configuration value.
    pub fn set_dynamic_config(&self, id: DynamicConfigId, value: u16) -> Result<()> {
        let [lo, hi] = value.to_le_bytes();
        self.write_message(CMD_SET_DYNAMIC_CONFIG, &[id as u8, lo, hi], None)?;
        Ok(())
    }

    /// Start streaming the given report.
    pub fn enable_report(&self, report_id: u8) -> Result<()> {
        self.write_message(CMD_ENABLE_REPORT, &[report_id], None)?;
        Ok(())
    }

    /// Stop streaming the given report.
    pub fn disable_report(&self, report_id: u8) -> Result<()> {
        self.write_message(CMD_DISABLE_REPORT, &[report_id], None)?;
        Ok(())
    }

    /// Rebaseline the sensor.
    pub fn rezero(&self) -> Result<()> {
        self.write_message(CMD_REZERO, &[], None)?;
        Ok(())
    }

    /// Software-reset the device. Completes through the identify report
    /// the device sends once it is back up; on host-download devices the
    /// call returns as soon as the command is out.
    pub fn reset(&self) -> Result<()> {
        info!("resetting device");
        self.write_message(CMD_RESET, &[], Some(self.config.reset_delay))?;
        Ok(())
    }

    /// Put the device into its deep sleep state.
    pub fn enter_deep_sleep(&self) -> Result<()> {
        self.write_message(CMD_ENTER_DEEP_SLEEP, &[], None)?;
        Ok(())
    }

    /// Wake the device from deep sleep.
    pub fn exit_deep_sleep(&self) -> Result<()> {
        self.write_message(CMD_EXIT_DEEP_SLEEP, &[], None)?;
        Ok(())
    }
}
