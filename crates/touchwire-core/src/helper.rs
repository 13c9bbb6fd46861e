//! Single-slot deferred work.
//!
//! Dispatch runs on the reader thread and must never block on a command
//! of its own, so follow-up work that needs the command driver is parked
//! in a one-deep slot and serviced by a worker outside the read path.

use std::sync::atomic::{AtomicU8, Ordering};

use touchwire_bus::Bus;
use touchwire_message::codes::REPORT_ROMBOOT_HOST_DOWNLOAD;
use tracing::{debug, error};

use crate::dispatch::Report;
use crate::engine::{lock, Engine};
use crate::error::Result;

/// Deferred tasks the dispatch engine can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HelperTask {
    /// Switch the device back into the application firmware.
    RunApplicationFirmware = 1,
    /// Re-identify and tell every consumer the device was reinitialized.
    SendReinitNotification = 2,
    /// Reinitialize the touch fast path after an unexpected identify.
    TouchReinit = 3,
    /// Kick off a romboot host download.
    SendRombootHostDownload = 4,
}

impl HelperTask {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(HelperTask::RunApplicationFirmware),
            2 => Some(HelperTask::SendReinitNotification),
            3 => Some(HelperTask::TouchReinit),
            4 => Some(HelperTask::SendRombootHostDownload),
            _ => None,
        }
    }
}

/// One-deep task slot. A request while the slot is occupied is refused
/// rather than queued.
#[derive(Debug, Default)]
pub struct HelperSlot {
    task: AtomicU8,
}

impl HelperSlot {
    pub(crate) fn new() -> Self {
        Self {
            task: AtomicU8::new(0),
        }
    }

    /// Park a task. Returns false if the slot already holds one.
    pub fn request(&self, task: HelperTask) -> bool {
        self.task
            .compare_exchange(0, task as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Take the parked task, freeing the slot.
    pub fn take(&self) -> Option<HelperTask> {
        HelperTask::from_raw(self.task.swap(0, Ordering::AcqRel))
    }

    /// True if no task is parked.
    pub fn is_idle(&self) -> bool {
        self.task.load(Ordering::Acquire) == 0
    }
}

impl<B: Bus> Engine<B> {
    /// Park a helper task. Returns false if one is already pending.
    pub fn request_helper_task(&self, task: HelperTask) -> bool {
        self.helper.request(task)
    }

    /// Take the pending helper task without running it.
    pub fn take_helper_task(&self) -> Option<HelperTask> {
        self.helper.take()
    }

    /// Run the pending helper task, if any. Returns the task that ran.
    ///
    /// Call this from a worker thread whenever dispatch may have parked
    /// work; never from the reader thread itself.
    pub fn service_helper_task(&self) -> Result<Option<HelperTask>> {
        let Some(task) = self.helper.take() else {
            return Ok(None);
        };
        debug!(task = ?task, "servicing helper task");
        let result = match task {
            HelperTask::RunApplicationFirmware => {
                let _reset_guard = lock(&self.reset_mutex);
                self.run_application_firmware()
            }
            HelperTask::SendReinitNotification => self.notify_reinit(),
            HelperTask::TouchReinit => {
                self.touch_reinit();
                Ok(())
            }
            HelperTask::SendRombootHostDownload => {
                self.announce_host_download();
                Ok(())
            }
        };
        if let Err(err) = &result {
            error!(task = ?task, "helper task failed: {err}");
        }
        result.map(|_| Some(task))
    }

    fn notify_reinit(&self) -> Result<()> {
        let _reset_guard = lock(&self.reset_mutex);
        self.identify()?;
        self.touch_reinit();
        for consumer in &self.consumers {
            consumer.reinit();
        }
        Ok(())
    }

    fn touch_reinit(&self) {
        if let Some(touch) = &self.touch_handler {
            touch.reinit();
        }
    }

    // The downloader reacts to a bare checkpoint report; there is no
    // payload to carry.
    fn announce_host_download(&self) {
        let report = Report {
            id: REPORT_ROMBOOT_HOST_DOWNLOAD,
            payload: &[],
        };
        for consumer in &self.consumers {
            consumer.handle_report(report);
        }
    }
}
