//! Message routing.
//!
//! Every message the read path completes lands here exactly once. Report
//! codes fan out to the registered consumers (touch reports take a
//! dedicated fast path); status codes resolve the in-flight command.
//! Identify reports get special handling first, because the device sends
//! one unprompted whenever it resets or switches firmware.

use std::sync::atomic::Ordering;
use std::time::Duration;

use touchwire_bus::Bus;
use touchwire_message::codes::{
    expects_reset, is_firmware_mode, is_report, MODE_ROMBOOTLOADER, REPORT_IDENTIFY, REPORT_TOUCH,
    STATUS_OK,
};
use touchwire_message::{Identification, IDENTIFICATION_SIZE};
use tracing::{error, info, trace, warn};

use crate::engine::{lock, CommandStatus, Engine};
use crate::helper::HelperTask;

/// One report, borrowed out of the inbound buffer for the duration of
/// the dispatch.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    /// Report code from the message header.
    pub id: u8,
    pub payload: &'a [u8],
}

/// Receives asynchronous reports on the reader thread.
///
/// Handlers run inline with the read path, so they must not block on it:
/// in particular they must not issue commands, which would deadlock on
/// the response that can never be read. Park work in the helper slot or
/// hand it to another thread instead.
pub trait ReportConsumer: Send + Sync {
    fn handle_report(&self, report: Report<'_>);

    /// Called after the device comes back from a reset, once the engine
    /// has re-identified it. Consumers re-arm device-side state here.
    fn reinit(&self) {}
}

/// Schedules delayed attention polls on buses without an attention line.
///
/// The write path cancels any pending poll before a command goes out and
/// schedules one after, so the response gets picked up even when nothing
/// else drives [`Engine::read_message`].
pub trait PollScheduler: Send + Sync {
    fn cancel(&self);
    fn schedule(&self, delay: Duration);
}

impl<B: Bus> Engine<B> {
    pub(crate) fn dispatch_message(&self, code: u8, payload: &[u8]) {
        if code == REPORT_IDENTIFY {
            let id = self.absorb_identification(payload);

            let was_busy = {
                let mut state = lock(&self.command.state);
                let busy = state.status == CommandStatus::Busy;
                if busy {
                    if expects_reset(state.command) {
                        state.response_code = STATUS_OK;
                        state.status = CommandStatus::Idle;
                    } else {
                        warn!(command = state.command, "device has been reset");
                        state.status = CommandStatus::Error;
                    }
                    state.completed = true;
                    self.command.done.notify_all();
                }
                busy
            };

            if !was_busy && id.mode == MODE_ROMBOOTLOADER && self.host_download_capable {
                // The device is waiting for firmware. Park the download
                // task; it must not run on the reader thread.
                if !self.request_helper_task(HelperTask::SendRombootHostDownload) {
                    warn!("helper slot is busy");
                }
                return;
            }

            // A transitional identify mid-download belongs to the
            // downloader, not the report consumers.
            if self.host_download_active() {
                return;
            }
        }

        if is_report(code) {
            self.dispatch_report(code, payload);
        } else {
            self.dispatch_response(code, payload);
        }
    }

    /// Fold an identify payload into the retained device image and
    /// renegotiate the write chunk size against the device's limit.
    pub(crate) fn absorb_identification(&self, payload: &[u8]) -> Identification {
        let id = {
            let mut device = lock(&self.device);
            let n = payload.len().min(IDENTIFICATION_SIZE);
            device.id_image[..n].copy_from_slice(&payload[..n]);
            Identification::from_payload(&device.id_image)
        };

        let max_write = id.max_write_size as usize;
        let mut wr_chunk = max_write.min(self.config.wr_chunk_size);
        if wr_chunk == 0 {
            wr_chunk = max_write;
        }
        self.wr_chunk_size.store(wr_chunk, Ordering::Relaxed);

        info!(
            mode = id.mode,
            build_id = id.build_id,
            part_number = %id.part_number_string(),
            "received identify report"
        );
        id
    }

    fn dispatch_report(&self, id: u8, payload: &[u8]) {
        trace!(id, length = payload.len(), "dispatching report");
        let report = Report { id, payload };

        if id == REPORT_TOUCH {
            if let Some(handler) = &self.touch_handler {
                handler.handle_report(report);
            }
            return;
        }

        if id == REPORT_IDENTIFY && is_firmware_mode(self.identification().mode) {
            // Application firmware came back underneath us; refresh the
            // touch configuration off the reader thread.
            self.request_helper_task(HelperTask::TouchReinit);
        }

        for consumer in &self.consumers {
            consumer.handle_report(report);
        }
        self.notifier.record(id);
    }

    fn dispatch_response(&self, code: u8, payload: &[u8]) {
        let mut state = lock(&self.command.state);
        if state.status != CommandStatus::Busy {
            trace!(code, "dropping response with no command outstanding");
            return;
        }

        state.response_code = code;

        if payload.is_empty() {
            state.status = CommandStatus::Idle;
        } else if payload.len() > self.config.max_response_size {
            error!(
                length = payload.len(),
                max = self.config.max_response_size,
                "response exceeds the response buffer bound"
            );
            state.status = CommandStatus::Error;
        } else {
            let mut response = lock(&self.response);
            response.data.clear();
            response.data.extend_from_slice(payload);
            state.status = CommandStatus::Idle;
        }

        state.completed = true;
        self.command.done.notify_all();
    }
}
