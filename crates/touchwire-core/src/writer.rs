//! Command writes and the response wait.
//!
//! A command travels as one or more chunks: the first carries the command
//! code and a 16-bit payload length, continuation chunks re-prefix the
//! stream with CMD_CONTINUE_WRITE. The two length bytes count against the
//! payload stream, which is why continuation offsets run two bytes behind
//! the chunk grid.

use std::mem;
use std::sync::atomic::Ordering;
use std::sync::PoisonError;
use std::thread;
use std::time::Duration;

use touchwire_bus::{chunk_count, Bus};
use touchwire_message::codes::{
    CMD_CONTINUE_WRITE, CMD_NONE, CMD_RESET, CMD_ROMBOOT_DOWNLOAD, STATUS_INVALID, STATUS_OK,
};
use tracing::{debug, error, trace};

use crate::config::ROMBOOT_DOWNLOAD_UNIT;
use crate::engine::{lock, CommandStatus, Engine};
use crate::error::{CoreError, Result};

/// A completed command: the device's response code and its payload.
#[derive(Debug, Clone)]
pub struct CommandResponse {
    /// Response code the device returned.
    pub status: u8,
    pub payload: Vec<u8>,
}

impl<B: Bus> Engine<B> {
    /// Issue `command` and block until its response arrives.
    ///
    /// Exactly one command is in flight at a time; concurrent callers
    /// queue on the command mutex. `poll_delay` schedules an attention
    /// poll for buses without an attention line; pass `None` when the
    /// reader is driven externally.
    pub fn write_message(
        &self,
        command: u8,
        payload: &[u8],
        poll_delay: Option<Duration>,
    ) -> Result<CommandResponse> {
        self.check_reader_context()?;
        if payload.len() > u16::MAX as usize {
            return Err(CoreError::PayloadTooLarge {
                size: payload.len(),
                max: u16::MAX as usize,
            });
        }

        let _command_guard = lock(&self.command_mutex);

        // A reset of a host-download device completes by re-downloading
        // firmware, not by responding.
        let is_hdl_reset = command == CMD_RESET && self.host_download_capable;

        if let (Some(poll), Some(_)) = (&self.poll, poll_delay) {
            poll.cancel();
        }

        debug!(command, length = payload.len(), "issuing command");

        {
            // Arming and the write share one bus critical section: a
            // reader mid-message finishes dispatching before the slot
            // turns busy, so its response can never pair with a command
            // the device has not seen yet.
            let mut bus = lock(&self.bus);
            {
                let mut state = lock(&self.command.state);
                state.status = CommandStatus::Busy;
                state.command = command;
                state.response_code = STATUS_INVALID;
                state.completed = false;
            }
            lock(&self.response).data.clear();

            if let Err(err) = self.write_message_locked(&mut bus, command, payload) {
                error!(command, "failed to write command: {err}");
                self.finish_command();
                return Err(err);
            }
        }

        if is_hdl_reset {
            self.finish_command();
            return Ok(CommandResponse {
                status: STATUS_INVALID,
                payload: Vec::new(),
            });
        }

        if let (Some(poll), Some(delay)) = (&self.poll, poll_delay) {
            poll.schedule(delay);
        }

        let result = self.wait_for_completion(command);
        self.finish_command();
        result
    }

    /// Write a pre-framed byte stream, chunked but without the length
    /// prefix of a command. The device interprets the stream as is; used
    /// for firmware download payloads.
    pub fn write_raw(&self, command: u8, data: &[u8]) -> Result<()> {
        let _command_guard = lock(&self.command_mutex);
        let mut bus = lock(&self.bus);

        let mut remaining = data.len();
        let chunk_space = match self.wr_chunk_size.load(Ordering::Relaxed) {
            0 => remaining,
            wr => wr - 1,
        };
        let chunks = chunk_count(remaining, chunk_space);
        trace!(command, chunks, "writing raw stream");

        let mut outbound = lock(&self.outbound);
        for idx in 0..chunks {
            let xfer = remaining.min(chunk_space);
            outbound.ensure(xfer + 1);
            let out = outbound.as_mut_slice();

            if idx == 0 {
                out[0] = command;
                out[1..xfer + 1].copy_from_slice(&data[..xfer]);
            } else {
                out[0] = CMD_CONTINUE_WRITE;
                let start = idx * chunk_space;
                out[1..xfer + 1].copy_from_slice(&data[start..start + xfer]);
            }

            bus.write_chunk(&out[..xfer + 1])?;
            remaining -= xfer;
        }
        Ok(())
    }

    fn write_message_locked(&self, bus: &mut B, command: u8, payload: &[u8]) -> Result<()> {
        // The two length bytes travel as part of the payload stream.
        let mut remaining = payload.len() + 2;

        let chunk_space = if command == CMD_ROMBOOT_DOWNLOAD {
            self.host_download_chunk_space(remaining)
        } else {
            match self.wr_chunk_size.load(Ordering::Relaxed) {
                0 => remaining,
                // The first chunk must carry the command code and both
                // length bytes.
                wr => wr.max(3) - 1,
            }
        };

        let chunks = chunk_count(remaining, chunk_space);
        trace!(command, chunks, "writing message");

        let length = payload.len();
        let mut outbound = lock(&self.outbound);
        for idx in 0..chunks {
            let xfer = remaining.min(chunk_space);
            outbound.ensure(xfer + 1);
            let out = outbound.as_mut_slice();

            if idx == 0 {
                out[0] = command;
                out[1] = length as u8;
                out[2] = (length >> 8) as u8;
                if xfer > 2 {
                    out[3..xfer + 1].copy_from_slice(&payload[..xfer - 2]);
                }
            } else {
                out[0] = CMD_CONTINUE_WRITE;
                let start = idx * chunk_space - 2;
                out[1..xfer + 1].copy_from_slice(&payload[start..start + xfer]);
            }

            bus.write_chunk(&out[..xfer + 1])?;

            remaining -= xfer;
            if chunks > 1 {
                thread::sleep(self.config.write_chunk_delay);
            }
        }
        Ok(())
    }

    /// Chunk space for firmware download writes, aligned down to the
    /// download unit the rom bootloader requires.
    fn host_download_chunk_space(&self, remaining: usize) -> usize {
        match self.config.hdl_wr_chunk_size {
            0 => remaining,
            hdl => {
                let space = hdl - 1;
                space - (space % ROMBOOT_DOWNLOAD_UNIT)
            }
        }
    }

    fn wait_for_completion(&self, command: u8) -> Result<CommandResponse> {
        let state = lock(&self.command.state);
        let (state, _timed_out) = self
            .command
            .done
            .wait_timeout_while(state, self.config.response_timeout, |state| !state.completed)
            .unwrap_or_else(PoisonError::into_inner);

        if !state.completed {
            error!(
                command,
                timeout = ?self.config.response_timeout,
                "timed out waiting for response"
            );
            return Err(CoreError::Timeout {
                command,
                timeout: self.config.response_timeout,
            });
        }

        if state.status != CommandStatus::Idle {
            return Err(CoreError::Aborted { command });
        }

        if state.response_code != STATUS_OK {
            let code = state.response_code;
            drop(state);
            error!(command, code, "command failed");
            return Err(CoreError::ErrorStatus { command, code });
        }

        let status = state.response_code;
        drop(state);
        let payload = mem::take(&mut lock(&self.response).data);
        Ok(CommandResponse { status, payload })
    }

    /// Release the command slot. Runs on every exit path of a write.
    fn finish_command(&self) {
        let mut state = lock(&self.command.state);
        state.status = CommandStatus::Idle;
        state.command = CMD_NONE;
    }

    fn check_reader_context(&self) -> Result<()> {
        if self.config.polling {
            return Ok(());
        }
        if let Some(reader) = *lock(&self.reader_thread) {
            if reader == thread::current().id() {
                error!("blocking command issued from the reader context");
                return Err(CoreError::ReaderContext);
            }
        }
        Ok(())
    }
}
