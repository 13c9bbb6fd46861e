//! The simulated device model.
//!
//! The device reassembles chunked command writes, executes the command
//! set against its profile, and serves framed messages back chunk by
//! chunk. Serving follows the controller framing: a first chunk starts
//! with the marker and header, continuation chunks re-prefix the stream
//! with the marker and CONTINUED_READ, and reads past the end of the
//! stream are filled with the padding byte.

use std::collections::{HashMap, HashSet, VecDeque};
use std::mem;

use touchwire_message::codes::{
    command_name, CMD_CONTINUE_WRITE, CMD_DISABLE_REPORT, CMD_ENABLE_REPORT, CMD_ENTER_DEEP_SLEEP,
    CMD_ENTER_PRODUCTION_TEST_MODE, CMD_EXIT_DEEP_SLEEP, CMD_GET_APPLICATION_INFO,
    CMD_GET_BOOT_INFO, CMD_GET_DYNAMIC_CONFIG, CMD_IDENTIFY, CMD_RESET, CMD_REZERO,
    CMD_ROMBOOT_RUN_BOOTLOADER_FIRMWARE, CMD_RUN_APPLICATION_FIRMWARE,
    CMD_RUN_BOOTLOADER_FIRMWARE, CMD_SET_DYNAMIC_CONFIG, MODE_APPLICATION_FIRMWARE,
    MODE_BOOTLOADER, MODE_PRODUCTION_TEST, REPORT_IDENTIFY, STATUS_CONTINUED_READ, STATUS_ERROR,
    STATUS_IDLE, STATUS_NOT_IMPLEMENTED, STATUS_OK,
};
use touchwire_message::{MESSAGE_MARKER, MESSAGE_PADDING};
use tracing::{debug, trace, warn};

use crate::profile::DeviceProfile;

/// One outbound message, served chunk by chunk.
///
/// `stream` holds marker, code, length and payload; the closing padding
/// byte is never stored, short serves synthesize it by filling.
struct OutMessage {
    stream: Vec<u8>,
    pos: usize,
}

impl OutMessage {
    fn new(code: u8, payload: &[u8]) -> Self {
        let mut stream = Vec::with_capacity(4 + payload.len());
        stream.push(MESSAGE_MARKER);
        stream.push(code);
        stream.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        stream.extend_from_slice(payload);
        Self { stream, pos: 0 }
    }
}

/// A command arriving across several write chunks.
struct PartialWrite {
    command: u8,
    expected: usize,
    data: Vec<u8>,
}

pub(crate) struct SimDevice {
    profile: DeviceProfile,
    mode: u8,
    dynamic: HashMap<u8, u16>,
    enabled_reports: HashSet<u8>,
    pending: VecDeque<OutMessage>,
    partial: Option<PartialWrite>,
    booting_left: u32,
    fail_switches_left: u32,
    muted: bool,
    corrupt_reads: u32,
    command_log: Vec<(u8, Vec<u8>)>,
    attention_pending: bool,
}

impl SimDevice {
    pub(crate) fn new(profile: DeviceProfile) -> Self {
        Self {
            mode: profile.boot_mode,
            booting_left: profile.booting_polls,
            fail_switches_left: profile.fail_mode_switches,
            profile,
            dynamic: HashMap::new(),
            enabled_reports: HashSet::new(),
            pending: VecDeque::new(),
            partial: None,
            muted: false,
            corrupt_reads: 0,
            command_log: Vec::new(),
            attention_pending: false,
        }
    }

    pub(crate) fn handle_write(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }

        if let Some(mut partial) = self.partial.take() {
            if chunk[0] == CMD_CONTINUE_WRITE {
                partial.data.extend_from_slice(&chunk[1..]);
                if partial.data.len() >= partial.expected {
                    partial.data.truncate(partial.expected);
                    let PartialWrite { command, data, .. } = partial;
                    self.execute(command, data);
                } else {
                    self.partial = Some(partial);
                }
                return;
            }
            warn!(
                command = partial.command,
                "new command before the previous one finished, dropping the partial"
            );
        }

        if chunk.len() < 3 {
            warn!(length = chunk.len(), "write chunk too short for a command header");
            return;
        }

        let command = chunk[0];
        let expected = u16::from_le_bytes([chunk[1], chunk[2]]) as usize;
        let mut data = chunk[3..].to_vec();
        if data.len() >= expected {
            data.truncate(expected);
            self.execute(command, data);
        } else {
            self.partial = Some(PartialWrite {
                command,
                expected,
                data,
            });
        }
    }

    fn execute(&mut self, command: u8, payload: Vec<u8>) {
        trace!(
            command = command_name(command),
            length = payload.len(),
            "executing command"
        );

        match command {
            CMD_IDENTIFY => {
                let frame = self.profile.identification(self.mode).encode();
                self.respond(STATUS_OK, &frame);
            }
            CMD_GET_APPLICATION_INFO => {
                let mut info = self.profile.application_info;
                if self.booting_left > 0 {
                    self.booting_left -= 1;
                    info.status = 0x01;
                }
                let frame = info.encode();
                self.respond(STATUS_OK, &frame);
            }
            CMD_GET_BOOT_INFO => {
                let frame = self.profile.boot_info.encode();
                self.respond(STATUS_OK, &frame);
            }
            CMD_GET_DYNAMIC_CONFIG => {
                let id = payload.first().copied().unwrap_or(0);
                let value = self.dynamic.get(&id).copied().unwrap_or(0);
                self.respond(STATUS_OK, &value.to_le_bytes());
            }
            CMD_SET_DYNAMIC_CONFIG => {
                if payload.len() >= 3 {
                    let value = u16::from_le_bytes([payload[1], payload[2]]);
                    self.dynamic.insert(payload[0], value);
                    self.respond(STATUS_OK, &[]);
                } else {
                    self.respond(STATUS_ERROR, &[]);
                }
            }
            CMD_ENABLE_REPORT => {
                if let Some(&id) = payload.first() {
                    self.enabled_reports.insert(id);
                }
                self.respond(STATUS_OK, &[]);
            }
            CMD_DISABLE_REPORT => {
                if let Some(&id) = payload.first() {
                    self.enabled_reports.remove(&id);
                }
                self.respond(STATUS_OK, &[]);
            }
            CMD_REZERO | CMD_ENTER_DEEP_SLEEP | CMD_EXIT_DEEP_SLEEP => {
                self.respond(STATUS_OK, &[]);
            }
            CMD_RESET => {
                self.mode = self.profile.boot_mode;
                self.send_identify_report();
            }
            CMD_RUN_APPLICATION_FIRMWARE => self.switch_mode(MODE_APPLICATION_FIRMWARE),
            CMD_RUN_BOOTLOADER_FIRMWARE | CMD_ROMBOOT_RUN_BOOTLOADER_FIRMWARE => {
                self.switch_mode(MODE_BOOTLOADER)
            }
            CMD_ENTER_PRODUCTION_TEST_MODE => self.switch_mode(MODE_PRODUCTION_TEST),
            _ => {
                debug!(command, "command not implemented");
                self.respond(STATUS_NOT_IMPLEMENTED, &[]);
            }
        }

        self.command_log.push((command, payload));
    }

    /// Mode switches complete with an identify report, not a response.
    fn switch_mode(&mut self, target: u8) {
        if self.fail_switches_left > 0 {
            self.fail_switches_left -= 1;
            debug!(target, "mode switch fails by profile");
        } else {
            self.mode = target;
        }
        self.send_identify_report();
    }

    fn send_identify_report(&mut self) {
        let frame = self.profile.identification(self.mode).encode();
        self.emit(REPORT_IDENTIFY, &frame);
    }

    fn respond(&mut self, code: u8, payload: &[u8]) {
        self.emit(code, payload);
    }

    fn emit(&mut self, code: u8, payload: &[u8]) {
        if self.muted {
            trace!(code, "muted, dropping outbound message");
            return;
        }
        self.pending.push_back(OutMessage::new(code, payload));
        self.attention_pending = true;
    }

    /// Queue a report even while muted; this is the test harness talking,
    /// not the device.
    pub(crate) fn inject_report(&mut self, id: u8, payload: &[u8]) {
        self.pending.push_back(OutMessage::new(id, payload));
        self.attention_pending = true;
    }

    pub(crate) fn serve_read(&mut self, dst: &mut [u8]) {
        let corrupt = self.corrupt_reads > 0;
        let Some(msg) = self.pending.front_mut() else {
            idle_fill(dst);
            return;
        };

        let done;
        if msg.pos == 0 {
            let n = msg.stream.len().min(dst.len());
            dst[..n].copy_from_slice(&msg.stream[..n]);
            dst[n..].fill(MESSAGE_PADDING);
            if corrupt {
                // The transaction glitched on the wire; the device never
                // served it, so the message stays where it is.
                dst[0] = 0x00;
                self.corrupt_reads -= 1;
                return;
            }
            msg.pos = n;
            done = msg.pos >= msg.stream.len();
        } else if dst.len() >= 2 {
            dst[0] = MESSAGE_MARKER;
            dst[1] = STATUS_CONTINUED_READ;
            let n = (msg.stream.len() - msg.pos).min(dst.len() - 2);
            dst[2..2 + n].copy_from_slice(&msg.stream[msg.pos..msg.pos + n]);
            dst[2 + n..].fill(MESSAGE_PADDING);
            msg.pos += n;
            done = msg.pos >= msg.stream.len();
        } else {
            dst.fill(MESSAGE_PADDING);
            done = false;
        }

        if done {
            self.pending.pop_front();
            if !self.pending.is_empty() {
                self.attention_pending = true;
            }
        }
    }

    pub(crate) fn take_attention(&mut self) -> bool {
        mem::take(&mut self.attention_pending)
    }

    pub(crate) fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Mutate the profile in place. The booting and mode-switch-failure
    /// counters re-latch from the edited values.
    pub(crate) fn edit_profile(&mut self, f: impl FnOnce(&mut DeviceProfile)) {
        f(&mut self.profile);
        self.booting_left = self.profile.booting_polls;
        self.fail_switches_left = self.profile.fail_mode_switches;
    }

    pub(crate) fn add_corrupt_reads(&mut self, reads: u32) {
        self.corrupt_reads += reads;
    }

    pub(crate) fn mode(&self) -> u8 {
        self.mode
    }

    pub(crate) fn report_enabled(&self, id: u8) -> bool {
        self.enabled_reports.contains(&id)
    }

    pub(crate) fn last_command(&self) -> Option<(u8, Vec<u8>)> {
        self.command_log.last().cloned()
    }

    pub(crate) fn command_log(&self) -> Vec<(u8, Vec<u8>)> {
        self.command_log.clone()
    }
}

fn idle_fill(dst: &mut [u8]) {
    dst.fill(MESSAGE_PADDING);
    if dst.len() >= 2 {
        dst[0] = MESSAGE_MARKER;
        dst[1] = STATUS_IDLE;
    }
    if dst.len() >= 4 {
        dst[2] = 0;
        dst[3] = 0;
    }
}
