//! Logical message reads.
//!
//! A logical read starts with one chunk of `read_length` bytes, validated
//! against the marker. The declared payload length then decides whether
//! the message is already complete, is complete except for its padding
//! byte, or continues on the bus in marker-prefixed CONTINUED_READ chunks
//! that are stitched back into the inbound buffer.

use std::thread;

use touchwire_bus::{chunk_count, Bus};
use touchwire_message::codes::{
    is_status, status_name, STATUS_BUSY, STATUS_CONTINUED_READ, STATUS_IDLE, STATUS_INVALID,
    STATUS_OK,
};
use touchwire_message::header::check_padding;
use touchwire_message::{
    MessageError, MessageHeader, HEADER_SIZE, MESSAGE_MARKER, MESSAGE_PADDING,
};
use tracing::{debug, error, trace, warn};

use crate::engine::{lock, CommandStatus, Engine, Inbound};
use crate::error::{CoreError, Result};

/// Smallest predictive read: header, a four-byte payload, and padding.
pub const MIN_READ_LENGTH: usize = 9;

impl<B: Bus> Engine<B> {
    /// Read one logical message from the device and dispatch it.
    ///
    /// This is the attention handler: call it whenever the device raises
    /// attention, or on a poll period. The calling thread is recorded as
    /// the reader context. A failure with a command outstanding marks
    /// that command failed and wakes its waiter.
    pub fn read_message(&self) -> Result<()> {
        *lock(&self.reader_thread) = Some(thread::current().id());
        let mut bus = lock(&self.bus);
        let result = self.read_message_locked(&mut bus);
        // Abort while the bus is still held; once it drops, a writer
        // queued on the lock may arm a fresh command that this failure
        // has nothing to do with.
        if result.is_err() {
            self.abort_pending_command();
        }
        result
    }

    /// Read exactly `out.len()` bytes of raw message stream into a caller
    /// buffer, following the same chunking rules as a logical read. The
    /// first chunk is copied whole, header included; continuation chunks
    /// are validated on their code byte only.
    pub fn read_raw(&self, out: &mut [u8]) -> Result<()> {
        if out.len() < 2 {
            return Err(CoreError::RawReadTooShort { length: out.len() });
        }
        let mut bus = lock(&self.bus);
        let result = self.raw_read_locked(&mut bus, out);
        if result.is_err() {
            self.abort_pending_command();
        }
        result
    }

    fn read_message_locked(&self, bus: &mut B) -> Result<()> {
        let mut inbound = lock(&self.inbound);
        let inbound = &mut *inbound;
        let mut retried = false;

        let (code, payload_length) = loop {
            let read_length = inbound.read_length;
            inbound.buf.ensure(read_length);
            if let Err(err) = bus.read_chunk(&mut inbound.buf.as_mut_slice()[..read_length]) {
                error!("failed to read from device: {err}");
                if !retried {
                    retried = true;
                    thread::sleep(self.config.read_retry_backoff);
                    continue;
                }
                return Err(err.into());
            }

            let header = match MessageHeader::parse(&inbound.buf.as_slice()[..HEADER_SIZE]) {
                Ok(header) => header,
                Err(err) => {
                    error!("message out of sync: {err}");
                    if !retried {
                        retried = true;
                        thread::sleep(self.config.read_retry_backoff);
                        continue;
                    }
                    return Err(err.into());
                }
            };

            match header.code {
                STATUS_OK => break (header.code, header.payload_length),
                STATUS_IDLE | STATUS_BUSY | STATUS_CONTINUED_READ => {
                    if header.code == STATUS_CONTINUED_READ {
                        warn!("out-of-sync continued read");
                    }
                    trace!(status = status_name(header.code), "nothing to read");
                    return Ok(());
                }
                STATUS_INVALID => {
                    warn!("invalid message status");
                    if !retried {
                        retried = true;
                        thread::sleep(self.config.read_retry_backoff);
                        continue;
                    }
                    // Nothing salvageable; handle it as an empty message.
                    break (STATUS_INVALID, 0);
                }
                code if is_status(code) => {
                    warn!(
                        status = status_name(code),
                        length = header.payload_length,
                        "error status in message header"
                    );
                    break (code, header.payload_length);
                }
                code => break (code, header.payload_length),
            }
        };

        let total_length = HEADER_SIZE + payload_length + 1;
        debug!(code, length = payload_length, "message received");

        // Predictive reading: the previous message sized this read. A
        // message that fit is complete; one byte short means only the
        // padding is missing; anything longer continues on the bus.
        if total_length <= inbound.read_length {
            // Complete in one chunk.
        } else if total_length - 1 == inbound.read_length {
            inbound.buf.ensure(total_length);
            inbound.buf.as_mut_slice()[total_length - 1] = MESSAGE_PADDING;
        } else {
            self.continued_read(bus, inbound, payload_length)?;
            let header = MessageHeader {
                code,
                payload_length,
            };
            inbound.buf.as_mut_slice()[..HEADER_SIZE].copy_from_slice(&header.encode());
        }

        let closing = inbound.buf.as_slice()[total_length - 1];
        if let Err(err) = check_padding(closing) {
            error!(offset = total_length - 1, "incomplete message: {err}");
            return Err(err.into());
        }

        // Size the next read to pick a same-sized message up in one chunk.
        let grown = total_length.max(MIN_READ_LENGTH);
        inbound.read_length = match self.config.rd_chunk_size {
            0 => grown,
            rd => grown.min(rd),
        };

        let payload = &inbound.buf.as_slice()[HEADER_SIZE..HEADER_SIZE + payload_length];
        self.dispatch_message(code, payload);
        Ok(())
    }

    fn continued_read(
        &self,
        bus: &mut B,
        inbound: &mut Inbound,
        payload_length: usize,
    ) -> Result<()> {
        let total_length = HEADER_SIZE + payload_length + 1;
        let mut remaining = total_length - inbound.read_length;

        inbound.buf.ensure(total_length + 1);

        let chunk_space = match self.config.rd_chunk_size {
            0 => remaining,
            rd => rd - 2,
        };
        let chunks = chunk_count(remaining, chunk_space);
        trace!(remaining, chunks, "continuing read");

        let mut offset = inbound.read_length;
        let mut temp = lock(&self.temp);
        for _ in 0..chunks {
            let xfer = remaining.min(chunk_space);

            // A single trailing byte can only be the padding sentinel;
            // write it directly instead of doing a bus transaction.
            if xfer == 1 {
                inbound.buf.as_mut_slice()[offset] = MESSAGE_PADDING;
                offset += 1;
                remaining -= 1;
                continue;
            }

            temp.ensure(xfer + 2);
            bus.read_chunk(&mut temp.as_mut_slice()[..xfer + 2])?;

            let chunk = &temp.as_slice()[..xfer + 2];
            if chunk[0] != MESSAGE_MARKER {
                error!(found = chunk[0], "continuation chunk out of sync");
                return Err(MessageError::InvalidMarker { found: chunk[0] }.into());
            }
            if chunk[1] != STATUS_CONTINUED_READ {
                error!(code = chunk[1], "continuation chunk out of sync");
                return Err(MessageError::UnexpectedContinuation { code: chunk[1] }.into());
            }
            inbound.buf.as_mut_slice()[offset..offset + xfer].copy_from_slice(&chunk[2..]);
            offset += xfer;
            remaining -= xfer;
        }
        Ok(())
    }

    fn raw_read_locked(&self, bus: &mut B, out: &mut [u8]) -> Result<()> {
        let mut remaining = out.len() - 2;
        let chunk_space = match self.config.rd_chunk_size {
            0 => remaining,
            rd => rd - 2,
        };
        let chunks = chunk_count(remaining, chunk_space);

        let mut offset = 0;
        let mut temp = lock(&self.temp);
        for idx in 0..chunks {
            let xfer = remaining.min(chunk_space);

            if xfer == 1 {
                out[offset] = MESSAGE_PADDING;
                offset += 1;
                remaining -= 1;
                continue;
            }

            temp.ensure(xfer + 2);
            bus.read_chunk(&mut temp.as_mut_slice()[..xfer + 2])?;

            let chunk = &temp.as_slice()[..xfer + 2];
            if idx == 0 {
                out[offset..offset + xfer + 2].copy_from_slice(chunk);
                offset += xfer + 2;
            } else {
                if chunk[1] != STATUS_CONTINUED_READ {
                    error!(code = chunk[1], "raw continuation chunk out of sync");
                    return Err(MessageError::UnexpectedContinuation { code: chunk[1] }.into());
                }
                out[offset..offset + xfer].copy_from_slice(&chunk[2..]);
                offset += xfer;
            }
            remaining -= xfer;
        }
        Ok(())
    }

    pub(crate) fn abort_pending_command(&self) {
        let mut state = lock(&self.command.state);
        if state.status == CommandStatus::Busy {
            state.status = CommandStatus::Error;
            state.completed = true;
            self.command.done.notify_all();
        }
    }
}
