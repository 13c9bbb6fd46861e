//! Host-side bus endpoint and the test-harness handle.
//!
//! [`sim_pair`] wires a [`SimBus`] and a [`SimHandle`] to one shared
//! device. The bus half goes to the engine; the handle half stays with
//! the test, which uses it to inject reports, watch the attention line,
//! and inspect what the device received.

use std::mem;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use touchwire_bus::{Bus, Result};

use crate::device::SimDevice;
use crate::profile::DeviceProfile;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SimShared {
    device: Mutex<SimDevice>,
    attention: Mutex<bool>,
    cond: Condvar,
}

impl SimShared {
    /// Run one device operation, then bridge the device's attention flag
    /// onto the condvar so waiters wake outside the device lock.
    fn with_device<R>(&self, f: impl FnOnce(&mut SimDevice) -> R) -> R {
        let mut device = lock(&self.device);
        let result = f(&mut device);
        let raise = device.take_attention();
        drop(device);
        if raise {
            *lock(&self.attention) = true;
            self.cond.notify_all();
        }
        result
    }
}

/// Host side of the simulated bus. Implements [`Bus`] so the engine owns
/// it like any hardware transport.
pub struct SimBus {
    shared: Arc<SimShared>,
}

impl Bus for SimBus {
    fn read_chunk(&mut self, dst: &mut [u8]) -> Result<()> {
        self.shared.with_device(|device| device.serve_read(dst));
        Ok(())
    }

    fn write_chunk(&mut self, src: &[u8]) -> Result<()> {
        self.shared.with_device(|device| device.handle_write(src));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sim"
    }
}

/// Test-harness handle onto the simulated device.
#[derive(Clone)]
pub struct SimHandle {
    shared: Arc<SimShared>,
}

impl SimHandle {
    /// Queue an asynchronous report, as if the device decided to speak.
    pub fn push_report(&self, id: u8, payload: &[u8]) {
        self.shared
            .with_device(|device| device.inject_report(id, payload));
    }

    /// Block until the device raises attention or the timeout passes.
    /// Consumes the attention edge when it fires.
    pub fn wait_attention(&self, timeout: Duration) -> bool {
        let flag = lock(&self.shared.attention);
        let (mut flag, _) = self
            .shared
            .cond
            .wait_timeout_while(flag, timeout, |raised| !*raised)
            .unwrap_or_else(PoisonError::into_inner);
        mem::take(&mut *flag)
    }

    /// Drop device-generated messages while muted. Injected reports
    /// still get through.
    pub fn set_muted(&self, muted: bool) {
        self.shared.with_device(|device| device.set_muted(muted));
    }

    /// Corrupt the marker on the next `reads` first chunks served.
    pub fn corrupt_reads(&self, reads: u32) {
        self.shared
            .with_device(|device| device.add_corrupt_reads(reads));
    }

    /// Edit the device profile mid-script. Subsequent identification and
    /// info responses reflect the change; the booting and switch-failure
    /// counters re-latch from the edited values.
    pub fn edit_profile(&self, f: impl FnOnce(&mut DeviceProfile)) {
        self.shared.with_device(|device| device.edit_profile(f));
    }

    /// Firmware mode the device is currently in.
    pub fn current_mode(&self) -> u8 {
        self.shared.with_device(|device| device.mode())
    }

    pub fn report_enabled(&self, id: u8) -> bool {
        self.shared.with_device(|device| device.report_enabled(id))
    }

    /// The last fully reassembled command with its payload.
    pub fn last_command(&self) -> Option<(u8, Vec<u8>)> {
        self.shared.with_device(|device| device.last_command())
    }

    /// Every command the device has executed, in order.
    pub fn command_log(&self) -> Vec<(u8, Vec<u8>)> {
        self.shared.with_device(|device| device.command_log())
    }
}

/// Build a connected bus/handle pair around a device profile.
pub fn sim_pair(profile: DeviceProfile) -> (SimBus, SimHandle) {
    let shared = Arc::new(SimShared {
        device: Mutex::new(SimDevice::new(profile)),
        attention: Mutex::new(false),
        cond: Condvar::new(),
    });
    (
        SimBus {
            shared: Arc::clone(&shared),
        },
        SimHandle { shared },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use touchwire_message::codes::{CMD_IDENTIFY, REPORT_TOUCH, STATUS_IDLE, STATUS_OK};
    use touchwire_message::MESSAGE_MARKER;

    #[test]
    fn test_write_raises_attention_and_serves_response() {
        let (mut bus, handle) = sim_pair(DeviceProfile::default());
        assert!(!handle.wait_attention(Duration::from_millis(1)));

        bus.write_chunk(&[CMD_IDENTIFY, 0, 0]).unwrap();
        assert!(handle.wait_attention(Duration::from_millis(100)));
        assert_eq!(handle.last_command(), Some((CMD_IDENTIFY, vec![])));

        let mut chunk = [0u8; 9];
        bus.read_chunk(&mut chunk).unwrap();
        assert_eq!(&chunk[..4], &[MESSAGE_MARKER, STATUS_OK, 24, 0]);
    }

    #[test]
    fn test_idle_read_when_nothing_pending() {
        let (mut bus, _handle) = sim_pair(DeviceProfile::default());
        let mut chunk = [0u8; 9];
        bus.read_chunk(&mut chunk).unwrap();
        assert_eq!(&chunk[..2], &[MESSAGE_MARKER, STATUS_IDLE]);
    }

    #[test]
    fn test_push_report_bypasses_mute() {
        let (mut bus, handle) = sim_pair(DeviceProfile::default());
        handle.set_muted(true);

        bus.write_chunk(&[CMD_IDENTIFY, 0, 0]).unwrap();
        assert!(!handle.wait_attention(Duration::from_millis(10)));

        handle.push_report(REPORT_TOUCH, &[1, 2, 3]);
        assert!(handle.wait_attention(Duration::from_millis(100)));

        let mut chunk = [0u8; 9];
        bus.read_chunk(&mut chunk).unwrap();
        assert_eq!(chunk[1], REPORT_TOUCH);
    }

    #[test]
    fn test_attention_edge_is_consumed() {
        let (mut bus, handle) = sim_pair(DeviceProfile::default());
        bus.write_chunk(&[CMD_IDENTIFY, 0, 0]).unwrap();
        assert!(handle.wait_attention(Duration::from_millis(100)));
        assert!(!handle.wait_attention(Duration::from_millis(1)));
    }
}
