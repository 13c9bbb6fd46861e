use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::ThreadId;
use std::time::Duration;

use touchwire_bus::Bus;
use touchwire_message::codes::{CMD_NONE, STATUS_INVALID};
use touchwire_message::{
    ApplicationInfo, BootInfo, Identification, HEADER_SIZE, IDENTIFICATION_SIZE,
};

use crate::buffer::MessageBuffer;
use crate::config::{EngineConfig, ROMBOOT_DOWNLOAD_UNIT};
use crate::dispatch::{PollScheduler, ReportConsumer};
use crate::helper::HelperSlot;
use crate::reader::MIN_READ_LENGTH;

// A poisoned lock still holds consistent state: every critical section
// restores its invariants on all exit paths. Take the guard regardless.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State of the single in-flight command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// No command outstanding.
    Idle,
    /// A command was written and its response is pending.
    Busy,
    /// The command failed before a usable response arrived.
    Error,
}

pub(crate) struct CommandState {
    pub(crate) status: CommandStatus,
    pub(crate) command: u8,
    pub(crate) response_code: u8,
    pub(crate) completed: bool,
}

/// Command status plus the completion signal the read path fires.
pub(crate) struct CommandGate {
    pub(crate) state: Mutex<CommandState>,
    pub(crate) done: Condvar,
}

impl CommandGate {
    fn new() -> Self {
        Self {
            state: Mutex::new(CommandState {
                status: CommandStatus::Idle,
                command: CMD_NONE,
                response_code: STATUS_INVALID,
                completed: false,
            }),
            done: Condvar::new(),
        }
    }
}

/// Inbound message buffer plus the predictive read length.
pub(crate) struct Inbound {
    pub(crate) buf: MessageBuffer,
    /// How many bytes the next first chunk reads. Tracks the previous
    /// message's total length, clamped to the chunk bound.
    pub(crate) read_length: usize,
}

/// Buffered payload of the response in flight.
#[derive(Default)]
pub(crate) struct ResponseSlot {
    pub(crate) data: Vec<u8>,
}

/// Retained device information, refreshed by identify traffic.
pub(crate) struct DeviceState {
    /// Raw identification image; short identify payloads overwrite only
    /// a prefix.
    pub(crate) id_image: [u8; IDENTIFICATION_SIZE],
    pub(crate) app_info: Option<ApplicationInfo>,
    pub(crate) boot_info: Option<BootInfo>,
}

/// Wakes threads blocked on the next asynchronous report.
pub(crate) struct ReportNotifier {
    slot: Mutex<Option<u8>>,
    cond: Condvar,
}

impl ReportNotifier {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn record(&self, id: u8) {
        *lock(&self.slot) = Some(id);
        self.cond.notify_all();
    }

    pub(crate) fn wait(&self, timeout: Duration) -> Option<u8> {
        let guard = lock(&self.slot);
        let (mut guard, _timed_out) = self
            .cond
            .wait_timeout_while(guard, timeout, |slot| slot.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        guard.take()
    }
}

/// The message engine: one logical device on one bus.
///
/// The engine owns the bus and serializes every complete logical read or
/// write over it. A reader thread feeds [`Engine::read_message`] whenever
/// the device signals attention; any other thread issues commands through
/// [`Engine::write_message`] or the operations layer. All methods take
/// `&self`; share the engine behind an `Arc`.
pub struct Engine<B: Bus> {
    pub(crate) config: EngineConfig,
    pub(crate) bus: Mutex<B>,
    /// Serializes the command/response dance end to end. Always acquired
    /// before the bus.
    pub(crate) command_mutex: Mutex<()>,
    pub(crate) inbound: Mutex<Inbound>,
    pub(crate) outbound: Mutex<MessageBuffer>,
    pub(crate) temp: Mutex<MessageBuffer>,
    pub(crate) response: Mutex<ResponseSlot>,
    pub(crate) command: CommandGate,
    pub(crate) device: Mutex<DeviceState>,
    /// Effective write chunk size after identify renegotiation.
    pub(crate) wr_chunk_size: AtomicUsize,
    pub(crate) host_download: AtomicBool,
    pub(crate) host_download_capable: bool,
    pub(crate) helper: HelperSlot,
    pub(crate) notifier: ReportNotifier,
    pub(crate) consumers: Vec<Box<dyn ReportConsumer>>,
    pub(crate) touch_handler: Option<Box<dyn ReportConsumer>>,
    pub(crate) poll: Option<Box<dyn PollScheduler>>,
    pub(crate) reader_thread: Mutex<Option<ThreadId>>,
    pub(crate) identify_mutex: Mutex<()>,
    pub(crate) reset_mutex: Mutex<()>,
}

impl<B: Bus> Engine<B> {
    /// Create an engine with no consumers wired in.
    pub fn new(bus: B, config: EngineConfig) -> Self {
        Engine::builder(bus).config(config).build()
    }

    /// Start building an engine around `bus`.
    pub fn builder(bus: B) -> EngineBuilder<B> {
        EngineBuilder {
            bus,
            config: EngineConfig::default(),
            consumers: Vec::new(),
            touch_handler: None,
            poll: None,
            host_download_capable: false,
        }
    }

    /// Current command driver status.
    pub fn command_status(&self) -> CommandStatus {
        lock(&self.command.state).status
    }

    /// Most recent identification the device reported.
    pub fn identification(&self) -> Identification {
        Identification::from_payload(&lock(&self.device).id_image)
    }

    /// Application info from the latest fetch, if any.
    pub fn application_info(&self) -> Option<ApplicationInfo> {
        lock(&self.device).app_info
    }

    /// Boot info from the latest fetch, if any.
    pub fn boot_info(&self) -> Option<BootInfo> {
        lock(&self.device).boot_info
    }

    /// Effective write chunk size (zero means unbounded).
    pub fn write_chunk_size(&self) -> usize {
        self.wr_chunk_size.load(Ordering::Relaxed)
    }

    /// Block until the dispatch engine records an asynchronous report,
    /// and return its id. Touch reports take the dedicated fast path and
    /// do not satisfy the wait.
    pub fn wait_for_report(&self, timeout: Duration) -> Option<u8> {
        self.notifier.wait(timeout)
    }

    /// Mark a host-download session active or finished. While active,
    /// identify reports are absorbed but not routed; the downloader owns
    /// the mode transitions it provokes.
    pub fn set_host_download_active(&self, active: bool) {
        self.host_download.store(active, Ordering::Release);
    }

    /// True while a host-download session is active.
    pub fn host_download_active(&self) -> bool {
        self.host_download.load(Ordering::Acquire)
    }

    /// Tear the engine down and hand the bus back.
    pub fn into_bus(self) -> B {
        self.bus.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builder wiring consumers and collaborators into an [`Engine`].
pub struct EngineBuilder<B: Bus> {
    bus: B,
    config: EngineConfig,
    consumers: Vec<Box<dyn ReportConsumer>>,
    touch_handler: Option<Box<dyn ReportConsumer>>,
    poll: Option<Box<dyn PollScheduler>>,
    host_download_capable: bool,
}

impl<B: Bus> EngineBuilder<B> {
    /// Use `config` instead of the defaults.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a report consumer; dispatch order follows registration.
    pub fn consumer(mut self, consumer: impl ReportConsumer + 'static) -> Self {
        self.consumers.push(Box::new(consumer));
        self
    }

    /// Install the dedicated touch-report fast path.
    pub fn touch_handler(mut self, handler: impl ReportConsumer + 'static) -> Self {
        self.touch_handler = Some(Box::new(handler));
        self
    }

    /// Install a scheduler for delayed polls on buses without an
    /// attention line.
    pub fn poll_scheduler(mut self, scheduler: impl PollScheduler + 'static) -> Self {
        self.poll = Some(Box::new(scheduler));
        self
    }

    /// The device boots by host download: resets complete without a
    /// response and a rom-bootloader identify parks the download task.
    pub fn host_download_capable(mut self, capable: bool) -> Self {
        self.host_download_capable = capable;
        self
    }

    /// Build the engine.
    pub fn build(self) -> Engine<B> {
        let mut config = self.config;
        // Chunk sizes too small to carry the per-chunk overhead cannot
        // make progress.
        if config.rd_chunk_size != 0 {
            config.rd_chunk_size = config.rd_chunk_size.max(HEADER_SIZE);
        }
        if config.wr_chunk_size != 0 {
            config.wr_chunk_size = config.wr_chunk_size.max(2);
        }
        if config.hdl_wr_chunk_size != 0 {
            config.hdl_wr_chunk_size = config.hdl_wr_chunk_size.max(ROMBOOT_DOWNLOAD_UNIT + 1);
        }

        let wr_chunk_size = AtomicUsize::new(config.wr_chunk_size);
        Engine {
            config,
            bus: Mutex::new(self.bus),
            command_mutex: Mutex::new(()),
            inbound: Mutex::new(Inbound {
                buf: MessageBuffer::new(),
                read_length: MIN_READ_LENGTH,
            }),
            outbound: Mutex::new(MessageBuffer::new()),
            temp: Mutex::new(MessageBuffer::new()),
            response: Mutex::new(ResponseSlot::default()),
            command: CommandGate::new(),
            device: Mutex::new(DeviceState {
                id_image: [0; IDENTIFICATION_SIZE],
                app_info: None,
                boot_info: None,
            }),
            wr_chunk_size,
            host_download: AtomicBool::new(false),
            host_download_capable: self.host_download_capable,
            helper: HelperSlot::new(),
            notifier: ReportNotifier::new(),
            consumers: self.consumers,
            touch_handler: self.touch_handler,
            poll: self.poll,
            reader_thread: Mutex::new(None),
            identify_mutex: Mutex::new(()),
            reset_mutex: Mutex::new(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Report;
    use touchwire_bus::Result as BusResult;

    struct NullBus;

    impl Bus for NullBus {
        fn read_chunk(&mut self, _dst: &mut [u8]) -> BusResult<()> {
            Err(touchwire_bus::BusError::Detached)
        }

        fn write_chunk(&mut self, _src: &[u8]) -> BusResult<()> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "null"
        }
    }

    struct NullConsumer;

    impl ReportConsumer for NullConsumer {
        fn handle_report(&self, _report: Report<'_>) {}
    }

    #[test]
    fn test_new_engine_is_idle() {
        let engine = Engine::new(NullBus, EngineConfig::default());
        assert_eq!(engine.command_status(), CommandStatus::Idle);
        assert_eq!(engine.identification(), Identification::default());
        assert!(engine.application_info().is_none());
        assert!(engine.boot_info().is_none());
        assert!(!engine.host_download_active());
        assert_eq!(lock(&engine.inbound).read_length, MIN_READ_LENGTH);
    }

    #[test]
    fn test_builder_wires_consumers() {
        let engine = Engine::builder(NullBus)
            .consumer(NullConsumer)
            .consumer(NullConsumer)
            .touch_handler(NullConsumer)
            .host_download_capable(true)
            .build();
        assert_eq!(engine.consumers.len(), 2);
        assert!(engine.touch_handler.is_some());
        assert!(engine.host_download_capable);
    }

    #[test]
    fn test_degenerate_chunk_sizes_are_bumped() {
        let config = EngineConfig {
            rd_chunk_size: 2,
            wr_chunk_size: 1,
            hdl_wr_chunk_size: 8,
            ..Default::default()
        };
        let engine = Engine::new(NullBus, config);
        assert_eq!(engine.config.rd_chunk_size, HEADER_SIZE);
        assert_eq!(engine.config.wr_chunk_size, 2);
        assert_eq!(engine.config.hdl_wr_chunk_size, ROMBOOT_DOWNLOAD_UNIT + 1);
        // Zero stays zero: chunking disabled.
        let engine = Engine::new(NullBus, EngineConfig::default());
        assert_eq!(engine.config.rd_chunk_size, 0);
    }

    #[test]
    fn test_into_bus_returns_transport() {
        let engine = Engine::new(NullBus, EngineConfig::default());
        let bus = engine.into_bus();
        assert_eq!(bus.name(), "null");
    }

    #[test]
    fn test_report_notifier_roundtrip() {
        let notifier = ReportNotifier::new();
        assert_eq!(notifier.wait(Duration::from_millis(1)), None);
        notifier.record(0x12);
        assert_eq!(notifier.wait(Duration::from_millis(1)), Some(0x12));
        // Taking the slot leaves it empty for the next wait.
        assert_eq!(notifier.wait(Duration::from_millis(1)), None);
    }
}
