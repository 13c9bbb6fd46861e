//! Property tests pitting the engine's chunking against the simulator's.
//!
//! The simulator implements the device side of the framing
//! independently, so agreement across arbitrary payload sizes and chunk
//! bounds checks both partition arithmetics at once.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;

use touchwire_bus::chunk_count;
use touchwire_core::{CoreError, Engine, EngineConfig, Report, ReportConsumer};
use touchwire_message::codes::REPORT_DELTA;
use touchwire_sim::{sim_pair, DeviceProfile};

#[derive(Clone, Default)]
struct Capture {
    seen: Arc<Mutex<Vec<(u8, Vec<u8>)>>>,
}

impl ReportConsumer for Capture {
    fn handle_report(&self, report: Report<'_>) {
        self.seen
            .lock()
            .expect("capture lock should not be poisoned")
            .push((report.id, report.payload.to_vec()));
    }
}

proptest! {
    /// Any report payload survives the chunked read path, whatever the
    /// read bound. The second copy is read at whatever length the
    /// predictor learned from the first.
    #[test]
    fn prop_report_payloads_survive_chunked_reads(
        payload in prop::collection::vec(any::<u8>(), 0..300),
        rd in prop_oneof![Just(0usize), 4usize..64],
    ) {
        let consumer = Capture::default();
        let (bus, handle) = sim_pair(DeviceProfile::default());
        let config = EngineConfig::default().with_chunk_sizes(rd, 0);
        let engine = Engine::builder(bus)
            .config(config)
            .consumer(consumer.clone())
            .build();

        handle.push_report(REPORT_DELTA, &payload);
        handle.push_report(REPORT_DELTA, &payload);
        engine.read_message().expect("first read should succeed");
        engine.read_message().expect("second read should succeed");

        let seen = consumer.seen.lock().expect("capture lock");
        prop_assert_eq!(seen.len(), 2);
        prop_assert_eq!(&seen[0].1, &payload);
        prop_assert_eq!(&seen[1].1, &payload);
    }

    /// Any command payload is reassembled intact by the device, whatever
    /// the write bound.
    #[test]
    fn prop_command_payloads_survive_chunked_writes(
        payload in prop::collection::vec(any::<u8>(), 0..120),
        wr in prop_oneof![Just(0usize), 2usize..32],
    ) {
        let (bus, handle) = sim_pair(DeviceProfile::default());
        let config = EngineConfig {
            wr_chunk_size: wr,
            response_timeout: Duration::from_millis(1),
            write_chunk_delay: Duration::from_micros(1),
            ..Default::default()
        };
        let engine = Engine::builder(bus).config(config).build();

        // Nobody reads the response, so the wait times out; by then the
        // bytes have crossed the bus.
        let err = engine
            .write_message(0x7F, &payload, None)
            .expect_err("unread response should time the command out");
        prop_assert!(matches!(err, CoreError::Timeout { .. }), "expected timeout, got {:?}", err);
        prop_assert_eq!(handle.last_command(), Some((0x7F, payload)));
    }

    /// Chunk counts are minimal: enough transactions to cover the bytes,
    /// never one more than needed.
    #[test]
    fn prop_chunk_count_is_minimal_cover(
        remaining in 0usize..10_000,
        space in 1usize..512,
    ) {
        let count = chunk_count(remaining, space);
        prop_assert!(count * space >= remaining);
        prop_assert!((count - 1) * space < remaining.max(1));
    }
}
