//! End-to-end tests driving the engine against the in-process simulator.
//!
//! A pump thread plays the role of the attention interrupt handler:
//! whenever the simulated device raises attention, the pump calls
//! [`Engine::read_message`], exactly like the hardware-facing glue would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use touchwire_core::{
    CommandStatus, CoreError, Engine, EngineConfig, Report, ReportConsumer, TargetMode,
};
use touchwire_message::codes::{
    DynamicConfigId, CMD_ENTER_PRODUCTION_TEST_MODE, CMD_GET_APPLICATION_INFO, CMD_RESET,
    CMD_SET_DYNAMIC_CONFIG, MODE_APPLICATION_FIRMWARE, MODE_BOOTLOADER, MODE_PRODUCTION_TEST,
    REPORT_DELTA, REPORT_RAW, REPORT_TOUCH,
};
use touchwire_message::AppStatus;
use touchwire_sim::{sim_pair, DeviceProfile, SimBus, SimHandle};

/// Forwards the simulated attention line into the engine's read path.
struct AttentionPump {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl AttentionPump {
    fn start(engine: &Arc<Engine<SimBus>>, handle: &SimHandle) -> Self {
        let engine = Arc::clone(engine);
        let handle = handle.clone();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_seen = Arc::clone(&stop);
        let thread = thread::spawn(move || {
            while !stop_seen.load(Ordering::Relaxed) {
                if handle.wait_attention(Duration::from_millis(5)) {
                    let _ = engine.read_message();
                }
            }
        });
        Self {
            stop,
            thread: Some(thread),
        }
    }

    fn shutdown(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            thread.join().expect("pump thread should exit cleanly");
        }
    }
}

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

fn engine_pair(
    profile: DeviceProfile,
    config: EngineConfig,
) -> (Arc<Engine<SimBus>>, SimHandle) {
    let (bus, handle) = sim_pair(profile);
    let engine = Arc::new(Engine::builder(bus).config(config).build());
    (engine, handle)
}

#[test]
fn identify_negotiates_write_chunk_size() {
    // rd of 9 forces the identify response across continued reads.
    let config = EngineConfig::default().with_chunk_sizes(9, 512);
    let (engine, handle) = engine_pair(DeviceProfile::default(), config);
    let pump = AttentionPump::start(&engine, &handle);

    let id = engine.identify().expect("identify should succeed");

    assert_eq!(id.part_number_string(), "TW4150");
    assert_eq!(id.mode, MODE_APPLICATION_FIRMWARE);
    // The device advertises 256, below the configured 512.
    assert_eq!(engine.write_chunk_size(), 256);
    let info = engine
        .application_info()
        .expect("application info should be retained");
    assert_eq!(info.max_x, 719);
    assert_eq!(info.max_y, 1599);

    pump.shutdown();
}

#[test]
fn commands_split_across_write_chunks() {
    let config = EngineConfig::default().with_chunk_sizes(0, 3);
    let (engine, handle) = engine_pair(DeviceProfile::default(), config);
    let pump = AttentionPump::start(&engine, &handle);

    engine
        .set_dynamic_config(DynamicConfigId::ChargerConnected, 0x1234)
        .expect("set should succeed");

    assert_eq!(
        handle.last_command(),
        Some((CMD_SET_DYNAMIC_CONFIG, vec![0x07, 0x34, 0x12]))
    );

    let value = engine
        .get_dynamic_config(DynamicConfigId::ChargerConnected)
        .expect("get should succeed");
    assert_eq!(value, 0x1234);

    pump.shutdown();
}

#[test]
fn reset_completes_through_identify_report() {
    let (engine, handle) = engine_pair(DeviceProfile::default(), EngineConfig::default());
    let pump = AttentionPump::start(&engine, &handle);

    engine.reset().expect("reset should succeed");

    assert_eq!(engine.identification().mode, MODE_APPLICATION_FIRMWARE);
    // The device answered with an identify report, never a response.
    assert_eq!(handle.command_log(), vec![(CMD_RESET, vec![])]);

    pump.shutdown();
}

#[test]
fn muted_device_times_out_and_recovers() {
    let config = EngineConfig::default().with_response_timeout(Duration::from_millis(50));
    let (engine, handle) = engine_pair(DeviceProfile::default(), config);
    let pump = AttentionPump::start(&engine, &handle);

    handle.set_muted(true);
    let err = engine.rezero().expect_err("muted device should time out");
    assert!(matches!(err, CoreError::Timeout { .. }));
    assert_eq!(engine.command_status(), CommandStatus::Idle);

    handle.set_muted(false);
    engine.rezero().expect("unmuted device should answer");

    pump.shutdown();
}

#[test]
fn corrupted_first_chunk_is_retried() {
    let (engine, handle) = engine_pair(DeviceProfile::default(), EngineConfig::default());
    let pump = AttentionPump::start(&engine, &handle);

    handle.corrupt_reads(1);
    engine.rezero().expect("retry should recover the response");

    pump.shutdown();
}

#[test]
fn application_info_polls_while_booting() {
    let profile = DeviceProfile {
        booting_polls: 2,
        ..Default::default()
    };
    let config = EngineConfig {
        app_status_poll_period: Duration::from_millis(5),
        app_status_poll_timeout: Duration::from_millis(200),
        ..Default::default()
    };
    let (engine, handle) = engine_pair(profile, config);
    let pump = AttentionPump::start(&engine, &handle);

    let info = engine.get_application_info().expect("info should settle");

    assert_eq!(info.app_status(), AppStatus::Ok);
    let polls = handle
        .command_log()
        .iter()
        .filter(|(command, _)| *command == CMD_GET_APPLICATION_INFO)
        .count();
    assert_eq!(polls, 3);

    pump.shutdown();
}

#[test]
fn mode_switch_round_trip() {
    let (engine, handle) = engine_pair(DeviceProfile::default(), EngineConfig::default());
    let pump = AttentionPump::start(&engine, &handle);

    engine.identify().expect("identify should succeed");

    engine
        .switch_mode(TargetMode::Bootloader)
        .expect("switch to bootloader should succeed");
    assert_eq!(handle.current_mode(), MODE_BOOTLOADER);
    assert_eq!(engine.identification().mode, MODE_BOOTLOADER);
    assert!(engine.boot_info().is_some());

    engine
        .switch_mode(TargetMode::Application)
        .expect("switch back should succeed");
    assert_eq!(handle.current_mode(), MODE_APPLICATION_FIRMWARE);
    assert_eq!(engine.identification().mode, MODE_APPLICATION_FIRMWARE);

    pump.shutdown();
}

#[test]
fn failed_mode_switch_is_retried() {
    let profile = DeviceProfile {
        fail_mode_switches: 1,
        ..Default::default()
    };
    let (engine, handle) = engine_pair(profile, EngineConfig::default());
    let pump = AttentionPump::start(&engine, &handle);

    engine
        .enter_production_test_mode()
        .expect("second attempt should stick");

    assert_eq!(handle.current_mode(), MODE_PRODUCTION_TEST);
    let attempts = handle
        .command_log()
        .iter()
        .filter(|(command, _)| *command == CMD_ENTER_PRODUCTION_TEST_MODE)
        .count();
    assert_eq!(attempts, 2);

    pump.shutdown();
}

#[test]
fn reports_route_to_handler_and_consumers() {
    let touch = Capture::default();
    let other = Capture::default();
    let (bus, handle) = sim_pair(DeviceProfile::default());
    let engine = Arc::new(
        Engine::builder(bus)
            .touch_handler(touch.clone())
            .consumer(other.clone())
            .build(),
    );
    let pump = AttentionPump::start(&engine, &handle);

    handle.push_report(REPORT_TOUCH, &[0xAA, 0xBB]);
    handle.push_report(REPORT_DELTA, &[0x01]);

    assert_eq!(
        engine.wait_for_report(Duration::from_secs(1)),
        Some(REPORT_DELTA)
    );

    pump.shutdown();

    assert_eq!(
        touch.seen.lock().expect("touch capture lock").as_slice(),
        &[(REPORT_TOUCH, vec![0xAA, 0xBB])]
    );
    assert_eq!(
        other.seen.lock().expect("capture lock").as_slice(),
        &[(REPORT_DELTA, vec![0x01])]
    );
}

#[test]
fn large_report_crosses_continued_reads() {
    let consumer = Capture::default();
    let (bus, handle) = sim_pair(DeviceProfile::default());
    let config = EngineConfig::default().with_chunk_sizes(16, 0);
    let engine = Arc::new(
        Engine::builder(bus)
            .config(config)
            .consumer(consumer.clone())
            .build(),
    );
    let pump = AttentionPump::start(&engine, &handle);

    let payload: Vec<u8> = (0..200).map(|i| i as u8).collect();
    handle.push_report(REPORT_RAW, &payload);

    assert_eq!(
        engine.wait_for_report(Duration::from_secs(1)),
        Some(REPORT_RAW)
    );

    pump.shutdown();

    let seen = consumer.seen.lock().expect("capture lock");
    assert_eq!(seen.as_slice(), &[(REPORT_RAW, payload)]);
}

#[test]
fn report_stream_control_reaches_the_device() {
    let (engine, handle) = engine_pair(DeviceProfile::default(), EngineConfig::default());
    let pump = AttentionPump::start(&engine, &handle);

    engine.enable_report(REPORT_RAW).expect("enable should succeed");
    assert!(handle.report_enabled(REPORT_RAW));
    engine
        .disable_report(REPORT_RAW)
        .expect("disable should succeed");
    assert!(!handle.report_enabled(REPORT_RAW));

    pump.shutdown();
}

#[test]
fn wait_for_report_without_traffic_times_out() {
    let (engine, _handle) = engine_pair(DeviceProfile::default(), EngineConfig::default());
    assert_eq!(engine.wait_for_report(Duration::from_millis(20)), None);
}
