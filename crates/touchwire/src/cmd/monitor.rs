use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use touchwire_core::{Engine, EngineConfig, Report, ReportConsumer};
use touchwire_message::codes::{REPORT_DELTA, REPORT_TOUCH};
use touchwire_sim::{sim_pair, DeviceProfile, SimHandle};
use tracing::info;

use crate::cmd::MonitorArgs;
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT};
use crate::output::{print_report, OutputFormat};

/// Hands reports from the engine's dispatch context to the printing
/// loop. Handlers must not block, so printing happens outside.
struct Forwarder {
    tx: mpsc::Sender<(u8, Vec<u8>)>,
}

impl ReportConsumer for Forwarder {
    fn handle_report(&self, report: Report<'_>) {
        let _ = self.tx.send((report.id, report.payload.to_vec()));
    }
}

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let (bus, handle) = sim_pair(DeviceProfile::default());
    let (tx, rx) = mpsc::channel();
    let config = EngineConfig::default().with_chunk_sizes(args.rd_chunk, 0);
    let engine = Engine::builder(bus)
        .config(config)
        .consumer(Forwarder { tx: tx.clone() })
        .touch_handler(Forwarder { tx })
        .build();

    let interval = Duration::from_millis(args.interval_ms);
    let scripter = spawn_scripter(handle.clone(), args.reports, interval);

    info!(
        reports = args.reports,
        interval_ms = args.interval_ms,
        "monitoring the simulated attention line"
    );

    let deadline = Instant::now() + interval * args.reports as u32 + Duration::from_secs(2);
    let mut seen = 0usize;
    while seen < args.reports {
        if Instant::now() >= deadline {
            let _ = scripter.join();
            return Err(CliError::new(
                TIMEOUT,
                format!(
                    "received {seen} of {} reports before the deadline",
                    args.reports
                ),
            ));
        }
        if handle.wait_attention(Duration::from_millis(10)) {
            let _ = engine.read_message();
        }
        while let Ok((id, payload)) = rx.try_recv() {
            print_report(seen, id, &payload, format);
            seen += 1;
        }
    }

    scripter
        .join()
        .map_err(|_| CliError::new(INTERNAL, "report scripter panicked"))?;
    Ok(SUCCESS)
}

fn spawn_scripter(
    handle: SimHandle,
    reports: usize,
    interval: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for seq in 0..reports {
            let id = if seq % 2 == 0 {
                REPORT_TOUCH
            } else {
                REPORT_DELTA
            };
            let payload = vec![seq as u8, 0xA0 | (seq as u8 & 0x0F), 0x17];
            handle.push_report(id, &payload);
            thread::sleep(interval);
        }
    })
}
