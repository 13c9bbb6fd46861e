use std::sync::{Arc, Mutex};
use std::time::Duration;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use touchwire_core::{Engine, EngineConfig, Report, ReportConsumer};
use touchwire_message::codes::{DynamicConfigId, REPORT_RAW};
use touchwire_sim::{sim_pair, DeviceProfile};
use tracing::{debug, warn};

use crate::cmd::ExerciseArgs;
use crate::exit::{CliResult, CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;
use crate::pump::AttentionPump;

const RD_SWEEP: [usize; 5] = [0, 9, 16, 32, 64];
const WR_SWEEP: [usize; 4] = [0, 3, 8, 32];

#[derive(Clone, Default)]
struct Capture {
    seen: Arc<Mutex<Vec<(u8, Vec<u8>)>>>,
}

impl Capture {
    fn take_last(&self) -> Option<(u8, Vec<u8>)> {
        self.seen.lock().ok()?.pop()
    }
}

impl ReportConsumer for Capture {
    fn handle_report(&self, report: Report<'_>) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((report.id, report.payload.to_vec()));
        }
    }
}

#[derive(Serialize)]
struct SweepRow {
    rd_chunk: usize,
    wr_chunk: usize,
    passed: usize,
    failed: usize,
    detail: Option<String>,
}

#[derive(Serialize)]
struct ExerciseOutput {
    rows: Vec<SweepRow>,
    overall: &'static str,
}

pub fn run(args: ExerciseArgs, format: OutputFormat) -> CliResult<i32> {
    let payload_lengths = payload_lengths(args.payload_max);

    let mut rows = Vec::new();
    for rd in RD_SWEEP {
        for wr in WR_SWEEP {
            rows.push(exercise_combo(rd, wr, &payload_lengths));
        }
    }

    let any_failed = rows.iter().any(|row| row.failed > 0);
    let output = ExerciseOutput {
        rows,
        overall: if any_failed { "fail" } else { "pass" },
    };
    print_sweep(&output, format);

    if any_failed {
        Ok(CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

/// Lengths around the initial read length and the common chunk bounds.
fn payload_lengths(max: usize) -> Vec<usize> {
    let candidates = [0, 1, 4, 5, 14, 63, 64, max];
    let mut lengths: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&len| len <= max)
        .collect();
    lengths.dedup();
    lengths
}

fn exercise_combo(rd: usize, wr: usize, payload_lengths: &[usize]) -> SweepRow {
    let capture = Capture::default();
    let (bus, handle) = sim_pair(DeviceProfile::default());
    let config = EngineConfig {
        rd_chunk_size: rd,
        wr_chunk_size: wr,
        write_chunk_delay: Duration::from_micros(10),
        response_timeout: Duration::from_millis(500),
        // Reads come from whichever thread is handy here.
        polling: true,
        ..Default::default()
    };
    let engine = Arc::new(
        Engine::builder(bus)
            .config(config)
            .consumer(capture.clone())
            .build(),
    );

    let mut passed = 0usize;
    let mut failed = 0usize;
    let mut detail: Option<String> = None;

    // Report payloads served back through the chunked read path.
    for (case, &len) in payload_lengths.iter().enumerate() {
        let payload = pattern(case, len);
        handle.push_report(REPORT_RAW, &payload);
        let read = engine.read_message();
        let captured = capture.take_last();
        if read.is_ok() && captured == Some((REPORT_RAW, payload)) {
            passed += 1;
        } else {
            failed += 1;
            if detail.is_none() {
                detail = Some(match read {
                    Err(err) => format!("{len}-byte report: {err}"),
                    Ok(()) => format!("{len}-byte report came back changed"),
                });
            }
            debug!(rd, wr, len, "report case failed");
        }
    }

    // One full command round trip through the write chunking.
    let pump = AttentionPump::start(&engine, &handle);
    let roundtrip = engine
        .set_dynamic_config(DynamicConfigId::ChargerConnected, 0x1234)
        .and_then(|_| engine.get_dynamic_config(DynamicConfigId::ChargerConnected));
    drop(pump);

    match roundtrip {
        Ok(0x1234) => passed += 1,
        Ok(other) => {
            failed += 1;
            detail.get_or_insert_with(|| format!("dynamic config read back 0x{other:04x}"));
        }
        Err(err) => {
            failed += 1;
            detail.get_or_insert_with(|| format!("command round trip: {err}"));
        }
    }

    if failed > 0 {
        warn!(rd, wr, failed, "sweep combination failed");
    }

    SweepRow {
        rd_chunk: rd,
        wr_chunk: wr,
        passed,
        failed,
        detail,
    }
}

fn pattern(case: usize, len: usize) -> Vec<u8> {
    (0..len).map(|i| (case * 31 + i * 7) as u8).collect()
}

fn print_sweep(output: &ExerciseOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["RD", "WR", "PASSED", "FAILED", "DETAIL"]);
            for row in &output.rows {
                table.add_row(vec![
                    chunk_label(row.rd_chunk),
                    chunk_label(row.wr_chunk),
                    row.passed.to_string(),
                    row.failed.to_string(),
                    row.detail.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
            println!("overall: {}", output.overall);
        }
        OutputFormat::Pretty => {
            for row in &output.rows {
                println!(
                    "rd={} wr={} passed={} failed={}{}",
                    chunk_label(row.rd_chunk),
                    chunk_label(row.wr_chunk),
                    row.passed,
                    row.failed,
                    row.detail
                        .as_deref()
                        .map(|detail| format!(" ({detail})"))
                        .unwrap_or_default()
                );
            }
            println!("overall: {}", output.overall);
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn chunk_label(size: usize) -> String {
    if size == 0 {
        "unbounded".to_string()
    } else {
        size.to_string()
    }
}
