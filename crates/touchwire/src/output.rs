use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use touchwire_message::codes::{mode_name, report_name};
use touchwire_message::{ApplicationInfo, BootInfo, Identification};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct IdentificationOutput {
    part_number: String,
    mode: u8,
    mode_name: &'static str,
    protocol_version: u8,
    build_id: u32,
    max_write_size: u16,
    write_chunk_size: usize,
    application: Option<ApplicationSummary>,
    bootloader: Option<BootSummary>,
}

#[derive(Serialize)]
struct ApplicationSummary {
    status: u16,
    max_x: u16,
    max_y: u16,
    image_rows: u16,
    image_cols: u16,
}

#[derive(Serialize)]
struct BootSummary {
    status: u8,
    asic_id: u16,
    max_write_payload_size: u16,
}

pub fn print_identification(
    id: &Identification,
    app_info: Option<ApplicationInfo>,
    boot_info: Option<BootInfo>,
    write_chunk_size: usize,
    format: OutputFormat,
) {
    let out = IdentificationOutput {
        part_number: id.part_number_string(),
        mode: id.mode,
        mode_name: mode_name(id.mode),
        protocol_version: id.version,
        build_id: id.build_id,
        max_write_size: id.max_write_size,
        write_chunk_size,
        application: app_info.map(|info| ApplicationSummary {
            status: info.status,
            max_x: info.max_x,
            max_y: info.max_y,
            image_rows: info.num_image_rows,
            image_cols: info.num_image_cols,
        }),
        bootloader: boot_info.map(|info| BootSummary {
            status: info.status,
            asic_id: info.asic_id,
            max_write_payload_size: info.max_write_payload_size,
        }),
    };

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["part number".to_string(), out.part_number.clone()])
                .add_row(vec![
                    "mode".to_string(),
                    format!("{} (0x{:02x})", out.mode_name, out.mode),
                ])
                .add_row(vec![
                    "protocol".to_string(),
                    out.protocol_version.to_string(),
                ])
                .add_row(vec!["build id".to_string(), out.build_id.to_string()])
                .add_row(vec![
                    "max write".to_string(),
                    out.max_write_size.to_string(),
                ])
                .add_row(vec![
                    "write chunk".to_string(),
                    out.write_chunk_size.to_string(),
                ]);
            if let Some(app) = &out.application {
                table.add_row(vec![
                    "touch area".to_string(),
                    format!("{}x{}", app.max_x, app.max_y),
                ]);
                table.add_row(vec![
                    "image grid".to_string(),
                    format!("{}x{}", app.image_rows, app.image_cols),
                ]);
            }
            if let Some(boot) = &out.bootloader {
                table.add_row(vec![
                    "asic id".to_string(),
                    format!("0x{:04x}", boot.asic_id),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} mode={} (0x{:02x}) build={} max_write={} write_chunk={}",
                out.part_number,
                out.mode_name,
                out.mode,
                out.build_id,
                out.max_write_size,
                out.write_chunk_size
            );
            if let Some(app) = &out.application {
                println!(
                    "application: status=0x{:04x} area={}x{} grid={}x{}",
                    app.status, app.max_x, app.max_y, app.image_rows, app.image_cols
                );
            }
            if let Some(boot) = &out.bootloader {
                println!(
                    "bootloader: status=0x{:02x} asic=0x{:04x} max_payload={}",
                    boot.status, boot.asic_id, boot.max_write_payload_size
                );
            }
        }
        OutputFormat::Raw => {
            println!("{}", out.part_number);
        }
    }
}

#[derive(Serialize)]
struct ReportOutput {
    seq: usize,
    report: u8,
    report_name: &'static str,
    payload_size: usize,
    payload: String,
}

pub fn print_report(seq: usize, id: u8, payload: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReportOutput {
                seq,
                report: id,
                report_name: report_name(id),
                payload_size: payload.len(),
                payload: hex_preview(payload),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "REPORT", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    seq.to_string(),
                    format!("{} (0x{:02x})", report_name(id), id),
                    payload.len().to_string(),
                    hex_preview(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "report {seq}: {} (0x{id:02x}) {} bytes [{}]",
                report_name(id),
                payload.len(),
                hex_preview(payload)
            );
        }
        OutputFormat::Raw => {
            println!("{}", hex_preview(payload));
        }
    }
}

/// First bytes of a payload as spaced hex, truncated past 16.
pub fn hex_preview(payload: &[u8]) -> String {
    const PREVIEW: usize = 16;
    let shown: Vec<String> = payload
        .iter()
        .take(PREVIEW)
        .map(|b| format!("{b:02x}"))
        .collect();
    let mut out = shown.join(" ");
    if payload.len() > PREVIEW {
        out.push_str(&format!(" .. ({} bytes)", payload.len()));
    }
    out
}
