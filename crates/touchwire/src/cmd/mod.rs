use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod exercise;
pub mod identify;
pub mod monitor;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring the engine up against the simulated device and print what
    /// it identified.
    Identify(IdentifyArgs),
    /// Pump the attention line and print reports as they arrive.
    Monitor(MonitorArgs),
    /// Sweep chunk-size combinations against the simulated device.
    Exercise(ExerciseArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Identify(args) => identify::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Exercise(args) => exercise::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct IdentifyArgs {
    /// Largest single bus read, in bytes. Zero disables chunking.
    #[arg(long, default_value = "0")]
    pub rd_chunk: usize,
    /// Largest single bus write, in bytes. Zero disables chunking.
    #[arg(long, default_value = "0")]
    pub wr_chunk: usize,
    /// Write cap the simulated device advertises in its identification.
    #[arg(long, default_value = "256")]
    pub max_write: u16,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Number of reports the simulator scripts before stopping.
    #[arg(long, default_value = "5")]
    pub reports: usize,
    /// Pause between scripted reports, in milliseconds.
    #[arg(long, default_value = "50")]
    pub interval_ms: u64,
    /// Largest single bus read, in bytes. Zero disables chunking.
    #[arg(long, default_value = "0")]
    pub rd_chunk: usize,
}

#[derive(Args, Debug)]
pub struct ExerciseArgs {
    /// Largest report payload in the sweep.
    #[arg(long, default_value = "256")]
    pub payload_max: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
