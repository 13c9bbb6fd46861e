mod cmd;
mod exit;
mod logging;
mod output;
mod pump;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "touchwire", version, about = "Touch controller protocol CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_identify_subcommand() {
        let cli = Cli::try_parse_from(["touchwire", "identify", "--rd-chunk", "9"])
            .expect("identify args should parse");
        assert!(matches!(cli.command, Command::Identify(_)));
    }

    #[test]
    fn parses_monitor_subcommand() {
        let cli = Cli::try_parse_from([
            "touchwire",
            "monitor",
            "--reports",
            "3",
            "--interval-ms",
            "10",
        ])
        .expect("monitor args should parse");
        match cli.command {
            Command::Monitor(args) => {
                assert_eq!(args.reports, 3);
                assert_eq!(args.interval_ms, 10);
            }
            other => panic!("expected monitor, parsed {other:?}"),
        }
    }

    #[test]
    fn global_format_flag_applies_after_subcommand() {
        let cli = Cli::try_parse_from(["touchwire", "exercise", "--format", "json"])
            .expect("global flag should parse after the subcommand");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = Cli::try_parse_from(["touchwire", "--log-level", "loud", "version"])
            .expect_err("bogus level should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
