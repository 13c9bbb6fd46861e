//! Diagnostics go to stderr so protocol traffic never mixes with the
//! table or JSON output on stdout.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// The flag level applies to the touchwire crates only; everything else
/// stays at `warn` unless `RUST_LOG` overrides the whole filter.
fn default_filter(level: LogLevel) -> String {
    let lvl = level.directive();
    format!(
        "warn,touchwire={lvl},touchwire_core={lvl},touchwire_bus={lvl},\
         touchwire_message={lvl},touchwire_sim={lvl}"
    )
}

pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_scopes_flag_level_to_touchwire_crates() {
        let filter = default_filter(LogLevel::Trace);
        assert!(filter.starts_with("warn,"));
        assert!(filter.contains("touchwire_core=trace"));
        assert!(filter.contains("touchwire_sim=trace"));
        // The filter parses as env-filter directives.
        assert!(EnvFilter::try_new(&filter).is_ok());
    }

    #[test]
    fn off_silences_touchwire_without_touching_the_rest() {
        let filter = default_filter(LogLevel::Off);
        assert!(filter.starts_with("warn,"));
        assert!(filter.contains("touchwire=off"));
    }
}
