use clap::{Parser, ValueEnum};
use common::{ServerStatsPeriodes, StatsConfig, StreamConfig};
use core::fmt;
use getset::{CopyGetters, Getters};
use std::time::Duration;

pub mod printer;

pub use printer::{MetricPrinter, PrintError};

/// serverstats: stream memory, load-average and CPU metrics of this host
#[derive(Debug, Parser, Getters, CopyGetters)]
#[command(name = "serverstats")]
#[command(about = "serverstats: stream host metrics to stdout", long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file. Missing files are ignored
    #[arg(short, long, default_value = "serverstats.toml")]
    #[getset(get = "pub")]
    config: String,
    /// Memory and swap sampling period, in milliseconds
    #[arg(long, value_name = "MS")]
    #[getset(get_copy = "pub")]
    mem_ms: Option<u64>,
    /// Load-average sampling period, in milliseconds
    #[arg(long, value_name = "MS")]
    #[getset(get_copy = "pub")]
    loadavg_ms: Option<u64>,
    /// CPU sampling interval, in milliseconds
    #[arg(long, value_name = "MS")]
    #[getset(get_copy = "pub")]
    cpu_ms: Option<u64>,
    /// Metrics buffered before producers wait for output
    #[arg(long)]
    #[getset(get_copy = "pub")]
    capacity: Option<usize>,
    /// Drop the rest of a batch when output stalls for this long, in milliseconds
    #[arg(long, value_name = "MS")]
    #[getset(get_copy = "pub")]
    send_timeout_ms: Option<u64>,
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain)]
    #[getset(get_copy = "pub")]
    format: OutputFormat,
    /// Do not prefix metric names with the host name
    #[arg(long)]
    #[getset(get_copy = "pub")]
    no_hostname: bool,
    /// Exit after printing this many metrics
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    #[getset(get_copy = "pub")]
    count: Option<u64>,
}

impl Cli {
    /// Applies the command-line overrides on top of file and environment
    /// configuration.
    pub fn apply_overrides(&self, config: &mut StatsConfig) {
        let periodes = *config.periodes();
        config.set_periodes(ServerStatsPeriodes::new(
            self.mem_ms.map_or(periodes.mem(), Duration::from_millis),
            self.loadavg_ms.map_or(periodes.load_avg(), Duration::from_millis),
            self.cpu_ms.map_or(periodes.cpu(), Duration::from_millis),
        ));

        let stream = *config.stream();
        config.set_stream(
            StreamConfig::builder()
                .capacity(self.capacity.unwrap_or(stream.capacity()))
                .send_timeout(
                    self.send_timeout_ms
                        .map(Duration::from_millis)
                        .or(stream.send_timeout()),
                )
                .build(),
        );
    }
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// `name value unit`, name padded to 15 columns
    Plain,
    /// One JSON object per line
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Plain => write!(f, "plain"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
