//! Configuration for the metric producers and the metric stream.

use crate::util::time::duration_ms;
use config::{Config, Environment, File, FileFormat};
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use typed_builder::TypedBuilder;

/// Cadence used by every producer when nothing else is configured.
pub const DEFAULT_PERIODE: Duration = Duration::from_secs(1);

/// Number of metrics the stream buffers before producers start to wait on
/// the consumer.
pub const DEFAULT_STREAM_CAPACITY: usize = 64;

/// Upper bound on a single CPU counter read.
pub const DEFAULT_CPU_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Prefix of the environment variables that override file configuration,
/// e.g. `SERVERSTATS__PERIODES__MEM_MS=200`.
pub const ENV_PREFIX: &str = "SERVERSTATS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Period `{field}` must be greater than zero")]
    InvalidPeriod { field: &'static str },

    #[error("Stream capacity must be at least 1")]
    InvalidCapacity,
}

/// Sampling cadence of each producer family.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, CopyGetters, TypedBuilder,
)]
#[getset(get_copy = "pub")]
#[serde(default)]
pub struct ServerStatsPeriodes {
    /// Memory and swap producer.
    #[serde(rename = "mem_ms", with = "duration_ms")]
    #[builder(default = DEFAULT_PERIODE)]
    mem: Duration,
    /// Load-average producer.
    #[serde(rename = "load_avg_ms", with = "duration_ms")]
    #[builder(default = DEFAULT_PERIODE)]
    load_avg: Duration,
    /// CPU sampler interval.
    #[serde(rename = "cpu_ms", with = "duration_ms")]
    #[builder(default = DEFAULT_PERIODE)]
    cpu: Duration,
}

impl Default for ServerStatsPeriodes {
    fn default() -> Self {
        Self {
            mem: DEFAULT_PERIODE,
            load_avg: DEFAULT_PERIODE,
            cpu: DEFAULT_PERIODE,
        }
    }
}

impl ServerStatsPeriodes {
    pub fn new(mem: Duration, load_avg: Duration, cpu: Duration) -> Self {
        Self { mem, load_avg, cpu }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, periode) in [
            ("mem", self.mem),
            ("load_avg", self.load_avg),
            ("cpu", self.cpu),
        ] {
            if periode.is_zero() {
                return Err(ConfigError::InvalidPeriod { field });
            }
        }
        Ok(())
    }
}

/// Buffering policy of the metric stream.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, CopyGetters, TypedBuilder,
)]
#[getset(get_copy = "pub")]
#[serde(default)]
pub struct StreamConfig {
    /// Metrics buffered before a send waits for the consumer.
    #[builder(default = DEFAULT_STREAM_CAPACITY)]
    capacity: usize,
    /// How long a single send may wait on a full stream. `None` waits for as
    /// long as the consumer needs, so nothing is ever dropped.
    #[serde(rename = "send_timeout_ms", with = "duration_ms::option")]
    #[builder(default)]
    send_timeout: Option<Duration>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_STREAM_CAPACITY,
            send_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, TypedBuilder)]
#[getset(get = "pub")]
#[serde(default)]
pub struct StatsConfig {
    #[builder(default)]
    periodes: ServerStatsPeriodes,
    #[builder(default)]
    stream: StreamConfig,
    /// Bound on one CPU counter read, so a stuck read cannot hold up shutdown.
    #[serde(rename = "cpu_read_timeout_ms", with = "duration_ms")]
    #[builder(default = DEFAULT_CPU_READ_TIMEOUT)]
    cpu_read_timeout: Duration,
    /// Delay before the first tick of the scheduled producers.
    #[serde(rename = "initial_delay_ms", with = "duration_ms")]
    #[builder(default)]
    initial_delay: Duration,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            periodes: ServerStatsPeriodes::default(),
            stream: StreamConfig::default(),
            cpu_read_timeout: DEFAULT_CPU_READ_TIMEOUT,
            initial_delay: Duration::ZERO,
        }
    }
}

impl StatsConfig {
    /// Default configuration running every producer at the given cadence.
    pub fn with_periodes(periodes: ServerStatsPeriodes) -> Self {
        Self {
            periodes,
            ..Self::default()
        }
    }

    /// Loads configuration from an optional TOML file, then applies
    /// `SERVERSTATS__*` environment overrides on top.
    pub fn load_from_file_and_env(file_path: &str) -> Result<Self, ConfigError> {
        Self::load_with_env_prefix(file_path, ENV_PREFIX)
    }

    fn load_with_env_prefix(file_path: &str, env_prefix: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::new(file_path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let stats_config = config.try_deserialize::<StatsConfig>()?;
        stats_config.validate()?;
        debug!(?stats_config, file_path, "Loaded configuration");

        Ok(stats_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.periodes.validate()?;
        if self.stream.capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        Ok(())
    }

    pub fn set_periodes(&mut self, periodes: ServerStatsPeriodes) -> &mut Self {
        self.periodes = periodes;
        self
    }

    pub fn set_stream(&mut self, stream: StreamConfig) -> &mut Self {
        self.stream = stream;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions_sorted::assert_eq;
    use std::env;
    use std::io::Write;

    #[test]
    fn default_periodes_are_one_second() {
        let periodes = ServerStatsPeriodes::default();
        assert_eq!(periodes.mem(), Duration::from_secs(1));
        assert_eq!(periodes.load_avg(), Duration::from_secs(1));
        assert_eq!(periodes.cpu(), Duration::from_secs(1));
        assert!(periodes.validate().is_ok());
    }

    #[test]
    fn zero_periode_is_rejected() {
        let periodes = ServerStatsPeriodes::builder()
            .load_avg(Duration::ZERO)
            .build();
        assert!(matches!(
            periodes.validate(),
            Err(ConfigError::InvalidPeriod { field: "load_avg" })
        ));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = StatsConfig::builder()
            .stream(StreamConfig::builder().capacity(0).build())
            .build();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCapacity)
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = StatsConfig::load_from_file_and_env("does/not/exist.toml").unwrap();
        assert_eq!(config, StatsConfig::default());
    }

    #[test]
    fn load_valid_config_from_file() {
        let mut temp_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            temp_file,
            r#"
            cpu_read_timeout_ms = 750

            [periodes]
            mem_ms = 200
            load_avg_ms = 500
            cpu_ms = 100

            [stream]
            capacity = 8
            send_timeout_ms = 250
        "#
        )
        .unwrap();
        let config_path = temp_file.path().to_str().unwrap();

        let config = StatsConfig::load_from_file_and_env(config_path).unwrap();

        assert_eq!(
            *config.periodes(),
            ServerStatsPeriodes::new(
                Duration::from_millis(200),
                Duration::from_millis(500),
                Duration::from_millis(100),
            )
        );
        assert_eq!(config.stream().capacity(), 8);
        assert_eq!(
            config.stream().send_timeout(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(*config.cpu_read_timeout(), Duration::from_millis(750));
        assert_eq!(*config.initial_delay(), Duration::ZERO);
    }

    #[test]
    fn override_config_with_env_vars() {
        env::set_var("SERVERSTATS_ENV_TEST__PERIODES__CPU_MS", "50");

        let mut temp_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            temp_file,
            r#"
            [periodes]
            cpu_ms = 2000
        "#
        )
        .unwrap();
        let config_path = temp_file.path().to_str().unwrap();

        let config = StatsConfig::load_with_env_prefix(config_path, "SERVERSTATS_ENV_TEST");
        env::remove_var("SERVERSTATS_ENV_TEST__PERIODES__CPU_MS");

        let config = config.unwrap();
        assert_eq!(config.periodes().cpu(), Duration::from_millis(50));
        assert_eq!(config.periodes().mem(), DEFAULT_PERIODE);
    }

    #[test]
    fn zero_periode_in_file_is_rejected() {
        let mut temp_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(temp_file, "[periodes]\nmem_ms = 0").unwrap();
        let config_path = temp_file.path().to_str().unwrap();

        assert!(matches!(
            StatsConfig::load_from_file_and_env(config_path),
            Err(ConfigError::InvalidPeriod { field: "mem" })
        ));
    }
}
