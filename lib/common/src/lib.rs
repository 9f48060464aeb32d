//! Shared building blocks for the serverstats workspace: configuration
//! loading, duration helpers and tracing setup.

pub mod config;
pub mod util;

pub use config::{
    ConfigError, ServerStatsPeriodes, StatsConfig, StreamConfig, DEFAULT_CPU_READ_TIMEOUT,
    DEFAULT_PERIODE, DEFAULT_STREAM_CAPACITY,
};
