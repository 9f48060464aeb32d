//! Error types for counter collection and engine construction.

use common::ConfigError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while reading raw OS counters.
///
/// These never reach the metric stream: a producer that hits one skips its
/// tick and reports the failure.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The counter family cannot be read on this platform.
    #[error("{what} counters are not available on this platform")]
    NotAvailable { what: &'static str },

    /// Failed to read a procfs file.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse a counter value.
    #[error("failed to parse value from {path}: {detail}")]
    Parse { path: String, detail: String },

    /// The read did not complete in time.
    #[error("counter read timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Why a metric could not be put on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The consumer dropped the stream.
    #[error("metric stream closed")]
    Closed,

    /// The stop signal fired while waiting for buffer space.
    #[error("send cancelled by shutdown")]
    Cancelled,

    /// The stream stayed full for longer than the send timeout.
    #[error("metric stream full for {0:?}")]
    TimedOut(Duration),
}

/// A batch send that stopped part way through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sent {sent} of {total} metrics: {source}")]
pub struct BatchSendError {
    pub sent: usize,
    pub total: usize,
    pub source: SendError,
}

impl BatchSendError {
    /// Metrics of the batch that never made it onto the stream.
    pub fn dropped(&self) -> usize {
        self.total - self.sent
    }
}
