//! Per-producer outcome reporting.

use crate::error::CollectError;
use crate::producer::Degenerate;
use core::fmt;
use getset::CopyGetters;
use std::sync::Arc;
use tracing::{error, warn};

/// Something worth knowing about that happened during a producer tick.
///
/// None of these reach the metric stream.
#[derive(Debug)]
pub enum ProducerEvent {
    /// Counters could not be read; the tick emitted nothing.
    ReadFailed(CollectError),
    /// A derived metric was skipped because its denominator was zero.
    Degenerate(Degenerate),
    /// The tick panicked. The payload message, if it was a string.
    Panicked(String),
    /// The stream stayed full past the send timeout; the rest of the tick's
    /// batch was abandoned.
    SendTimedOut { dropped: usize },
}

impl fmt::Display for ProducerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProducerEvent::ReadFailed(err) => write!(f, "read failed: {err}"),
            ProducerEvent::Degenerate(degenerate) => write!(f, "degenerate sample: {degenerate}"),
            ProducerEvent::Panicked(message) => write!(f, "panicked: {message}"),
            ProducerEvent::SendTimedOut { dropped } => {
                write!(f, "send timed out, dropped {dropped} metrics")
            }
        }
    }
}

/// Receives producer events as they happen.
///
/// Called from the producer's own task, so implementations must not block.
pub trait Reporter: Send + Sync {
    fn report(&self, producer: &'static str, event: &ProducerEvent);
}

/// A reference-counted reference to a [`Reporter`].
pub type ReporterRef = Arc<dyn Reporter>;

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, producer: &'static str, event: &ProducerEvent) {
        match event {
            ProducerEvent::ReadFailed(err) => {
                warn!(producer, error = %err, "Skipping tick, counters unavailable")
            }
            ProducerEvent::Degenerate(degenerate) => {
                warn!(producer, %degenerate, "Skipping derived metric")
            }
            ProducerEvent::Panicked(message) => {
                error!(producer, panic = %message, "Producer tick panicked")
            }
            ProducerEvent::SendTimedOut { dropped } => {
                warn!(producer, dropped, "Metric stream full, dropped rest of batch")
            }
        }
    }
}

/// What a producer did over its lifetime, returned when its task group is
/// joined.
#[derive(Debug, Clone, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct ProducerSummary {
    name: &'static str,
    /// Ticks started, including failed and panicked ones.
    ticks: u64,
    metrics_sent: u64,
    read_failures: u64,
    degenerate: u64,
    panics: u64,
    dropped: u64,
}

impl ProducerSummary {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ticks: 0,
            metrics_sent: 0,
            read_failures: 0,
            degenerate: 0,
            panics: 0,
            dropped: 0,
        }
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks += 1;
    }

    pub(crate) fn record_sent(&mut self, count: usize) {
        self.metrics_sent += count as u64;
    }

    pub(crate) fn record(&mut self, event: &ProducerEvent) {
        match event {
            ProducerEvent::ReadFailed(_) => self.read_failures += 1,
            ProducerEvent::Degenerate(_) => self.degenerate += 1,
            ProducerEvent::Panicked(_) => self.panics += 1,
            ProducerEvent::SendTimedOut { dropped } => self.dropped += *dropped as u64,
        }
    }
}

impl fmt::Display for ProducerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ticks, {} metrics sent, {} read failures, {} degenerate, {} panics, {} dropped",
            self.name,
            self.ticks,
            self.metrics_sent,
            self.read_failures,
            self.degenerate,
            self.panics,
            self.dropped
        )
    }
}
