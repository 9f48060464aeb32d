//! Producers: one per metric family.
//!
//! A producer turns freshly read counters into the metrics of one tick. It
//! never touches the metric stream; the [`TaskGroup`](crate::TaskGroup)
//! that drives it sends the resulting [`Batch`] and reports anything that
//! went wrong.

use crate::error::CollectError;
use crate::metric::{percentage, Metric, Unit};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core::fmt;

pub mod cpu;
pub mod loadavg;
pub mod memory;

pub use cpu::{cpu_metrics, CpuProducer};
pub use loadavg::{load_average_metrics, LoadAvgProducer};
pub use memory::{memory_metrics, MemoryProducer};

#[async_trait]
pub trait Producer: Send {
    /// Name of the metric family, used in logs and summaries.
    fn name(&self) -> &'static str;

    /// Reads counters and computes the metrics of one tick.
    async fn tick(&mut self) -> Result<Batch, CollectError>;
}

/// A boxed [`Producer`], as owned by the task group.
pub type BoxedProducer = Box<dyn Producer>;

/// A sample that could not yield every derived metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Degenerate {
    /// `mem.total` was zero; `mem.actualusedpercent` was skipped.
    ZeroMemoryTotal,
    /// `swap.total` was zero (no swap configured); `swap.usedpercent` was skipped.
    ZeroSwapTotal,
    /// The CPU sample accumulated no ticks; the whole tick was skipped.
    ZeroCpuTicks,
}

impl fmt::Display for Degenerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degenerate::ZeroMemoryTotal => write!(f, "memory total is zero"),
            Degenerate::ZeroSwapTotal => write!(f, "swap total is zero"),
            Degenerate::ZeroCpuTicks => write!(f, "cpu sample has no ticks"),
        }
    }
}

/// Output of one producer tick: metrics in emission order plus any
/// data-quality findings.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    timestamp: DateTime<Utc>,
    metrics: Vec<Metric>,
    degenerate: Vec<Degenerate>,
}

impl Batch {
    /// Starts an empty batch; every metric pushed shares `timestamp`.
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            metrics: Vec::new(),
            degenerate: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &str, value: String, unit: Option<Unit>) {
        self.metrics
            .push(Metric::new(self.timestamp, name, value, unit));
    }

    /// Pushes `part / total * 100` as a percentage metric, or records
    /// `degenerate` instead when `total` is zero.
    pub fn push_percentage(&mut self, name: &str, part: u64, total: u64, degenerate: Degenerate) {
        match percentage(part, total) {
            Some(value) => self.push(name, value, Some(Unit::Percent)),
            None => self.flag(degenerate),
        }
    }

    pub fn flag(&mut self, degenerate: Degenerate) {
        self.degenerate.push(degenerate);
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn degenerate(&self) -> &[Degenerate] {
        &self.degenerate
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Metric>, Vec<Degenerate>) {
        (self.metrics, self.degenerate)
    }
}
