//! Raw counter sources.
//!
//! A [`CounterSource`] exposes point-in-time OS counters. Producers turn
//! those counters into metrics; the source itself never sees a metric.

use crate::error::CollectError;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

pub mod cpu;
pub(crate) mod procfs;
pub mod scripted;
pub mod system;

pub use cpu::CpuSampler;
pub use scripted::{ScriptedSource, Step};
pub use system::SystemSource;

/// A reference-counted [`CounterSource`], shared by every producer.
pub type CounterSourceRef = Arc<dyn CounterSource>;

#[async_trait]
pub trait CounterSource: Send + Sync {
    async fn memory(&self) -> Result<MemoryCounters, CollectError>;
    async fn swap(&self) -> Result<SwapCounters, CollectError>;
    async fn load_average(&self) -> Result<LoadAverage, CollectError>;
    /// Cumulative CPU ticks since boot. [`CpuSampler`] turns successive
    /// readings into per-interval deltas.
    async fn cpu_ticks(&self) -> Result<CpuTicks, CollectError>;
}

/// Physical memory, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryCounters {
    pub total: u64,
    /// `total - free`.
    pub used: u64,
    pub free: u64,
    /// Memory in use once buffers and reclaimable cache are discounted.
    pub actual_used: u64,
    /// Memory a new allocation can obtain without swapping.
    pub actual_free: u64,
}

/// Swap space, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SwapCounters {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// CPU time split by mode, in clock ticks.
///
/// Depending on where it comes from this is either cumulative (a raw
/// [`CounterSource::cpu_ticks`] reading) or a differential sample (the
/// output of [`CpuSampler::next_sample`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CpuTicks {
    pub user: u64,
    pub nice: u64,
    pub sys: u64,
    pub idle: u64,
    pub wait: u64,
    pub irq: u64,
    pub soft_irq: u64,
    pub stolen: u64,
}

impl CpuTicks {
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.sys
            + self.idle
            + self.wait
            + self.irq
            + self.soft_irq
            + self.stolen
    }

    /// Ticks accumulated since `previous`. Counters that went backwards
    /// (e.g. a CPU going offline) count as zero.
    pub fn delta(&self, previous: &CpuTicks) -> CpuTicks {
        CpuTicks {
            user: self.user.saturating_sub(previous.user),
            nice: self.nice.saturating_sub(previous.nice),
            sys: self.sys.saturating_sub(previous.sys),
            idle: self.idle.saturating_sub(previous.idle),
            wait: self.wait.saturating_sub(previous.wait),
            irq: self.irq.saturating_sub(previous.irq),
            soft_irq: self.soft_irq.saturating_sub(previous.soft_irq),
            stolen: self.stolen.saturating_sub(previous.stolen),
        }
    }

    /// Component-wise sum, used to advance scripted cumulative counters.
    pub fn accumulate(&self, increment: &CpuTicks) -> CpuTicks {
        CpuTicks {
            user: self.user + increment.user,
            nice: self.nice + increment.nice,
            sys: self.sys + increment.sys,
            idle: self.idle + increment.idle,
            wait: self.wait + increment.wait,
            irq: self.irq + increment.irq,
            soft_irq: self.soft_irq + increment.soft_irq,
            stolen: self.stolen + increment.stolen,
        }
    }
}
