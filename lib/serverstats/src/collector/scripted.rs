//! Scripted counter source for tests and demos.

use super::{CounterSource, CpuTicks, LoadAverage, MemoryCounters, SwapCounters};
use crate::error::CollectError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// One scripted reading.
#[derive(Debug, Clone)]
pub enum Step<T> {
    /// Return this value.
    Yield(T),
    /// Fail with [`CollectError::NotAvailable`].
    Unavailable,
    /// Panic inside the read.
    Panic,
    /// Never complete.
    Stall,
}

/// A [`CounterSource`] that plays back scripted readings.
///
/// Each counter family has its own queue of [`Step`]s. Steps are consumed
/// front to back and the last one repeats forever; a family with no script
/// reports [`CollectError::NotAvailable`].
#[derive(Debug, Default)]
pub struct ScriptedSource {
    memory: Mutex<VecDeque<Step<MemoryCounters>>>,
    swap: Mutex<VecDeque<Step<SwapCounters>>>,
    load: Mutex<VecDeque<Step<LoadAverage>>>,
    cpu: Mutex<VecDeque<Step<CpuTicks>>>,
    cpu_increment: Mutex<Option<(CpuTicks, CpuTicks)>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every family yields the same reading forever; cumulative CPU ticks
    /// grow by `cpu_increment` on each read.
    pub fn steady(
        memory: MemoryCounters,
        swap: SwapCounters,
        load: LoadAverage,
        cpu_increment: CpuTicks,
    ) -> Self {
        Self::new()
            .with_memory([Step::Yield(memory)])
            .with_swap([Step::Yield(swap)])
            .with_load_average([Step::Yield(load)])
            .with_cpu_increment(cpu_increment)
    }

    pub fn with_memory(self, steps: impl IntoIterator<Item = Step<MemoryCounters>>) -> Self {
        *self.memory.lock() = steps.into_iter().collect();
        self
    }

    pub fn with_swap(self, steps: impl IntoIterator<Item = Step<SwapCounters>>) -> Self {
        *self.swap.lock() = steps.into_iter().collect();
        self
    }

    pub fn with_load_average(self, steps: impl IntoIterator<Item = Step<LoadAverage>>) -> Self {
        *self.load.lock() = steps.into_iter().collect();
        self
    }

    /// Scripts cumulative CPU readings.
    pub fn with_cpu_ticks(self, steps: impl IntoIterator<Item = Step<CpuTicks>>) -> Self {
        *self.cpu.lock() = steps.into_iter().collect();
        *self.cpu_increment.lock() = None;
        self
    }

    /// Cumulative CPU readings that start at zero and grow by `increment` on
    /// every read, so each differential sample equals `increment`.
    pub fn with_cpu_increment(self, increment: CpuTicks) -> Self {
        *self.cpu_increment.lock() = Some((CpuTicks::default(), increment));
        self
    }

    async fn play<T: Clone>(
        steps: &Mutex<VecDeque<Step<T>>>,
        what: &'static str,
    ) -> Result<T, CollectError> {
        let step = {
            let mut steps = steps.lock();
            if steps.len() > 1 {
                steps.pop_front()
            } else {
                steps.front().cloned()
            }
        };

        match step {
            Some(Step::Yield(value)) => Ok(value),
            Some(Step::Unavailable) | None => Err(CollectError::NotAvailable { what }),
            Some(Step::Panic) => panic!("scripted {what} read panicked"),
            Some(Step::Stall) => futures::future::pending().await,
        }
    }
}

#[async_trait]
impl CounterSource for ScriptedSource {
    async fn memory(&self) -> Result<MemoryCounters, CollectError> {
        Self::play(&self.memory, "memory").await
    }

    async fn swap(&self) -> Result<SwapCounters, CollectError> {
        Self::play(&self.swap, "swap").await
    }

    async fn load_average(&self) -> Result<LoadAverage, CollectError> {
        Self::play(&self.load, "load average").await
    }

    async fn cpu_ticks(&self) -> Result<CpuTicks, CollectError> {
        let generated = self.cpu_increment.lock().as_mut().map(|(current, increment)| {
            let reading = *current;
            *current = current.accumulate(increment);
            reading
        });

        match generated {
            Some(reading) => Ok(reading),
            None => Self::play(&self.cpu, "cpu").await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_step_repeats() {
        let source = ScriptedSource::new().with_load_average([
            Step::Unavailable,
            Step::Yield(LoadAverage {
                one: 1.0,
                five: 0.5,
                fifteen: 0.25,
            }),
        ]);

        assert!(source.load_average().await.is_err());
        for _ in 0..3 {
            assert_eq!(source.load_average().await.unwrap().fifteen, 0.25);
        }
    }

    #[tokio::test]
    async fn unscripted_family_is_not_available() {
        let source = ScriptedSource::new();
        assert!(matches!(
            source.memory().await,
            Err(CollectError::NotAvailable { what: "memory" })
        ));
    }

    #[tokio::test]
    async fn cpu_increment_grows_cumulative_ticks() {
        let increment = CpuTicks {
            user: 10,
            idle: 90,
            ..Default::default()
        };
        let source = ScriptedSource::new().with_cpu_increment(increment);

        let first = source.cpu_ticks().await.unwrap();
        let second = source.cpu_ticks().await.unwrap();
        assert_eq!(first.total(), 0);
        assert_eq!(second.delta(&first), increment);
    }
}
