//! Differential CPU sampling.

use super::{CounterSourceRef, CpuTicks};
use crate::error::CollectError;
use std::time::Duration;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, instrument};

/// Yields one differential CPU sample per interval.
///
/// The sampler owns the timing of the CPU producer: [`next_sample`] waits for
/// the next interval boundary, reads cumulative ticks from the source and
/// returns the ticks accumulated since the previous reading. The very first
/// reading only establishes the baseline, so the first sample arrives one
/// period after the sampler starts.
///
/// [`next_sample`]: CpuSampler::next_sample
pub struct CpuSampler {
    source: CounterSourceRef,
    interval: Interval,
    read_timeout: Duration,
    previous: Option<CpuTicks>,
}

impl CpuSampler {
    /// # Panics
    ///
    /// Panics if `period` is zero or if called outside a tokio runtime.
    pub fn new(source: CounterSourceRef, period: Duration, read_timeout: Duration) -> Self {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self {
            source,
            interval,
            read_timeout,
            previous: None,
        }
    }

    /// Waits for the next interval and returns the ticks accumulated since the
    /// previous successful reading.
    ///
    /// A failed or timed-out read leaves the baseline untouched, so the next
    /// successful sample covers the whole gap.
    #[instrument(skip(self), level = "trace")]
    pub async fn next_sample(&mut self) -> Result<CpuTicks, CollectError> {
        loop {
            self.interval.tick().await;
            let current = self.read().await?;

            match self.previous.replace(current) {
                Some(previous) => return Ok(current.delta(&previous)),
                None => debug!("Established CPU baseline"),
            }
        }
    }

    async fn read(&self) -> Result<CpuTicks, CollectError> {
        time::timeout(self.read_timeout, self.source.cpu_ticks())
            .await
            .map_err(|_| CollectError::Timeout(self.read_timeout))?
    }
}
