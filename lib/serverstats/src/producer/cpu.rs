use super::{Batch, Degenerate, Producer};
use crate::collector::{CpuSampler, CpuTicks};
use crate::error::CollectError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;

/// CPU utilisation split by mode.
///
/// Unlike the other producers this one is self-timed: each tick waits on the
/// [`CpuSampler`] for the next differential sample, so it is driven with
/// [`TaskGroup::run_continuous`](crate::TaskGroup::run_continuous) rather
/// than on a fixed schedule.
pub struct CpuProducer {
    sampler: CpuSampler,
}

impl CpuProducer {
    pub fn new(sampler: CpuSampler) -> Self {
        Self { sampler }
    }
}

#[async_trait]
impl Producer for CpuProducer {
    fn name(&self) -> &'static str {
        "cpu"
    }

    #[instrument(skip(self), level = "trace")]
    async fn tick(&mut self) -> Result<Batch, CollectError> {
        let sample = self.sampler.next_sample().await?;
        Ok(cpu_metrics(Utc::now(), &sample))
    }
}

/// `cpu.user`, `cpu.sys`, `cpu.idle`, `cpu.wait` and `cpu.stolen` as
/// percentages of the sample's total ticks. An empty sample yields no
/// metrics and is flagged.
pub fn cpu_metrics(timestamp: DateTime<Utc>, sample: &CpuTicks) -> Batch {
    let mut batch = Batch::at(timestamp);
    let total = sample.total();
    if total == 0 {
        batch.flag(Degenerate::ZeroCpuTicks);
        return batch;
    }

    for (name, ticks) in [
        ("cpu.user", sample.user),
        ("cpu.sys", sample.sys),
        ("cpu.idle", sample.idle),
        ("cpu.wait", sample.wait),
        ("cpu.stolen", sample.stolen),
    ] {
        batch.push_percentage(name, ticks, total, Degenerate::ZeroCpuTicks);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{ScriptedSource, Step};
    use crate::metric::Unit;
    use crate::producer::tests::{fixed_time, triples};
    use pretty_assertions_sorted::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn percentages_partition_total() {
        let sample = CpuTicks {
            user: 50,
            sys: 20,
            idle: 20,
            wait: 5,
            stolen: 5,
            ..Default::default()
        };

        let batch = cpu_metrics(fixed_time(), &sample);

        let pct = Some(Unit::Percent);
        assert_eq!(
            triples(&batch),
            vec![
                ("cpu.user", "50.00", pct),
                ("cpu.sys", "20.00", pct),
                ("cpu.idle", "20.00", pct),
                ("cpu.wait", "5.00", pct),
                ("cpu.stolen", "5.00", pct),
            ]
        );
        let sum: f64 = batch
            .metrics()
            .iter()
            .map(|m| m.value().parse::<f64>().unwrap())
            .sum();
        assert!((sum - 100.0).abs() < 0.05);
    }

    #[test]
    fn nice_and_irq_count_towards_total() {
        let sample = CpuTicks {
            user: 25,
            nice: 25,
            idle: 25,
            irq: 25,
            ..Default::default()
        };

        let batch = cpu_metrics(fixed_time(), &sample);
        assert_eq!(batch.metrics()[0].value(), "25.00");
        assert_eq!(batch.metrics()[2].value(), "25.00");
    }

    #[test]
    fn empty_sample_is_skipped() {
        let batch = cpu_metrics(fixed_time(), &CpuTicks::default());
        assert!(batch.is_empty());
        assert_eq!(batch.degenerate(), &[Degenerate::ZeroCpuTicks]);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_from_sampler_deltas() {
        let source = ScriptedSource::new().with_cpu_ticks([
            Step::Yield(CpuTicks::default()),
            Step::Yield(CpuTicks {
                user: 30,
                idle: 70,
                ..Default::default()
            }),
        ]);
        let sampler = CpuSampler::new(
            Arc::new(source),
            Duration::from_millis(100),
            Duration::from_secs(1),
        );
        let mut producer = CpuProducer::new(sampler);

        let batch = producer.tick().await.unwrap();
        assert_eq!(batch.metrics()[0].value(), "30.00");
        assert_eq!(batch.metrics()[2].value(), "70.00");

        // Cumulative counters stopped moving: the next sample is empty.
        let stalled = producer.tick().await.unwrap();
        assert!(stalled.is_empty());
        assert_eq!(stalled.degenerate(), &[Degenerate::ZeroCpuTicks]);
    }
}
