use super::{Batch, Degenerate, Producer};
use crate::collector::{CounterSourceRef, MemoryCounters, SwapCounters};
use crate::error::CollectError;
use crate::metric::{to_megabytes, Unit};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;

/// Memory and swap usage, in megabytes and percent.
pub struct MemoryProducer {
    source: CounterSourceRef,
}

impl MemoryProducer {
    pub fn new(source: CounterSourceRef) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Producer for MemoryProducer {
    fn name(&self) -> &'static str {
        "mem"
    }

    #[instrument(skip(self), level = "trace")]
    async fn tick(&mut self) -> Result<Batch, CollectError> {
        let now = Utc::now();
        let memory = self.source.memory().await?;
        let swap = self.source.swap().await?;
        Ok(memory_metrics(now, &memory, &swap))
    }
}

/// Eight absolute metrics (unit `M`) followed by the two derived percentages
/// (unit `%`). A percentage whose total is zero is left out and flagged.
pub fn memory_metrics(
    timestamp: DateTime<Utc>,
    memory: &MemoryCounters,
    swap: &SwapCounters,
) -> Batch {
    let mut batch = Batch::at(timestamp);
    let megabytes = Some(Unit::Megabytes);

    batch.push("mem.total", to_megabytes(memory.total), megabytes);
    batch.push("mem.used", to_megabytes(memory.used), megabytes);
    batch.push("mem.free", to_megabytes(memory.free), megabytes);
    batch.push("mem.actualused", to_megabytes(memory.actual_used), megabytes);
    batch.push("mem.actualfree", to_megabytes(memory.actual_free), megabytes);
    batch.push("swap.total", to_megabytes(swap.total), megabytes);
    batch.push("swap.used", to_megabytes(swap.used), megabytes);
    batch.push("swap.free", to_megabytes(swap.free), megabytes);

    batch.push_percentage(
        "mem.actualusedpercent",
        memory.actual_used,
        memory.total,
        Degenerate::ZeroMemoryTotal,
    );
    batch.push_percentage(
        "swap.usedpercent",
        swap.used,
        swap.total,
        Degenerate::ZeroSwapTotal,
    );

    batch
}
