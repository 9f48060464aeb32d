use super::{Batch, Producer};
use crate::collector::{CounterSourceRef, LoadAverage};
use crate::error::CollectError;
use crate::metric::format_value;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;

/// The 1, 5 and 15 minute load averages.
pub struct LoadAvgProducer {
    source: CounterSourceRef,
}

impl LoadAvgProducer {
    pub fn new(source: CounterSourceRef) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Producer for LoadAvgProducer {
    fn name(&self) -> &'static str {
        "loadavg"
    }

    #[instrument(skip(self), level = "trace")]
    async fn tick(&mut self) -> Result<Batch, CollectError> {
        let now = Utc::now();
        let load = self.source.load_average().await?;
        Ok(load_average_metrics(now, &load))
    }
}

/// `loadavg.one`, `loadavg.five` and `loadavg.fifteen`, each carrying its own
/// window's value.
pub fn load_average_metrics(timestamp: DateTime<Utc>, load: &LoadAverage) -> Batch {
    let mut batch = Batch::at(timestamp);
    batch.push("loadavg.one", format_value(load.one), None);
    batch.push("loadavg.five", format_value(load.five), None);
    batch.push("loadavg.fifteen", format_value(load.fifteen), None);
    batch
}
