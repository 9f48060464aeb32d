//! The `ServerStats` handle: starts every producer and hands out the stream.

use crate::collector::{CounterSourceRef, CpuSampler, SystemSource};
use crate::error::StatsError;
use crate::metric::Metric;
use crate::producer::{CpuProducer, LoadAvgProducer, MemoryProducer};
use crate::report::{ProducerSummary, ReporterRef, TracingReporter};
use crate::scheduler::TaskGroup;
use crate::stream::{metric_stream, MetricStream};
use common::{ServerStatsPeriodes, StatsConfig};
use std::sync::Arc;
use tracing::{info, instrument};
use typed_builder::TypedBuilder;

fn system_source() -> CounterSourceRef {
    Arc::new(SystemSource::new())
}

fn tracing_reporter() -> ReporterRef {
    Arc::new(TracingReporter)
}

/// Everything [`ServerStats`] is built from. Obtained through
/// [`ServerStats::builder`].
#[derive(TypedBuilder)]
pub struct ServerStatsOptions {
    #[builder(default)]
    config: StatsConfig,
    /// Where counters are read from. Defaults to the host.
    #[builder(default = system_source())]
    source: CounterSourceRef,
    /// Receives producer failures and data-quality findings. Defaults to
    /// logging them.
    #[builder(default = tracing_reporter())]
    reporter: ReporterRef,
}

impl ServerStatsOptions {
    /// Validates the configuration and starts the memory, load-average and
    /// CPU producers. Must be called within a tokio runtime.
    #[instrument(skip(self), fields(config = ?self.config))]
    pub fn start(self) -> Result<ServerStats, StatsError> {
        self.config.validate()?;
        let periodes = self.config.periodes();
        let initial_delay = *self.config.initial_delay();

        let (sender, stream) = metric_stream(self.config.stream());
        let mut tasks = TaskGroup::new(self.reporter);

        tasks.schedule(
            Box::new(MemoryProducer::new(self.source.clone())),
            sender.clone(),
            periodes.mem(),
            initial_delay,
        );
        tasks.schedule(
            Box::new(LoadAvgProducer::new(self.source.clone())),
            sender.clone(),
            periodes.load_avg(),
            initial_delay,
        );

        let sampler = CpuSampler::new(
            self.source,
            periodes.cpu(),
            *self.config.cpu_read_timeout(),
        );
        tasks.run_continuous(Box::new(CpuProducer::new(sampler)), sender);

        info!(producers = tasks.len(), "Server stats started");
        Ok(ServerStats { stream, tasks })
    }
}

/// Samples host metrics in the background and streams them to one consumer.
///
/// ```ignore
/// let mut stats = ServerStats::with_defaults()?;
/// while let Some(metric) = stats.next_metric().await {
///     println!("{metric}");
/// }
/// ```
///
/// Producers run until [`shutdown`](ServerStats::shutdown) is called or the
/// handle is dropped.
pub struct ServerStats {
    stream: MetricStream,
    tasks: TaskGroup,
}

impl ServerStats {
    /// Starts sampling the host at the given cadences.
    pub fn new(periodes: ServerStatsPeriodes) -> Result<Self, StatsError> {
        Self::builder()
            .config(StatsConfig::with_periodes(periodes))
            .build()
            .start()
    }

    /// Starts sampling the host once per second.
    pub fn with_defaults() -> Result<Self, StatsError> {
        Self::new(ServerStatsPeriodes::default())
    }

    pub fn builder() -> ServerStatsOptionsBuilder<((), (), ())> {
        ServerStatsOptions::builder()
    }

    pub fn metrics(&mut self) -> &mut MetricStream {
        &mut self.stream
    }

    pub async fn next_metric(&mut self) -> Option<Metric> {
        self.stream.recv().await
    }

    /// Splits the handle so the stream and the producers can be owned by
    /// different tasks.
    pub fn into_parts(self) -> (MetricStream, TaskGroup) {
        (self.stream, self.tasks)
    }

    /// Stops every producer and waits for them to finish.
    pub async fn shutdown(self) -> Vec<ProducerSummary> {
        let summaries = self.tasks.shutdown().await;
        info!("Server stats stopped");
        summaries
    }
}
