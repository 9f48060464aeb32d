//! Host metrics sampling.
//!
//! Independent producers sample memory, load average and CPU counters on
//! their own cadence and fan their [`Metric`]s into a single bounded
//! [`MetricStream`]. [`ServerStats`] starts the producers and owns the read
//! side of the stream.

pub mod collector;
pub mod error;
pub mod metric;
pub mod producer;
pub mod report;
pub mod scheduler;
pub mod stats;
pub mod stream;

pub use collector::{
    CounterSource, CounterSourceRef, CpuSampler, ScriptedSource, Step, SystemSource,
};
pub use common::{ServerStatsPeriodes, StatsConfig, StreamConfig};
pub use error::{BatchSendError, CollectError, SendError, StatsError};
pub use metric::{Metric, Unit};
pub use producer::{Batch, BoxedProducer, Degenerate, Producer};
pub use report::{ProducerEvent, ProducerSummary, Reporter, ReporterRef, TracingReporter};
pub use scheduler::TaskGroup;
pub use stats::{ServerStats, ServerStatsOptions};
pub use stream::{metric_stream, MetricSender, MetricStream};
