//! Runs producers in their own tasks and stops them together.

use crate::error::SendError;
use crate::producer::BoxedProducer;
use crate::report::{ProducerEvent, ProducerSummary, ReporterRef};
use crate::stream::MetricSender;
use common::util::time::format_duration;
use core::ops::ControlFlow;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::mem;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, instrument, trace, Instrument};

/// Owns one task per producer and the stop signal they all observe.
///
/// A producer never runs two ticks at once: each task awaits a tick to
/// completion before waiting for the next one, and ticks missed in the
/// meantime are skipped. A tick that panics is reported and the producer
/// carries on with its next tick.
///
/// Dropping the group fires the stop signal without waiting for the tasks.
pub struct TaskGroup {
    cancel: CancellationToken,
    reporter: ReporterRef,
    handles: Vec<(&'static str, JoinHandle<ProducerSummary>)>,
}

impl TaskGroup {
    pub fn new(reporter: ReporterRef) -> Self {
        Self {
            cancel: CancellationToken::new(),
            reporter,
            handles: Vec::new(),
        }
    }

    /// The stop signal shared by every producer of the group.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of producers started and not yet joined.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Ticks `producer` every `period`, the first tick after `initial_delay`.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero or if called outside a tokio runtime.
    #[instrument(skip_all, fields(producer = producer.name()))]
    pub fn schedule(
        &mut self,
        producer: BoxedProducer,
        sender: MetricSender,
        period: Duration,
        initial_delay: Duration,
    ) {
        info!(
            period = %format_duration(period),
            initial_delay = %format_duration(initial_delay),
            "Scheduling producer"
        );
        let mut interval = time::interval_at(Instant::now() + initial_delay, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut supervisor = self.supervisor(producer, sender);
        self.spawn(supervisor.name, async move {
            loop {
                tokio::select! {
                    biased;
                    _ = supervisor.cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                if supervisor.run_tick().await.is_break() {
                    break;
                }
            }
            supervisor.finish()
        });
    }

    /// Ticks a self-timed `producer` back to back. The producer is expected
    /// to wait for its own next sample inside `tick`.
    #[instrument(skip_all, fields(producer = producer.name()))]
    pub fn run_continuous(&mut self, producer: BoxedProducer, sender: MetricSender) {
        info!("Running producer continuously");
        let mut supervisor = self.supervisor(producer, sender);
        self.spawn(supervisor.name, async move {
            while !supervisor.cancel.is_cancelled() {
                if supervisor.run_tick().await.is_break() {
                    break;
                }
            }
            supervisor.finish()
        });
    }

    /// Fires the stop signal. Producers stop at their next suspension point.
    pub fn stop(&self) {
        debug!("Stopping producers");
        self.cancel.cancel();
    }

    /// Waits for every producer task to finish and returns what each did.
    pub async fn join(&mut self) -> Vec<ProducerSummary> {
        let mut summaries = Vec::with_capacity(self.handles.len());
        for (name, handle) in mem::take(&mut self.handles) {
            match handle.await {
                Ok(summary) => {
                    debug!(%summary, "Producer stopped");
                    summaries.push(summary);
                }
                Err(err) => error!(producer = name, error = %err, "Producer task failed"),
            }
        }
        summaries
    }

    pub async fn shutdown(mut self) -> Vec<ProducerSummary> {
        self.stop();
        self.join().await
    }

    fn supervisor(&self, producer: BoxedProducer, sender: MetricSender) -> Supervisor {
        Supervisor {
            name: producer.name(),
            summary: ProducerSummary::new(producer.name()),
            producer,
            sender,
            cancel: self.cancel.clone(),
            reporter: self.reporter.clone(),
        }
    }

    fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = ProducerSummary> + Send + 'static,
    {
        let task = task.instrument(info_span!("producer", name));
        self.handles.push((name, tokio::spawn(task)));
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Runs the ticks of one producer and accounts for their outcome.
struct Supervisor {
    name: &'static str,
    producer: BoxedProducer,
    sender: MetricSender,
    cancel: CancellationToken,
    reporter: ReporterRef,
    summary: ProducerSummary,
}

impl Supervisor {
    /// Runs one tick and sends its metrics. Breaks once the producer should
    /// stop: the stop signal fired or the consumer went away.
    async fn run_tick(&mut self) -> ControlFlow<()> {
        let tick = AssertUnwindSafe(self.producer.tick()).catch_unwind();
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return ControlFlow::Break(()),
            outcome = tick => outcome,
        };
        self.summary.record_tick();

        let batch = match outcome {
            Ok(Ok(batch)) => batch,
            Ok(Err(err)) => {
                self.emit(ProducerEvent::ReadFailed(err));
                return ControlFlow::Continue(());
            }
            Err(payload) => {
                self.emit(ProducerEvent::Panicked(panic_message(&*payload)));
                return ControlFlow::Continue(());
            }
        };

        let (metrics, degenerate) = batch.into_parts();
        for finding in degenerate {
            self.emit(ProducerEvent::Degenerate(finding));
        }
        trace!(producer = self.name, count = metrics.len(), "Sending batch");

        match self.sender.send_batch(metrics, &self.cancel).await {
            Ok(sent) => {
                self.summary.record_sent(sent);
                ControlFlow::Continue(())
            }
            Err(err) => {
                self.summary.record_sent(err.sent);
                match err.source {
                    SendError::TimedOut(_) => {
                        self.emit(ProducerEvent::SendTimedOut {
                            dropped: err.dropped(),
                        });
                        ControlFlow::Continue(())
                    }
                    SendError::Closed => {
                        debug!(producer = self.name, "Metric stream closed");
                        ControlFlow::Break(())
                    }
                    SendError::Cancelled => ControlFlow::Break(()),
                }
            }
        }
    }

    fn emit(&mut self, event: ProducerEvent) {
        self.summary.record(&event);
        self.reporter.report(self.name, &event);
    }

    fn finish(self) -> ProducerSummary {
        self.summary
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
