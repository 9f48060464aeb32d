//! The fan-in channel every producer writes into and the consumer reads from.

use crate::error::{BatchSendError, SendError};
use crate::metric::Metric;
use common::StreamConfig;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::Stream;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;

/// Creates a bounded metric stream.
///
/// # Panics
///
/// Panics if the configured capacity is zero; [`StreamConfig`] values that
/// went through `StatsConfig::validate` never are.
pub fn metric_stream(config: &StreamConfig) -> (MetricSender, MetricStream) {
    let (inner, receiver) = mpsc::channel(config.capacity());
    (
        MetricSender {
            inner,
            send_timeout: config.send_timeout(),
        },
        MetricStream { inner: receiver },
    )
}

/// Write side of the stream. One clone per producer.
#[derive(Debug, Clone)]
pub struct MetricSender {
    inner: mpsc::Sender<Metric>,
    send_timeout: Option<Duration>,
}

impl MetricSender {
    /// Puts one metric on the stream, waiting for buffer space if the
    /// consumer is behind.
    pub async fn send(&self, metric: Metric, cancel: &CancellationToken) -> Result<(), SendError> {
        let send = self.inner.send(metric);
        let bounded = async {
            let result = match self.send_timeout {
                Some(limit) => time::timeout(limit, send)
                    .await
                    .map_err(|_| SendError::TimedOut(limit))?,
                None => send.await,
            };
            result.map_err(|_| SendError::Closed)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SendError::Cancelled),
            result = bounded => result,
        }
    }

    /// Sends a tick's metrics in order, stopping at the first failure.
    pub async fn send_batch(
        &self,
        metrics: Vec<Metric>,
        cancel: &CancellationToken,
    ) -> Result<usize, BatchSendError> {
        let total = metrics.len();
        for (sent, metric) in metrics.into_iter().enumerate() {
            self.send(metric, cancel)
                .await
                .map_err(|source| BatchSendError {
                    sent,
                    total,
                    source,
                })?;
        }
        Ok(total)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Read side of the stream.
///
/// Yields metrics in arrival order. Metrics of one producer arrive in the
/// order it emitted them; how producers interleave is unspecified. Ends once
/// every producer has stopped.
#[derive(Debug)]
pub struct MetricStream {
    inner: mpsc::Receiver<Metric>,
}

impl MetricStream {
    pub async fn recv(&mut self) -> Option<Metric> {
        self.inner.recv().await
    }

    /// Returns a buffered metric without waiting.
    pub fn try_recv(&mut self) -> Option<Metric> {
        self.inner.try_recv().ok()
    }
}

impl Stream for MetricStream {
    type Item = Metric;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Metric>> {
        self.inner.poll_recv(cx)
    }
}
