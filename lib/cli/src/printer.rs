//! Writes metrics to an output in the selected format.

use crate::OutputFormat;
use serverstats::Metric;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrintError {
    #[error("Failed to write metric: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to encode metric: {0}")]
    Json(#[from] serde_json::Error),
}

/// Prints one metric per line, optionally prefixing every name with a host
/// name.
pub struct MetricPrinter<W: Write> {
    writer: W,
    format: OutputFormat,
    prefix: Option<String>,
}

impl<W: Write> MetricPrinter<W> {
    pub fn new(writer: W, format: OutputFormat, prefix: Option<String>) -> Self {
        Self {
            writer,
            format,
            prefix,
        }
    }

    /// Writes and flushes one line.
    pub fn print(&mut self, metric: &Metric) -> Result<(), PrintError> {
        let prefixed;
        let metric = match &self.prefix {
            Some(prefix) => {
                prefixed = metric.with_prefix(prefix);
                &prefixed
            }
            None => metric,
        };

        match self.format {
            OutputFormat::Plain => writeln!(self.writer, "{metric}")?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.writer, metric)?;
                writeln!(self.writer)?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
