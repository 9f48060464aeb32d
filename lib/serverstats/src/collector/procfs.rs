//! Parsing of `/proc/stat` and `/proc/loadavg`.

use super::{CpuTicks, LoadAverage};
use crate::error::CollectError;
use std::path::Path;

/// Default path of the kernel CPU statistics file.
pub(crate) const PROC_STAT_PATH: &str = "/proc/stat";

/// Default path of the kernel load-average file.
pub(crate) const PROC_LOADAVG_PATH: &str = "/proc/loadavg";

/// Parses the aggregate `cpu` line of a `/proc/stat`-formatted string.
///
/// Format: `cpu  user nice system idle iowait irq softirq steal guest guest_nice`.
/// Kernels older than 2.6.11 stop after `softirq`; missing trailing columns
/// read as zero.
pub(crate) fn parse_cpu_ticks(content: &str, source_path: &Path) -> Result<CpuTicks, CollectError> {
    let line = content
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| CollectError::Parse {
            path: source_path.display().to_string(),
            detail: "aggregate cpu line not found".to_string(),
        })?;

    let mut columns = line.split_whitespace().skip(1).map(|s| {
        s.parse::<u64>().map_err(|_| CollectError::Parse {
            path: source_path.display().to_string(),
            detail: format!("expected integer tick count, got '{s}'"),
        })
    });

    let mut next = |required: bool| -> Result<u64, CollectError> {
        match columns.next() {
            Some(value) => value,
            None if required => Err(CollectError::Parse {
                path: source_path.display().to_string(),
                detail: "truncated cpu line".to_string(),
            }),
            None => Ok(0),
        }
    };

    Ok(CpuTicks {
        user: next(true)?,
        nice: next(true)?,
        sys: next(true)?,
        idle: next(true)?,
        wait: next(false)?,
        irq: next(false)?,
        soft_irq: next(false)?,
        stolen: next(false)?,
    })
}

/// Parses the three load averages at the start of `/proc/loadavg`.
///
/// Format: `0.20 0.18 0.12 1/80 11206`. Only the first three fields are read.
pub(crate) fn parse_load_average(
    content: &str,
    source_path: &Path,
) -> Result<LoadAverage, CollectError> {
    let parse_error = |detail: String| CollectError::Parse {
        path: source_path.display().to_string(),
        detail,
    };

    let mut fields = content.split_whitespace();
    let mut next = |window: &str| -> Result<f64, CollectError> {
        let field = fields
            .next()
            .ok_or_else(|| parse_error(format!("missing {window}-minute load average")))?;
        match field.parse::<f64>() {
            Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
            _ => Err(parse_error(format!(
                "expected {window}-minute load average, got '{field}'"
            ))),
        }
    };

    Ok(LoadAverage {
        one: next("one")?,
        five: next("five")?,
        fifteen: next("fifteen")?,
    })
}
