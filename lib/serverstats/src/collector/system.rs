//! Counter source backed by the host operating system.
//!
//! Memory and swap come from `sysinfo`. Per-mode CPU ticks are not exposed by
//! `sysinfo`, so they are read from `/proc/stat` directly; on hosts without
//! procfs the CPU family reports [`CollectError::NotAvailable`]. On Linux the
//! load average is read from `/proc/loadavg` as well, since `sysinfo` turns an
//! unreadable file into zeros.

use super::procfs::{
    parse_cpu_ticks, parse_load_average, PROC_LOADAVG_PATH, PROC_STAT_PATH,
};
use super::{CounterSource, CpuTicks, LoadAverage, MemoryCounters, SwapCounters};
use crate::error::CollectError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::path::PathBuf;
use sysinfo::System;
use tracing::trace;

#[derive(Debug)]
pub struct SystemSource {
    system: Mutex<System>,
    stat_path: PathBuf,
    /// `None` asks `sysinfo` instead, on hosts without procfs.
    loadavg_path: Option<PathBuf>,
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSource {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            stat_path: PathBuf::from(PROC_STAT_PATH),
            loadavg_path: cfg!(target_os = "linux").then(|| PathBuf::from(PROC_LOADAVG_PATH)),
        }
    }

    /// Reads CPU ticks from a specific `/proc/stat`-formatted file.
    pub fn with_stat_path(mut self, stat_path: impl Into<PathBuf>) -> Self {
        self.stat_path = stat_path.into();
        self
    }

    /// Reads load averages from a specific `/proc/loadavg`-formatted file.
    pub fn with_loadavg_path(mut self, loadavg_path: impl Into<PathBuf>) -> Self {
        self.loadavg_path = Some(loadavg_path.into());
        self
    }

    fn ensure_supported(what: &'static str) -> Result<(), CollectError> {
        if sysinfo::IS_SUPPORTED_SYSTEM {
            Ok(())
        } else {
            Err(CollectError::NotAvailable { what })
        }
    }
}

#[async_trait]
impl CounterSource for SystemSource {
    async fn memory(&self) -> Result<MemoryCounters, CollectError> {
        Self::ensure_supported("memory")?;

        let (total, free, available) = {
            let mut system = self.system.lock();
            system.refresh_memory();
            (
                system.total_memory(),
                system.free_memory(),
                system.available_memory(),
            )
        };
        trace!(total, free, available, "Read memory counters");

        Ok(MemoryCounters {
            total,
            used: total.saturating_sub(free),
            free,
            actual_used: total.saturating_sub(available),
            actual_free: available,
        })
    }

    async fn swap(&self) -> Result<SwapCounters, CollectError> {
        Self::ensure_supported("swap")?;

        let mut system = self.system.lock();
        system.refresh_memory();
        Ok(SwapCounters {
            total: system.total_swap(),
            used: system.used_swap(),
            free: system.free_swap(),
        })
    }

    async fn load_average(&self) -> Result<LoadAverage, CollectError> {
        if let Some(path) = &self.loadavg_path {
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CollectError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
            return parse_load_average(&content, path);
        }

        // Windows has no load average; sysinfo reports zeros there.
        if cfg!(windows) {
            return Err(CollectError::NotAvailable {
                what: "load average",
            });
        }
        Self::ensure_supported("load average")?;

        let load = System::load_average();
        Ok(LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        })
    }

    async fn cpu_ticks(&self) -> Result<CpuTicks, CollectError> {
        let content = tokio::fs::read_to_string(&self.stat_path)
            .await
            .map_err(|source| match source.kind() {
                ErrorKind::NotFound => CollectError::NotAvailable { what: "cpu" },
                _ => CollectError::Read {
                    path: self.stat_path.display().to_string(),
                    source,
                },
            })?;

        parse_cpu_ticks(&content, &self.stat_path)
    }
}
