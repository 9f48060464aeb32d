use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, MetricPrinter};
use common::util::trace::initialize_tracing;
use common::StatsConfig;
use serverstats::ServerStats;
use std::io;
use sysinfo::System;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    initialize_tracing("info")?;

    let args = Cli::parse();
    let mut config = StatsConfig::load_from_file_and_env(args.config())
        .with_context(|| format!("Failed to load configuration from {}", args.config()))?;
    args.apply_overrides(&mut config);

    let host_name = if args.no_hostname() {
        None
    } else {
        System::host_name()
    };
    info!(?host_name, format = %args.format(), "serverstats started");

    let (mut stream, tasks) = ServerStats::builder()
        .config(config)
        .build()
        .start()?
        .into_parts();
    let mut printer = MetricPrinter::new(io::stdout(), args.format(), host_name);

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut printed = 0_u64;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Shutdown signal received");
                break;
            }
            metric = stream.recv() => {
                let Some(metric) = metric else {
                    warn!("Metric stream ended unexpectedly");
                    break;
                };
                printer.print(&metric)?;
                printed += 1;
                if args.count().is_some_and(|count| printed >= count) {
                    break;
                }
            }
        }
    }

    let summaries = tasks.shutdown().await;
    drop(stream);
    for summary in summaries {
        info!(%summary, "Producer finished");
    }
    info!(printed, "serverstats stopped");

    Ok(())
}
