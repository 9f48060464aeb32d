use pretty_assertions_sorted::assert_eq;
use serverstats::collector::{CpuTicks, LoadAverage, MemoryCounters, SwapCounters};
use serverstats::{
    ScriptedSource, ServerStats, ServerStatsPeriodes, StatsConfig, Step, StreamConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};

const MB: u64 = 1024 * 1024;

fn memory() -> MemoryCounters {
    MemoryCounters {
        total: 4096 * MB,
        used: 3072 * MB,
        free: 1024 * MB,
        actual_used: 1024 * MB,
        actual_free: 3072 * MB,
    }
}

fn host() -> ScriptedSource {
    ScriptedSource::steady(
        memory(),
        SwapCounters {
            total: 1024 * MB,
            used: 256 * MB,
            free: 768 * MB,
        },
        LoadAverage {
            one: 0.5,
            five: 0.25,
            fifteen: 0.125,
        },
        CpuTicks {
            user: 10,
            sys: 10,
            idle: 80,
            ..Default::default()
        },
    )
}

fn periodes(mem: u64, load_avg: u64, cpu: u64) -> ServerStatsPeriodes {
    ServerStatsPeriodes::new(
        Duration::from_millis(mem),
        Duration::from_millis(load_avg),
        Duration::from_millis(cpu),
    )
}

fn start(source: ScriptedSource, periodes: ServerStatsPeriodes) -> ServerStats {
    ServerStats::builder()
        .config(StatsConfig::with_periodes(periodes))
        .source(Arc::new(source))
        .build()
        .start()
        .unwrap()
}

/// Drains the stream until `deadline`, recording when each metric arrived.
async fn collect_until(
    stats: &mut ServerStats,
    deadline: Duration,
) -> Vec<(Duration, String)> {
    let started = Instant::now();
    let mut arrivals = Vec::new();
    while let Ok(Some(metric)) = time::timeout_at(started + deadline, stats.next_metric()).await {
        arrivals.push((started.elapsed(), metric.name().clone()));
    }
    arrivals
}

fn arrivals_of(arrivals: &[(Duration, String)], name: &str) -> Vec<u128> {
    arrivals
        .iter()
        .filter(|(_, n)| n == name)
        .map(|(at, _)| at.as_millis())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn producers_keep_independent_cadences() {
    let mut stats = start(host(), periodes(200, 500, 100));

    let arrivals = collect_until(&mut stats, Duration::from_millis(950)).await;
    stats.shutdown().await;

    assert_eq!(arrivals_of(&arrivals, "mem.total"), vec![0, 200, 400, 600, 800]);
    assert_eq!(arrivals_of(&arrivals, "loadavg.one"), vec![0, 500]);
    assert_eq!(
        arrivals_of(&arrivals, "cpu.user"),
        vec![100, 200, 300, 400, 500, 600, 700, 800, 900]
    );
}

#[tokio::test(start_paused = true)]
async fn every_memory_tick_arrives_whole() {
    let mut stats = start(host(), periodes(100, 10_000, 10_000));

    let arrivals = collect_until(&mut stats, Duration::from_millis(450)).await;
    let summaries = stats.shutdown().await;

    let memory: Vec<&str> = arrivals
        .iter()
        .map(|(_, name)| name.as_str())
        .filter(|name| name.starts_with("mem.") || name.starts_with("swap."))
        .collect();
    let expected_tick = [
        "mem.total",
        "mem.used",
        "mem.free",
        "mem.actualused",
        "mem.actualfree",
        "swap.total",
        "swap.used",
        "swap.free",
        "mem.actualusedpercent",
        "swap.usedpercent",
    ];
    assert_eq!(memory.len(), 5 * expected_tick.len());
    for tick in memory.chunks(expected_tick.len()) {
        assert_eq!(tick, expected_tick);
    }

    let mem = summaries.iter().find(|s| s.name() == "mem").unwrap();
    assert_eq!(mem.ticks(), 5);
    assert_eq!(mem.metrics_sent(), 50);
    assert_eq!(mem.dropped(), 0);
}

#[tokio::test(start_paused = true)]
async fn panicking_memory_read_spares_siblings() {
    let source = host().with_memory([Step::Yield(memory()), Step::Panic, Step::Yield(memory())]);
    let mut stats = start(source, periodes(100, 100, 100));

    let arrivals = collect_until(&mut stats, Duration::from_millis(350)).await;
    let summaries = stats.shutdown().await;

    assert_eq!(arrivals_of(&arrivals, "mem.total"), vec![0, 200, 300]);
    assert_eq!(arrivals_of(&arrivals, "loadavg.one"), vec![0, 100, 200, 300]);
    assert_eq!(arrivals_of(&arrivals, "cpu.idle"), vec![100, 200, 300]);

    let mem = summaries.iter().find(|s| s.name() == "mem").unwrap();
    assert_eq!(mem.panics(), 1);
    assert_eq!(mem.ticks(), 4);
    for sibling in ["loadavg", "cpu"] {
        let summary = summaries.iter().find(|s| s.name() == sibling).unwrap();
        assert_eq!(summary.panics(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn unavailable_counters_skip_ticks_only() {
    let source = host().with_load_average([
        Step::Unavailable,
        Step::Yield(LoadAverage {
            one: 4.0,
            five: 3.0,
            fifteen: 2.0,
        }),
    ]);
    let mut stats = start(source, periodes(1_000, 100, 1_000));

    let arrivals = collect_until(&mut stats, Duration::from_millis(250)).await;
    let summaries = stats.shutdown().await;

    assert_eq!(arrivals_of(&arrivals, "loadavg.fifteen"), vec![100, 200]);
    let load = summaries.iter().find(|s| s.name() == "loadavg").unwrap();
    assert_eq!(load.read_failures(), 1);
    assert_eq!(load.metrics_sent(), 6);
}

#[tokio::test(start_paused = true)]
async fn shutdown_joins_every_producer_and_ends_stream() {
    let (mut stream, tasks) = start(host(), periodes(100, 100, 100)).into_parts();

    assert!(stream.recv().await.is_some());
    let summaries = tasks.shutdown().await;

    let mut names: Vec<&str> = summaries.iter().map(|s| s.name()).collect();
    names.sort();
    assert_eq!(names, vec!["cpu", "loadavg", "mem"]);

    while stream.recv().await.is_some() {}
    assert!(stream.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn slow_consumer_with_send_timeout_drops_instead_of_stalling() {
    let config = StatsConfig::builder()
        .periodes(periodes(100, 10_000, 10_000))
        .stream(
            StreamConfig::builder()
                .capacity(4)
                .send_timeout(Some(Duration::from_millis(20)))
                .build(),
        )
        .build();
    let stats = ServerStats::builder()
        .config(config)
        .source(Arc::new(host()))
        .build()
        .start()
        .unwrap();
    let (_stream, tasks) = stats.into_parts();

    time::sleep(Duration::from_millis(250)).await;
    let summaries = tasks.shutdown().await;

    let mem = summaries.iter().find(|s| s.name() == "mem").unwrap();
    assert!(mem.ticks() >= 2);
    assert!(mem.dropped() > 0);
}

#[tokio::test(start_paused = true)]
async fn initial_delay_postpones_scheduled_producers() {
    let config = StatsConfig::builder()
        .periodes(periodes(100, 100, 10_000))
        .initial_delay(Duration::from_millis(300))
        .build();
    let mut stats = ServerStats::builder()
        .config(config)
        .source(Arc::new(host()))
        .build()
        .start()
        .unwrap();

    let arrivals = collect_until(&mut stats, Duration::from_millis(450)).await;
    stats.shutdown().await;

    assert_eq!(arrivals_of(&arrivals, "mem.total"), vec![300, 400]);
    assert_eq!(arrivals_of(&arrivals, "loadavg.one"), vec![300, 400]);
}
