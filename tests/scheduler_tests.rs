// Scheduler tests on paused tokio time: every navigation takes one scripted
// second, so probe start times are fully determined by delay and deadline.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ScriptedDriver, load};
use synthmon::models::ProbeResult;
use synthmon::probe::ProbeSettings;
use synthmon::scheduler::{SchedulerConfig, SchedulerDeps, SchedulerStats, pause, run_scheduler};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

fn targets(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

async fn run(
    driver: Arc<ScriptedDriver>,
    targets: &[String],
    run_for: Duration,
    delay: Duration,
    workers: usize,
    shutdown_rx: watch::Receiver<bool>,
) -> (SchedulerStats, Vec<ProbeResult>) {
    let (results_tx, mut results_rx) = mpsc::channel(256);
    let stats = run_scheduler(
        SchedulerDeps {
            driver,
            settings: Arc::new(ProbeSettings {
                navigation_timeout: Duration::from_secs(60),
                artifact_dir: None,
            }),
            results_tx,
            shutdown_rx,
        },
        targets,
        SchedulerConfig {
            deadline: Instant::now() + run_for,
            inter_probe_delay: delay,
            workers,
        },
    )
    .await;

    let mut results = Vec::new();
    while let Some(r) = results_rx.recv().await {
        results.push(r);
    }
    (stats, results)
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_round_robin_until_deadline() {
    let driver = Arc::new(ScriptedDriver::new(load(1000)));
    let (_tx, rx) = watch::channel(false);
    let list = targets(&["A", "B"]);

    let (stats, results) = run(
        driver.clone(),
        &list,
        Duration::from_secs(30),
        Duration::from_secs(4),
        1,
        rx,
    )
    .await;

    assert_eq!(driver.visits(), vec!["A", "B", "A", "B", "A", "B"]);
    assert_eq!(results.len(), 6);
    assert_eq!(stats.probes_dispatched, 6);
    assert_eq!(stats.passes_started, 3);
    assert!(!stats.stopped_by_signal);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_deadline_can_cut_a_pass_short() {
    let driver = Arc::new(ScriptedDriver::new(load(1000)));
    let (_tx, rx) = watch::channel(false);
    let list = targets(&["A", "B", "C"]);

    let (stats, results) = run(
        driver.clone(),
        &list,
        Duration::from_secs(25),
        Duration::from_secs(4),
        1,
        rx,
    )
    .await;

    assert_eq!(driver.visits(), vec!["A", "B", "C", "A", "B"]);
    assert_eq!(results.len(), 5);
    assert_eq!(stats.passes_started, 2);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_zero_duration_probes_nothing() {
    let driver = Arc::new(ScriptedDriver::new(load(1000)));
    let (_tx, rx) = watch::channel(false);
    let list = targets(&["A"]);

    let (stats, results) = run(driver.clone(), &list, Duration::ZERO, Duration::from_secs(5), 1, rx).await;

    assert!(results.is_empty());
    assert_eq!(stats, SchedulerStats::default());
    assert_eq!(driver.opened(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_empty_target_list_returns() {
    let driver = Arc::new(ScriptedDriver::new(load(1000)));
    let (_tx, rx) = watch::channel(false);

    let (stats, results) = run(driver, &[], Duration::from_secs(60), Duration::ZERO, 1, rx).await;

    assert!(results.is_empty());
    assert_eq!(stats.passes_started, 0);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_stops_on_shutdown_signal() {
    let driver = Arc::new(ScriptedDriver::new(load(1000)));
    let (tx, rx) = watch::channel(false);
    let list = targets(&["A"]);
    let started = Instant::now();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        let _ = tx.send(true);
    });

    let (stats, results) = run(
        driver.clone(),
        &list,
        Duration::from_secs(60),
        Duration::from_secs(4),
        1,
        rx,
    )
    .await;

    assert_eq!(results.len(), 3);
    assert!(stats.stopped_by_signal);
    assert!(started.elapsed() < Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_failures_do_not_stop_the_loop() {
    let driver = Arc::new(
        ScriptedDriver::new(load(1000))
            .script("A", vec![common::Outcome::Timeout, common::Outcome::Fail("reset")]),
    );
    let (_tx, rx) = watch::channel(false);
    let list = targets(&["A"]);

    let (_, results) = run(
        driver.clone(),
        &list,
        Duration::from_secs(15),
        Duration::from_secs(4),
        1,
        rx,
    )
    .await;

    let statuses: Vec<&str> = results.iter().map(|r| r.status.as_str()).collect();
    assert_eq!(statuses, vec!["TIMEOUT", "ERROR", "SUCCESS"]);
    assert_eq!(driver.closed(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_bounds_in_flight_probes() {
    let driver = Arc::new(ScriptedDriver::new(load(2000)).nav_time(Duration::from_secs(2)));
    let (_tx, rx) = watch::channel(false);
    let list = targets(&["A", "B", "C", "D"]);

    let (stats, results) = run(driver.clone(), &list, Duration::from_secs(3), Duration::ZERO, 3, rx).await;

    assert_eq!(driver.max_in_flight(), 3);
    assert_eq!(stats.probes_dispatched, 6);
    assert_eq!(results.len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_pause_is_cut_short_by_deadline() {
    let (_tx, mut rx) = watch::channel(false);
    let start = Instant::now();
    pause(Duration::from_secs(10), start + Duration::from_secs(3), &mut rx).await;
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_pause_ignores_dropped_shutdown_sender() {
    let (tx, mut rx) = watch::channel(false);
    drop(tx);
    let start = Instant::now();
    pause(Duration::from_secs(5), start + Duration::from_secs(60), &mut rx).await;
    assert_eq!(start.elapsed(), Duration::from_secs(5));
}
