// Run scheduler: round-robin passes over the target list until the deadline.
// Each worker slot is held for probe + inter-probe delay, so with one worker
// the loop is strictly probe -> delay -> next target. Results go to the
// recorder over a channel; the scheduler never touches the store.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{Duration, Instant, sleep_until};
use tracing::{debug, info, instrument, warn};

use crate::driver::PageDriver;
use crate::models::ProbeResult;
use crate::probe::{ProbeSettings, run_probe};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// No probe starts at or after this instant.
    pub deadline: Instant,
    pub inter_probe_delay: Duration,
    /// Probes allowed in flight at once (1 = sequential).
    pub workers: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub passes_started: u64,
    pub probes_dispatched: u64,
    pub stopped_by_signal: bool,
}

/// Repos, channels and shutdown for the scheduler.
pub struct SchedulerDeps<D> {
    pub driver: Arc<D>,
    pub settings: Arc<ProbeSettings>,
    pub results_tx: mpsc::Sender<ProbeResult>,
    /// `true` means stop as if the deadline had been reached.
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Drives probes until the deadline (or shutdown) and waits for in-flight
/// probes to be recorded. Dropping the last results sender on return lets the
/// recorder finish.
#[instrument(skip_all, fields(targets = targets.len(), workers = config.workers))]
pub async fn run_scheduler<D: PageDriver>(
    deps: SchedulerDeps<D>,
    targets: &[String],
    config: SchedulerConfig,
) -> SchedulerStats {
    let SchedulerDeps {
        driver,
        settings,
        results_tx,
        mut shutdown_rx,
    } = deps;
    let SchedulerConfig {
        deadline,
        inter_probe_delay,
        workers,
    } = config;

    let mut stats = SchedulerStats::default();
    if targets.is_empty() {
        return stats;
    }

    let slots = Arc::new(Semaphore::new(workers.max(1)));
    let mut in_flight = JoinSet::new();

    'passes: while !should_stop(deadline, &shutdown_rx) {
        for (position, target) in targets.iter().enumerate() {
            if should_stop(deadline, &shutdown_rx) {
                break 'passes;
            }
            let permit = tokio::select! {
                permit = slots.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break 'passes,
                },
                _ = sleep_until(deadline) => break 'passes,
                _ = wait_for_shutdown(&mut shutdown_rx) => break 'passes,
            };
            // Acquiring a slot may have taken us past the deadline.
            if should_stop(deadline, &shutdown_rx) {
                break 'passes;
            }

            if position == 0 {
                stats.passes_started += 1;
                debug!(pass = stats.passes_started, "starting pass");
            }
            stats.probes_dispatched += 1;
            let driver = driver.clone();
            let settings = settings.clone();
            let results_tx = results_tx.clone();
            let mut shutdown_rx = shutdown_rx.clone();
            let target = target.clone();
            in_flight.spawn(async move {
                let result = run_probe(driver.as_ref(), &target, &settings).await;
                if results_tx.send(result).await.is_err() {
                    debug!("recorder channel closed");
                }
                pause(inter_probe_delay, deadline, &mut shutdown_rx).await;
                drop(permit);
            });

            // Reap finished probes so the set does not grow with the run.
            while let Some(joined) = in_flight.try_join_next() {
                log_join(joined);
            }
        }
    }

    stats.stopped_by_signal = *shutdown_rx.borrow();
    while let Some(joined) = in_flight.join_next().await {
        log_join(joined);
    }
    info!(
        passes = stats.passes_started,
        probes = stats.probes_dispatched,
        stopped_by_signal = stats.stopped_by_signal,
        "scheduler finished"
    );
    stats
}

fn should_stop(deadline: Instant, shutdown_rx: &watch::Receiver<bool>) -> bool {
    Instant::now() >= deadline || *shutdown_rx.borrow()
}

/// Inter-probe delay that returns early at the deadline or on shutdown.
pub async fn pause(delay: Duration, deadline: Instant, shutdown_rx: &mut watch::Receiver<bool>) {
    let until = (Instant::now() + delay).min(deadline);
    tokio::select! {
        _ = sleep_until(until) => {}
        _ = wait_for_shutdown(shutdown_rx) => {}
    }
}

/// Resolves once shutdown is requested; never resolves if the sender is gone.
async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    let requested = shutdown_rx.wait_for(|stop| *stop).await.is_ok();
    if !requested {
        std::future::pending::<()>().await;
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        warn!(error = %e, operation = "probe_task", "probe task failed");
    }
}
