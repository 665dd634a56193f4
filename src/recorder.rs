// Single writer for probe results.
// The scheduler (and any probe workers) only send; this task appends to the
// raw/error logs and is the only place the aggregation store is mutated.

use tokio::sync::mpsc;
use tokio::time::{Duration, interval};

use crate::aggregation::AggregationStore;
use crate::models::{ProbeCounts, ProbeResult, ProbeStatus};
use crate::output::RawLog;

/// Channel capacity between probe workers and the recorder.
pub fn recorder_channel_capacity(workers: usize) -> usize {
    (workers * 4).max(16)
}

/// Batching for raw log writes.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Flush once this many rows are pending.
    pub flush_rows: usize,
    /// Flush at least this often while results trickle in.
    pub flush_interval_secs: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            flush_rows: 1,
            flush_interval_secs: 5,
        }
    }
}

/// Everything the recorder accumulated, handed back when the channel closes.
#[derive(Debug)]
pub struct Recorded {
    pub store: AggregationStore,
    pub counts: ProbeCounts,
    pub artifacts_captured: u64,
    pub log_write_failures: u64,
}

/// Spawns the recorder. It drains `rx` until every sender is dropped, flushes
/// the logs one last time and returns what it recorded.
pub fn spawn_recorder(
    mut rx: mpsc::Receiver<ProbeResult>,
    mut raw_log: RawLog,
    store: AggregationStore,
    config: RecorderConfig,
) -> tokio::task::JoinHandle<Recorded> {
    let flush_interval = Duration::from_secs(config.flush_interval_secs.max(1));
    tokio::spawn(async move {
        let mut recorded = Recorded {
            store,
            counts: ProbeCounts::default(),
            artifacts_captured: 0,
            log_write_failures: 0,
        };
        let mut pending = 0usize;
        let mut flush_tick = interval(flush_interval);
        flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Some(result) => {
                            ingest(&mut recorded, &mut raw_log, &result);
                            pending += 1;
                            if pending >= config.flush_rows {
                                flush(&mut raw_log, &mut recorded);
                                pending = 0;
                            }
                        }
                        None => break,
                    }
                }
                _ = flush_tick.tick() => {
                    if pending > 0 {
                        flush(&mut raw_log, &mut recorded);
                        pending = 0;
                    }
                }
            }
        }
        flush(&mut raw_log, &mut recorded);
        tracing::debug!(
            probes = recorded.counts.total(),
            "recorder shutting down"
        );
        recorded
    })
}

fn ingest(recorded: &mut Recorded, raw_log: &mut RawLog, result: &ProbeResult) {
    if let Err(e) = raw_log.append(result) {
        recorded.log_write_failures += 1;
        tracing::warn!(error = %e, operation = "append_raw_log", "raw log write failed");
    }
    match result.status {
        ProbeStatus::Success => recorded.counts.success += 1,
        ProbeStatus::Timeout => recorded.counts.timeout += 1,
        ProbeStatus::Error => recorded.counts.error += 1,
    }
    if result.artifact_ref.is_some() {
        recorded.artifacts_captured += 1;
    }
    recorded.store.record(result);
}

fn flush(raw_log: &mut RawLog, recorded: &mut Recorded) {
    if let Err(e) = raw_log.flush() {
        recorded.log_write_failures += 1;
        tracing::warn!(error = %e, operation = "flush_raw_log", "raw log flush failed");
    }
}
