// One bounded run: context + output namespace, scheduler -> recorder, then
// the three report exports and the run manifest.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{info, instrument};

use crate::aggregation::AggregationStore;
use crate::config::AppConfig;
use crate::driver::PageDriver;
use crate::models::{ProbeCounts, RunContext, RunManifest, SummaryRow};
use crate::output::{RawLog, RunOutput};
use crate::probe::ProbeSettings;
use crate::recorder::{RecorderConfig, recorder_channel_capacity, spawn_recorder};
use crate::report;
use crate::scheduler::{SchedulerConfig, SchedulerDeps, SchedulerStats, run_scheduler};

/// A run whose context, directories and log files exist; nothing probed yet.
pub struct PreparedRun {
    pub ctx: RunContext,
    pub output: RunOutput,
    pub targets: Vec<String>,
    raw_log: RawLog,
    workers: usize,
    capture_artifacts: bool,
    duration_minutes: u64,
    delay_secs: u64,
}

/// What a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub ctx: RunContext,
    pub output: RunOutput,
    pub scheduler: SchedulerStats,
    pub probes: ProbeCounts,
    pub summary: Vec<SummaryRow>,
}

/// Creates the run context and output namespace. Any failure here is fatal
/// and happens before the first probe.
pub fn prepare(config: &AppConfig, targets: Vec<String>) -> anyhow::Result<PreparedRun> {
    anyhow::ensure!(!targets.is_empty(), "no targets to probe");
    let ctx = RunContext::new(
        config.run.environment.clone(),
        &config.run.output_dir,
        config.run_duration(),
        config.inter_probe_delay(),
        config.run.bucket_minutes,
        config.navigation_timeout(),
    );
    let output = RunOutput::for_run(&ctx);
    output.create_dirs()?;
    let raw_log = RawLog::create(&output, &ctx.environment, &ctx.run_id)?;

    Ok(PreparedRun {
        ctx,
        output,
        targets,
        raw_log,
        workers: config.run.workers,
        capture_artifacts: config.driver.capture_artifacts,
        duration_minutes: config.run.duration_minutes,
        delay_secs: config.run.delay_secs,
    })
}

/// Probes until the deadline (or shutdown), then writes every report.
#[instrument(skip_all, fields(run_id = %prepared.ctx.run_id, env = %prepared.ctx.environment))]
pub async fn execute<D: PageDriver>(
    prepared: PreparedRun,
    driver: Arc<D>,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<RunReport> {
    let PreparedRun {
        ctx,
        output,
        targets,
        raw_log,
        workers,
        capture_artifacts,
        duration_minutes,
        delay_secs,
    } = prepared;

    info!(
        targets = targets.len(),
        duration_minutes,
        delay_secs,
        bucket_minutes = ctx.bucket_minutes,
        workers,
        run_dir = %output.run_dir.display(),
        "run starting"
    );

    let (results_tx, results_rx) = mpsc::channel(recorder_channel_capacity(workers));
    let recorder = spawn_recorder(
        results_rx,
        raw_log,
        AggregationStore::new(ctx.bucket_minutes),
        RecorderConfig::default(),
    );

    let settings = Arc::new(ProbeSettings {
        navigation_timeout: ctx.navigation_timeout,
        artifact_dir: capture_artifacts.then(|| output.screenshots.clone()),
    });
    let scheduler = run_scheduler(
        SchedulerDeps {
            driver,
            settings,
            results_tx,
            shutdown_rx,
        },
        &targets,
        SchedulerConfig {
            deadline: ctx.deadline,
            inter_probe_delay: ctx.inter_probe_delay,
            workers,
        },
    )
    .await;

    let recorded = recorder.await.context("recorder task")?;
    let summary = export_reports(&recorded.store, &ctx, &output)?;

    let manifest = RunManifest {
        run_id: ctx.run_id.clone(),
        environment: ctx.environment.clone(),
        started_at: ctx.started_at,
        finished_at: Utc::now(),
        duration_minutes,
        delay_secs,
        bucket_minutes: ctx.bucket_minutes,
        workers,
        targets,
        passes_started: scheduler.passes_started,
        probes: recorded.counts,
        artifacts_captured: recorded.artifacts_captured,
    };
    report::write_manifest(&output.manifest, &manifest)?;

    info!(
        success = recorded.counts.success,
        timeout = recorded.counts.timeout,
        error = recorded.counts.error,
        artifacts = recorded.artifacts_captured,
        log_write_failures = recorded.log_write_failures,
        "run complete"
    );

    Ok(RunReport {
        ctx,
        output,
        scheduler,
        probes: recorded.counts,
        summary,
    })
}

/// Summary, bucketed and exposition files from the final store.
pub fn export_reports(
    store: &AggregationStore,
    ctx: &RunContext,
    output: &RunOutput,
) -> anyhow::Result<Vec<SummaryRow>> {
    let summary = report::summary(store);
    report::write_summary(&output.summary, &summary)?;

    let bucketed = report::bucketed(store, &ctx.environment, &ctx.run_id);
    report::write_bucketed(&output.bucketed, &bucketed)?;

    let exposition = report::exposition(store);
    let rendered = report::render_exposition(&exposition, &ctx.environment, &ctx.run_id);
    report::write_exposition(&output.exposition, &rendered)?;

    info!(
        summary_rows = summary.len(),
        bucket_rows = bucketed.len(),
        summary = %output.summary.display(),
        "reports written"
    );
    Ok(summary)
}
