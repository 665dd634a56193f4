// Run-scoped output namespace and the append-only raw/error logs.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use crate::aggregation::whole_ms;
use crate::models::{ProbeResult, ProbeStatus, RunContext};

const RAW_HEADER: [&str; 12] = [
    "timestamp_utc",
    "env",
    "run_id",
    "url",
    "status",
    "duration_ms",
    "fcp_ms",
    "lcp_ms",
    "cls",
    "error_kind",
    "error_message",
    "artifact",
];

const ERROR_HEADER: [&str; 8] = [
    "timestamp_utc",
    "env",
    "run_id",
    "url",
    "status",
    "error_kind",
    "error_message",
    "artifact",
];

/// File layout of one run directory.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub run_dir: PathBuf,
    pub screenshots: PathBuf,
    pub raw: PathBuf,
    pub errors: PathBuf,
    pub summary: PathBuf,
    pub bucketed: PathBuf,
    pub exposition: PathBuf,
    pub manifest: PathBuf,
}

impl RunOutput {
    pub fn for_run(ctx: &RunContext) -> Self {
        Self::at(&ctx.run_dir)
    }

    pub fn at(run_dir: &Path) -> Self {
        Self {
            run_dir: run_dir.to_path_buf(),
            screenshots: run_dir.join("screenshots"),
            raw: run_dir.join("results.csv"),
            errors: run_dir.join("errors.csv"),
            summary: run_dir.join("summary_report.csv"),
            bucketed: run_dir.join("bucketed_performance_report.csv"),
            exposition: run_dir.join("prometheus_metrics.txt"),
            manifest: run_dir.join("run.json"),
        }
    }

    /// Creates the run and screenshot directories. Failing here is fatal:
    /// the run must not start without somewhere to write.
    pub fn create_dirs(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.screenshots)
            .with_context(|| format!("creating output directory {}", self.screenshots.display()))
    }
}

/// One `results.csv` row. Metrics are whole ms; `cls` keeps three decimals.
#[derive(Serialize)]
struct RawRow<'a> {
    timestamp_utc: &'a str,
    env: &'a str,
    run_id: &'a str,
    url: &'a str,
    status: ProbeStatus,
    duration_ms: i64,
    fcp_ms: i64,
    lcp_ms: i64,
    cls: String,
    error_kind: &'a str,
    error_message: &'a str,
    artifact: &'a str,
}

/// One `errors.csv` row; only written for non-SUCCESS results.
#[derive(Serialize)]
struct ErrorRow<'a> {
    timestamp_utc: &'a str,
    env: &'a str,
    run_id: &'a str,
    url: &'a str,
    status: ProbeStatus,
    error_kind: &'a str,
    error_message: &'a str,
    artifact: &'a str,
}

/// Raw log (every attempt) plus error log (non-SUCCESS attempts only).
pub struct RawLog {
    environment: String,
    run_id: String,
    raw: csv::Writer<File>,
    errors: csv::Writer<File>,
}

impl RawLog {
    /// Creates both files and writes their header rows.
    pub fn create(output: &RunOutput, environment: &str, run_id: &str) -> anyhow::Result<Self> {
        let mut raw = open_log(&output.raw)?;
        let mut errors = open_log(&output.errors)?;
        raw.write_record(RAW_HEADER)?;
        errors.write_record(ERROR_HEADER)?;
        raw.flush()?;
        errors.flush()?;
        Ok(Self {
            environment: environment.to_string(),
            run_id: run_id.to_string(),
            raw,
            errors,
        })
    }

    pub fn append(&mut self, result: &ProbeResult) -> anyhow::Result<()> {
        let timestamp = result
            .timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let artifact = result.artifact_ref.as_deref().unwrap_or("");
        self.raw.serialize(RawRow {
            timestamp_utc: &timestamp,
            env: &self.environment,
            run_id: &self.run_id,
            url: &result.target,
            status: result.status,
            duration_ms: result.duration_ms,
            fcp_ms: whole_ms(result.fcp_ms),
            lcp_ms: whole_ms(result.lcp_ms),
            cls: format!("{:.3}", result.cls),
            error_kind: result.error_kind(),
            error_message: result.error_message(),
            artifact,
        })?;
        if !result.status.is_success() {
            self.errors.serialize(ErrorRow {
                timestamp_utc: &timestamp,
                env: &self.environment,
                run_id: &self.run_id,
                url: &result.target,
                status: result.status,
                error_kind: result.error_kind(),
                error_message: result.error_message(),
                artifact,
            })?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.raw.flush()?;
        self.errors.flush()?;
        Ok(())
    }
}

/// Headers are written by hand in `create`, so serde must not add its own.
fn open_log(path: &Path) -> anyhow::Result<csv::Writer<File>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))
}
