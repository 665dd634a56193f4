// Report rows: one struct per output file, serialized in column order.

use serde::Serialize;

/// One row of `summary_report.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub url: String,
    pub avg_ms: i64,
    pub p90_ms: i64,
    pub max_ms: i64,
    pub min_ms: i64,
    pub sample_count: usize,
}

/// One row of `bucketed_performance_report.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketRow {
    pub bucket_start_utc: String,
    pub env: String,
    pub run_id: String,
    pub url: String,
    pub p90_load_ms: i64,
    pub avg_load_ms: i64,
    pub p90_lcp_ms: i64,
    pub avg_lcp_ms: i64,
    pub sample_count: usize,
}

/// One line of the exposition feed (rendered by `report::render_exposition`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpositionSample {
    pub url: String,
    pub p90_ms: i64,
}

/// Probe counts by outcome for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeCounts {
    pub success: u64,
    pub timeout: u64,
    pub error: u64,
}

impl ProbeCounts {
    pub fn total(&self) -> u64 {
        self.success + self.timeout + self.error
    }
}

/// `run.json`: what was run, for how long, and what came out of it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunManifest {
    pub run_id: String,
    pub environment: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub duration_minutes: u64,
    pub delay_secs: u64,
    pub bucket_minutes: u32,
    pub workers: usize,
    pub targets: Vec<String>,
    pub passes_started: u64,
    pub probes: ProbeCounts,
    pub artifacts_captured: u64,
}
