// Run identity: created once at start, read-only afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Read-only description of one bounded execution.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub environment: String,
    pub started_at: DateTime<Utc>,
    /// Absolute point at which no new probe may start.
    pub deadline: Instant,
    pub inter_probe_delay: Duration,
    pub bucket_minutes: u32,
    pub navigation_timeout: Duration,
    /// `<output_dir>/<environment>/<run_id>`
    pub run_dir: PathBuf,
}

impl RunContext {
    /// Builds a context whose deadline is `duration` from now and whose run
    /// directory lives under `output_dir/environment/run_id`.
    pub fn new(
        environment: impl Into<String>,
        output_dir: &Path,
        duration: Duration,
        inter_probe_delay: Duration,
        bucket_minutes: u32,
        navigation_timeout: Duration,
    ) -> Self {
        let environment = environment.into();
        let started_at = Utc::now();
        let run_id = new_run_id(started_at);
        let run_dir = output_dir.join(&environment).join(&run_id);
        Self {
            run_id,
            environment,
            started_at,
            deadline: Instant::now() + duration,
            inter_probe_delay,
            bucket_minutes,
            navigation_timeout,
            run_dir,
        }
    }

}

/// Time-ordered run id with a short random suffix, e.g. `20240101T120000Z_3fa2c1`.
pub fn new_run_id(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", now.format("%Y%m%dT%H%M%SZ"), &suffix[..6])
}
