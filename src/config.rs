use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::driver::chromium::MAX_NAVIGATION_TIMEOUT_MS;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "synthmon.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub driver: DriverConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Label written to every row and used in the output path.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Target list: `.csv` with a `url` column, or one URL per line.
    #[serde(default = "default_targets")]
    pub targets: PathBuf,
    /// How long probes keep being started. 0 = no probes, empty reports.
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u64,
    /// Wait after every probe, success or failure.
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
    /// Width of the trend-report windows; must divide into the hour sensibly (1..=60).
    #[serde(default = "default_bucket_minutes")]
    pub bucket_minutes: u32,
    /// Root of `<output_dir>/<environment>/<run_id>/`.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Probes in flight at once; 1 keeps the loop strictly sequential.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            targets: default_targets(),
            duration_minutes: default_duration_minutes(),
            delay_secs: default_delay_secs(),
            bucket_minutes: default_bucket_minutes(),
            output_dir: default_output_dir(),
            workers: default_workers(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    /// Page load bound; the browser driver cannot wait longer than 30 s.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
    /// Upper bound on waiting for each paint metric after load.
    #[serde(default = "default_metric_timeout_ms")]
    pub metric_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Screenshot failed pages into the run's `screenshots/` directory.
    #[serde(default = "default_true")]
    pub capture_artifacts: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: default_navigation_timeout_ms(),
            metric_timeout_ms: default_metric_timeout_ms(),
            headless: true,
            capture_artifacts: true,
        }
    }
}

fn default_environment() -> String {
    "staging".into()
}

fn default_targets() -> PathBuf {
    PathBuf::from("urls.txt")
}

fn default_duration_minutes() -> u64 {
    30
}

fn default_delay_secs() -> u64 {
    5
}

fn default_bucket_minutes() -> u32 {
    5
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("runs")
}

fn default_workers() -> usize {
    1
}

fn default_navigation_timeout_ms() -> u64 {
    MAX_NAVIGATION_TIMEOUT_MS
}

fn default_metric_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

/// Command-line values that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub environment: Option<String>,
    pub targets: Option<PathBuf>,
    pub duration_minutes: Option<u64>,
    pub delay_secs: Option<u64>,
    pub bucket_minutes: Option<u32>,
    pub output_dir: Option<PathBuf>,
    pub workers: Option<usize>,
}

impl AppConfig {
    /// Resolves the config file (`explicit`, then `CONFIG_FILE`, then
    /// `synthmon.toml` if present) and falls back to defaults when none exists.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => match std::env::var("CONFIG_FILE") {
                Ok(p) => Some(PathBuf::from(p)),
                Err(_) => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
            },
        };
        match path {
            Some(path) => {
                let s = std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("reading config {}: {}", path.display(), e))?;
                Self::load_from_str(&s)
            }
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies command-line overrides and re-validates.
    pub fn with_overrides(mut self, o: Overrides) -> anyhow::Result<Self> {
        if let Some(v) = o.environment {
            self.run.environment = v;
        }
        if let Some(v) = o.targets {
            self.run.targets = v;
        }
        if let Some(v) = o.duration_minutes {
            self.run.duration_minutes = v;
        }
        if let Some(v) = o.delay_secs {
            self.run.delay_secs = v;
        }
        if let Some(v) = o.bucket_minutes {
            self.run.bucket_minutes = v;
        }
        if let Some(v) = o.output_dir {
            self.run.output_dir = v;
        }
        if let Some(v) = o.workers {
            self.run.workers = v;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.run.duration_minutes.saturating_mul(60))
    }

    pub fn inter_probe_delay(&self) -> Duration {
        Duration::from_secs(self.run.delay_secs)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.driver.navigation_timeout_ms)
    }

    pub fn metric_timeout(&self) -> Duration {
        Duration::from_millis(self.driver.metric_timeout_ms)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let env = &self.run.environment;
        anyhow::ensure!(!env.trim().is_empty(), "run.environment must be non-empty");
        anyhow::ensure!(
            !env.contains(['/', '\\']) && env != "." && env != "..",
            "run.environment must be usable as a directory name, got {:?}",
            env
        );
        anyhow::ensure!(
            !self.run.targets.as_os_str().is_empty(),
            "run.targets must be non-empty"
        );
        anyhow::ensure!(
            (1..=60).contains(&self.run.bucket_minutes),
            "run.bucket_minutes must be between 1 and 60, got {}",
            self.run.bucket_minutes
        );
        anyhow::ensure!(
            !self.run.output_dir.as_os_str().is_empty(),
            "run.output_dir must be non-empty"
        );
        anyhow::ensure!(
            self.run.workers > 0,
            "run.workers must be > 0, got {}",
            self.run.workers
        );
        anyhow::ensure!(
            self.driver.navigation_timeout_ms > 0,
            "driver.navigation_timeout_ms must be > 0, got {}",
            self.driver.navigation_timeout_ms
        );
        anyhow::ensure!(
            self.driver.navigation_timeout_ms <= MAX_NAVIGATION_TIMEOUT_MS,
            "driver.navigation_timeout_ms must be <= {}, got {}",
            MAX_NAVIGATION_TIMEOUT_MS,
            self.driver.navigation_timeout_ms
        );
        anyhow::ensure!(
            self.driver.metric_timeout_ms > 0,
            "driver.metric_timeout_ms must be > 0, got {}",
            self.driver.metric_timeout_ms
        );
        anyhow::ensure!(
            self.driver.metric_timeout_ms <= self.driver.navigation_timeout_ms,
            "driver.metric_timeout_ms must not exceed driver.navigation_timeout_ms ({} > {})",
            self.driver.metric_timeout_ms,
            self.driver.navigation_timeout_ms
        );
        Ok(())
    }
}
