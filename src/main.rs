use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use synthmon::config::{AppConfig, Overrides};
use synthmon::driver::{ChromiumDriver, ChromiumDriverConfig};
use synthmon::{run, targets};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct UtcTimer;

impl FormatTime for UtcTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"))
    }
}

/// Synthetic web performance monitor.
#[derive(Parser)]
#[command(name = "synthmon", version, about)]
struct Cli {
    /// Path to the TOML configuration file (default: $CONFIG_FILE or ./synthmon.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment label written to every row.
    #[arg(long = "env")]
    environment: Option<String>,

    /// Target list (.txt, one URL per line, or .csv with a `url` column).
    #[arg(long = "urls")]
    targets: Option<PathBuf>,

    /// Run duration in minutes.
    #[arg(long)]
    duration: Option<u64>,

    /// Delay after each probe in seconds.
    #[arg(long)]
    delay: Option<u64>,

    /// Bucket width in minutes.
    #[arg(long)]
    bucket: Option<u32>,

    /// Root directory for run outputs.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Probes allowed in flight at once.
    #[arg(long)]
    workers: Option<usize>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            environment: self.environment.clone(),
            targets: self.targets.clone(),
            duration_minutes: self.duration,
            delay_secs: self.delay,
            bucket_minutes: self.bucket,
            output_dir: self.output_dir.clone(),
            workers: self.workers,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(UtcTimer)
        .with_env_filter(filter)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?.with_overrides(cli.overrides())?;

    // Fatal startup checks come before the browser is launched.
    let targets = targets::load_targets(&config.run.targets)?;
    let prepared = run::prepare(&config, targets).context("preparing run")?;
    let driver = Arc::new(
        ChromiumDriver::launch(ChromiumDriverConfig {
            headless: config.driver.headless,
            navigation_timeout: config.navigation_timeout(),
            metric_timeout: config.metric_timeout(),
        })
        .await?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Received shutdown signal; finishing in-flight probes");
        let _ = shutdown_tx.send(true);
    });

    let outcome = run::execute(prepared, driver.clone(), shutdown_rx).await;

    if let Ok(driver) = Arc::try_unwrap(driver) {
        driver.shutdown().await;
    }

    let report = outcome?;
    for row in &report.summary {
        tracing::info!(
            url = %row.url,
            samples = row.sample_count,
            avg_ms = row.avg_ms,
            p90_ms = row.p90_ms,
            min_ms = row.min_ms,
            max_ms = row.max_ms,
            "summary"
        );
    }
    tracing::info!(run_dir = %report.output.run_dir.display(), "outputs written");
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
