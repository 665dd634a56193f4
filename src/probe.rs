// Probe outcome classifier: one driver attempt in, one well-formed ProbeResult out.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::driver::{PageDriver, PageSession};
use crate::error::DriverError;
use crate::models::{ProbeResult, ProbeStatus};

/// What the classifier needs to know about the run for one attempt.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub navigation_timeout: Duration,
    /// Where failure snapshots go; `None` disables capture.
    pub artifact_dir: Option<PathBuf>,
}

/// Runs one attempt against `target`. Never returns an error: driver failures
/// become TIMEOUT / ERROR results and the navigation context is always released.
pub async fn run_probe<D: PageDriver>(driver: &D, target: &str, settings: &ProbeSettings) -> ProbeResult {
    let timestamp = Utc::now();

    let mut session = match driver.open_session().await {
        Ok(s) => s,
        Err(e) => {
            warn!(target_url = %target, error = %e, operation = "open_session", "probe failed");
            // No page to snapshot without a session.
            return classify_failure(timestamp, target, &e);
        }
    };

    let result = match session.navigate(target, settings.navigation_timeout).await {
        Ok(timings) => {
            debug!(
                target_url = %target,
                duration_ms = timings.duration_ms,
                fcp_ms = ?timings.fcp_ms,
                lcp_ms = ?timings.lcp_ms,
                cls = ?timings.cls,
                "probe ok"
            );
            ProbeResult::success(timestamp, target, timings)
        }
        Err(e) => {
            warn!(target_url = %target, error = %e, kind = e.kind(), "probe failed");
            let failed = classify_failure(timestamp, target, &e);
            let artifact = match &settings.artifact_dir {
                Some(dir) => capture(&mut session, dir, timestamp, target, failed.status).await,
                None => None,
            };
            failed.with_artifact(artifact)
        }
    };

    session.close().await;
    result
}

/// Maps a driver error to TIMEOUT or ERROR with the driver's detail.
pub fn classify_failure(timestamp: DateTime<Utc>, target: &str, err: &DriverError) -> ProbeResult {
    let status = if err.is_timeout() {
        ProbeStatus::Timeout
    } else {
        ProbeStatus::Error
    };
    ProbeResult::failed(timestamp, target, status, err.kind(), err.to_string())
}

/// Best-effort snapshot; any failure degrades to no artifact.
async fn capture<S: PageSession>(
    session: &mut S,
    dir: &Path,
    timestamp: DateTime<Utc>,
    target: &str,
    status: ProbeStatus,
) -> Option<String> {
    let path = dir.join(artifact_file_name(timestamp, target, status));
    match session.capture_artifact(&path).await {
        Ok(()) => Some(path.to_string_lossy().into_owned()),
        Err(e) => {
            debug!(target_url = %target, error = %e, "no failure artifact");
            None
        }
    }
}

/// `HHMMSS_<target without scheme, path-safe>_<STATUS>.png`
pub fn artifact_file_name(timestamp: DateTime<Utc>, target: &str, status: ProbeStatus) -> String {
    format!(
        "{}_{}_{}.png",
        timestamp.format("%H%M%S"),
        safe_file_stem(target),
        status
    )
}

fn safe_file_stem(target: &str) -> String {
    let stripped = target
        .strip_prefix("https://")
        .or_else(|| target.strip_prefix("http://"))
        .unwrap_or(target);
    stripped
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '?' | '*' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn artifact_name_strips_scheme_and_slashes() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 9, 8, 7).unwrap();
        assert_eq!(
            artifact_file_name(ts, "https://shop.example/cart?id=1", ProbeStatus::Timeout),
            "090807_shop.example_cart_id=1_TIMEOUT.png"
        );
        assert_eq!(
            artifact_file_name(ts, "http://a.example/", ProbeStatus::Error),
            "090807_a.example__ERROR.png"
        );
    }

    #[test]
    fn classify_failure_splits_timeout_from_error() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 9, 8, 7).unwrap();
        let timeout = DriverError::Timeout {
            elapsed_ms: 60_000,
            detail: "slow".into(),
        };
        let r = classify_failure(ts, "https://a.example", &timeout);
        assert_eq!(r.status, ProbeStatus::Timeout);
        assert_eq!(r.duration_ms, -1);
        assert_eq!(r.error_kind(), "TIMEOUT");

        let r = classify_failure(ts, "https://a.example", &DriverError::Navigation("dns".into()));
        assert_eq!(r.status, ProbeStatus::Error);
        assert_eq!(r.error_kind(), "NAVIGATION");
        assert!(r.error_message().contains("dns"));
    }
}
