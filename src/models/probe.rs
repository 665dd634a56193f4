// One probe attempt against one target, as it lands in the raw log.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Sentinel for timings that were not measured.
pub const NOT_MEASURED: i64 = -1;

/// Outcome of a single probe; serializes to upper case (e.g. "SUCCESS").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeStatus {
    Success,
    Timeout,
    Error,
}

impl ProbeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeStatus::Success => "SUCCESS",
            ProbeStatus::Timeout => "TIMEOUT",
            ProbeStatus::Error => "ERROR",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ProbeStatus::Success)
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paint and layout metrics reported by the driver for one navigation.
/// Each metric is optional on its own; a missing one never fails the probe.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PageTimings {
    pub duration_ms: i64,
    pub fcp_ms: Option<f64>,
    pub lcp_ms: Option<f64>,
    pub cls: Option<f64>,
}

/// Failure detail carried by TIMEOUT / ERROR results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub kind: String,
    pub message: String,
}

/// Immutable record of one (target, attempt).
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub timestamp: DateTime<Utc>,
    pub target: String,
    pub status: ProbeStatus,
    /// Navigation wall time; `NOT_MEASURED` unless SUCCESS.
    pub duration_ms: i64,
    /// -1.0 when unavailable.
    pub fcp_ms: f64,
    /// -1.0 when unavailable.
    pub lcp_ms: f64,
    /// 0.0 when unavailable.
    pub cls: f64,
    pub failure: Option<ProbeFailure>,
    pub artifact_ref: Option<String>,
}

impl ProbeResult {
    pub fn success(timestamp: DateTime<Utc>, target: impl Into<String>, timings: PageTimings) -> Self {
        Self {
            timestamp,
            target: target.into(),
            status: ProbeStatus::Success,
            duration_ms: timings.duration_ms.max(0),
            fcp_ms: timings.fcp_ms.unwrap_or(NOT_MEASURED as f64),
            lcp_ms: timings.lcp_ms.unwrap_or(NOT_MEASURED as f64),
            cls: timings.cls.map(|v| v.max(0.0)).unwrap_or(0.0),
            failure: None,
            artifact_ref: None,
        }
    }

    pub fn failed(
        timestamp: DateTime<Utc>,
        target: impl Into<String>,
        status: ProbeStatus,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            target: target.into(),
            status,
            duration_ms: NOT_MEASURED,
            fcp_ms: NOT_MEASURED as f64,
            lcp_ms: NOT_MEASURED as f64,
            cls: 0.0,
            failure: Some(ProbeFailure {
                kind: kind.into(),
                message: message.into(),
            }),
            artifact_ref: None,
        }
    }

    pub fn with_artifact(mut self, artifact_ref: Option<String>) -> Self {
        self.artifact_ref = artifact_ref;
        self
    }

    pub fn error_kind(&self) -> &str {
        self.failure.as_ref().map(|f| f.kind.as_str()).unwrap_or("")
    }

    pub fn error_message(&self) -> &str {
        self.failure.as_ref().map(|f| f.message.as_str()).unwrap_or("")
    }
}
