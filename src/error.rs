// Typed errors at the library seams. Orchestration code wraps these in anyhow.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a page-load driver for one attempt.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Navigation did not finish within its allotted time.
    #[error("navigation timed out after {elapsed_ms} ms: {detail}")]
    Timeout { elapsed_ms: u64, detail: String },
    /// Navigation failed for any other reason (DNS, TLS, HTTP, crash...).
    #[error("navigation failed: {0}")]
    Navigation(String),
    /// No navigation context could be acquired for the attempt.
    #[error("could not open page: {0}")]
    Session(String),
    /// Failure artifact could not be captured.
    #[error("artifact capture failed: {0}")]
    Capture(String),
}

impl DriverError {
    /// Short label written to the `error_kind` column.
    pub fn kind(&self) -> &'static str {
        match self {
            DriverError::Timeout { .. } => "TIMEOUT",
            DriverError::Navigation(_) => "NAVIGATION",
            DriverError::Session(_) => "SESSION",
            DriverError::Capture(_) => "CAPTURE",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }
}

/// Target list could not be turned into a non-empty list of URLs.
#[derive(Debug, Error)]
pub enum TargetListError {
    #[error("reading target list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing target list {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("target list {path} has no `url` column")]
    MissingUrlColumn { path: PathBuf },
    #[error("target list {path} contains no targets")]
    Empty { path: PathBuf },
}
