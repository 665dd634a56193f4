// Page-load driver contract. The core only sees these two traits; the
// Chromium implementation lives in `chromium`, tests use scripted drivers.

pub mod chromium;

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use crate::error::DriverError;
use crate::models::PageTimings;

pub use chromium::{ChromiumDriver, ChromiumDriverConfig};

/// Hands out one navigation context per probe attempt.
pub trait PageDriver: Send + Sync + 'static {
    type Session: PageSession;

    /// Acquires a fresh navigation context. Metric observation state must not
    /// be shared between sessions.
    fn open_session(&self) -> impl Future<Output = Result<Self::Session, DriverError>> + Send;
}

/// One navigation context, used for exactly one attempt and then closed.
pub trait PageSession: Send {
    /// Navigates to `target` and returns the measured timings. Must resolve
    /// within roughly `timeout`; running out of time is `DriverError::Timeout`.
    fn navigate(
        &mut self,
        target: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<PageTimings, DriverError>> + Send;

    /// Writes a visual snapshot of the current page state to `path`.
    fn capture_artifact(
        &mut self,
        path: &Path,
    ) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Releases the context. Never fails from the caller's point of view.
    fn close(self) -> impl Future<Output = ()> + Send;
}
