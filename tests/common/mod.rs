// Shared test helpers: a scripted page-load driver and result builders.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use synthmon::driver::{PageDriver, PageSession};
use synthmon::error::DriverError;
use synthmon::models::{PageTimings, ProbeResult, ProbeStatus};

/// What one scripted navigation does.
#[derive(Debug, Clone)]
pub enum Outcome {
    Load(PageTimings),
    Timeout,
    Fail(&'static str),
}

pub fn load(duration_ms: i64) -> Outcome {
    Outcome::Load(PageTimings {
        duration_ms,
        fcp_ms: Some(duration_ms as f64 / 2.0),
        lcp_ms: Some(duration_ms as f64),
        cls: Some(0.05),
    })
}

#[derive(Default)]
struct Shared {
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    visits: Mutex<Vec<String>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// In-memory driver: every navigation takes `nav_time` of tokio time and
/// returns the next scripted outcome for the target (or `fallback`).
pub struct ScriptedDriver {
    shared: Arc<Shared>,
    fallback: Outcome,
    nav_time: Duration,
    capture_ok: bool,
    fail_open: bool,
}

impl ScriptedDriver {
    pub fn new(fallback: Outcome) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            fallback,
            nav_time: Duration::from_secs(1),
            capture_ok: true,
            fail_open: false,
        }
    }

    pub fn nav_time(mut self, nav_time: Duration) -> Self {
        self.nav_time = nav_time;
        self
    }

    pub fn capture_fails(mut self) -> Self {
        self.capture_ok = false;
        self
    }

    pub fn open_fails(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn script(self, target: &str, outcomes: Vec<Outcome>) -> Self {
        self.shared
            .scripts
            .lock()
            .unwrap()
            .insert(target.to_string(), outcomes.into());
        self
    }

    pub fn visits(&self) -> Vec<String> {
        self.shared.visits.lock().unwrap().clone()
    }

    pub fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }
}

impl PageDriver for ScriptedDriver {
    type Session = ScriptedSession;

    async fn open_session(&self) -> Result<ScriptedSession, DriverError> {
        if self.fail_open {
            return Err(DriverError::Session("browser gone".into()));
        }
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedSession {
            shared: self.shared.clone(),
            fallback: self.fallback.clone(),
            nav_time: self.nav_time,
            capture_ok: self.capture_ok,
        })
    }
}

pub struct ScriptedSession {
    shared: Arc<Shared>,
    fallback: Outcome,
    nav_time: Duration,
    capture_ok: bool,
}

impl PageSession for ScriptedSession {
    async fn navigate(&mut self, target: &str, _timeout: Duration) -> Result<PageTimings, DriverError> {
        let now = self.shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.shared.visits.lock().unwrap().push(target.to_string());

        tokio::time::sleep(self.nav_time).await;

        let outcome = self
            .shared
            .scripts
            .lock()
            .unwrap()
            .get_mut(target)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.fallback.clone());
        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            Outcome::Load(timings) => Ok(timings),
            Outcome::Timeout => Err(DriverError::Timeout {
                elapsed_ms: self.nav_time.as_millis() as u64,
                detail: format!("{} did not load", target),
            }),
            Outcome::Fail(msg) => Err(DriverError::Navigation(msg.to_string())),
        }
    }

    async fn capture_artifact(&mut self, path: &Path) -> Result<(), DriverError> {
        if !self.capture_ok {
            return Err(DriverError::Capture("renderer crashed".into()));
        }
        std::fs::write(path, b"png").map_err(|e| DriverError::Capture(e.to_string()))
    }

    async fn close(self) {
        self.shared.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, h, m, s).unwrap()
}

pub fn ok_result(ts: DateTime<Utc>, target: &str, duration_ms: i64, lcp_ms: Option<f64>) -> ProbeResult {
    ProbeResult::success(
        ts,
        target,
        PageTimings {
            duration_ms,
            fcp_ms: None,
            lcp_ms,
            cls: None,
        },
    )
}

pub fn timeout_result(ts: DateTime<Utc>, target: &str) -> ProbeResult {
    ProbeResult::failed(ts, target, ProbeStatus::Timeout, "TIMEOUT", "timed out")
}

/// Reads a CSV file into its lines.
pub fn lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}
