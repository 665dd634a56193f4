// Headless Chromium over the DevTools protocol (chromiumoxide).
// One browser per run, one fresh page per probe: paint/layout observers are
// created inside that page only, so nothing leaks between targets.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use futures_util::StreamExt;
use tracing::{debug, info, instrument, warn};

use super::{PageDriver, PageSession};
use crate::error::DriverError;
use crate::models::PageTimings;

/// Extra host-side allowance on top of the in-page metric timeout.
const EVAL_SLACK: Duration = Duration::from_secs(2);

/// chromiumoxide ends every frame navigation after 30 s regardless of the
/// caller's own timeout, so longer navigation bounds cannot be honoured.
pub const MAX_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

const FCP_SCRIPT: &str = r#"
(() => {
    const e = performance.getEntriesByName('first-contentful-paint')[0];
    return e ? e.startTime : -1;
})()
"#;

/// Placeholder `__TIMEOUT_MS__` is replaced with the metric timeout.
const LCP_SCRIPT: &str = r#"
new Promise(resolve => {
    const timer = setTimeout(() => resolve(-1), __TIMEOUT_MS__);
    try {
        new PerformanceObserver(list => {
            const entries = list.getEntries();
            const last = entries[entries.length - 1];
            clearTimeout(timer);
            resolve(last ? (last.renderTime || last.loadTime || last.startTime) : -1);
        }).observe({ type: 'largest-contentful-paint', buffered: true });
    } catch (e) {
        clearTimeout(timer);
        resolve(-1);
    }
})
"#;

const CLS_SCRIPT: &str = r#"
new Promise(resolve => {
    let value = 0;
    try {
        new PerformanceObserver(list => {
            for (const e of list.getEntries()) {
                if (!e.hadRecentInput) value += e.value;
            }
        }).observe({ type: 'layout-shift', buffered: true });
    } catch (e) {
        resolve(-1);
        return;
    }
    setTimeout(() => resolve(value), 100);
})
"#;

#[derive(Debug, Clone)]
pub struct ChromiumDriverConfig {
    pub headless: bool,
    /// Bound for `goto`; at most `MAX_NAVIGATION_TIMEOUT_MS`.
    pub navigation_timeout: Duration,
    /// Upper bound for each paint metric read after load.
    pub metric_timeout: Duration,
}

pub struct ChromiumDriver {
    browser: Browser,
    handler: tokio::task::JoinHandle<()>,
    metric_timeout: Duration,
}

impl ChromiumDriver {
    /// Launches the browser and spawns its CDP event loop.
    #[instrument(skip_all, fields(headless = config.headless))]
    pub async fn launch(config: ChromiumDriverConfig) -> anyhow::Result<Self> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(devtools_request_timeout(config.navigation_timeout));
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("launching chromium")?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        info!(
            navigation_timeout_ms = config.navigation_timeout.as_millis() as u64,
            max_navigation_timeout_ms = MAX_NAVIGATION_TIMEOUT_MS,
            "browser launched"
        );

        Ok(Self {
            browser,
            handler,
            metric_timeout: config.metric_timeout,
        })
    }

    /// Closes the browser process and stops the event loop.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
        debug!("browser shut down");
    }
}

/// Per-command DevTools deadline. Metric scripts run for up to the metric
/// timeout (never above the navigation timeout) plus host slack, so every
/// command gets that much room.
fn devtools_request_timeout(navigation_timeout: Duration) -> Duration {
    navigation_timeout + EVAL_SLACK
}

impl PageDriver for ChromiumDriver {
    type Session = ChromiumSession;

    async fn open_session(&self) -> Result<ChromiumSession, DriverError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Session(e.to_string()))?;
        Ok(ChromiumSession {
            page,
            metric_timeout: self.metric_timeout,
        })
    }
}

pub struct ChromiumSession {
    page: Page,
    metric_timeout: Duration,
}

impl ChromiumSession {
    /// Evaluates a numeric metric script; negative, non-finite or late values are `None`.
    async fn read_metric(&self, name: &str, script: &str) -> Option<f64> {
        let params = match EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
        {
            Ok(p) => p,
            Err(e) => {
                warn!(metric = name, error = %e, "metric script rejected");
                return None;
            }
        };

        let bound = self.metric_timeout + EVAL_SLACK;
        match tokio::time::timeout(bound, self.page.evaluate_expression(params)).await {
            Ok(Ok(result)) => result
                .into_value::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0),
            Ok(Err(e)) => {
                debug!(metric = name, error = %e, "metric unavailable");
                None
            }
            Err(_) => {
                debug!(metric = name, timeout_ms = bound.as_millis() as u64, "metric read timed out");
                None
            }
        }
    }
}

impl PageSession for ChromiumSession {
    async fn navigate(&mut self, target: &str, timeout: Duration) -> Result<PageTimings, DriverError> {
        let started = Instant::now();
        let outcome = tokio::time::timeout(timeout, self.page.goto(target)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Err(_) => {
                return Err(DriverError::Timeout {
                    elapsed_ms,
                    detail: format!("no load event from {} within {:?}", target, timeout),
                });
            }
            Ok(Err(CdpError::Timeout)) => {
                return Err(DriverError::Timeout {
                    elapsed_ms,
                    detail: "devtools request timed out".into(),
                });
            }
            Ok(Err(e)) => return Err(DriverError::Navigation(e.to_string())),
            Ok(Ok(_)) => {}
        }

        let lcp_script = LCP_SCRIPT.replace(
            "__TIMEOUT_MS__",
            &self.metric_timeout.as_millis().to_string(),
        );
        let fcp_ms = self.read_metric("fcp", FCP_SCRIPT).await;
        let lcp_ms = self.read_metric("lcp", &lcp_script).await;
        let cls = self.read_metric("cls", CLS_SCRIPT).await;

        Ok(PageTimings {
            duration_ms: elapsed_ms as i64,
            fcp_ms,
            lcp_ms,
            cls,
        })
    }

    async fn capture_artifact(&mut self, path: &Path) -> Result<(), DriverError> {
        let params = ScreenshotParams::builder().full_page(true).build();
        self.page
            .save_screenshot(params, path)
            .await
            .map(|_| ())
            .map_err(|e| DriverError::Capture(e.to_string()))
    }

    async fn close(self) {
        if let Err(e) = self.page.close().await {
            debug!(error = %e, "page close failed");
        }
    }
}
