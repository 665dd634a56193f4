// Report exporters: three read-only passes over the final aggregation store.
// Computed once, after the scheduler loop has ended.

mod writer;

use chrono::SecondsFormat;

use crate::aggregation::{AggregationStore, mean, percentile, whole_ms};
use crate::models::{BucketRow, ExpositionSample, SummaryRow};

pub use writer::{write_bucketed, write_exposition, write_manifest, write_summary};

/// Percentile reported in every view.
pub const REPORT_PERCENTILE: f64 = 90.0;

/// Exposition metric name.
pub const METRIC_NAME: &str = "web_page_load_p90_ms";

/// Per-target count, mean, p90, min and max of the whole-run durations.
/// Targets without a successful sample have no row.
pub fn summary(store: &AggregationStore) -> Vec<SummaryRow> {
    store
        .targets()
        .filter(|(_, samples)| !samples.is_empty())
        .map(|(target, samples)| SummaryRow {
            url: target.to_string(),
            avg_ms: whole_ms(mean(samples)),
            p90_ms: whole_ms(percentile(samples, REPORT_PERCENTILE)),
            max_ms: whole_ms(samples.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            min_ms: whole_ms(samples.iter().copied().fold(f64::INFINITY, f64::min)),
            sample_count: samples.len(),
        })
        .collect()
}

/// One row per (target, bucket), buckets ascending within each target.
/// Empty LCP series report -1 for both LCP columns.
pub fn bucketed(store: &AggregationStore, environment: &str, run_id: &str) -> Vec<BucketRow> {
    store
        .buckets()
        .map(|(target, start, series)| BucketRow {
            bucket_start_utc: start.to_rfc3339_opts(SecondsFormat::Secs, true),
            env: environment.to_string(),
            run_id: run_id.to_string(),
            url: target.to_string(),
            p90_load_ms: whole_ms(percentile(&series.durations, REPORT_PERCENTILE)),
            avg_load_ms: whole_ms(mean(&series.durations)),
            p90_lcp_ms: whole_ms(percentile(&series.lcps, REPORT_PERCENTILE)),
            avg_lcp_ms: whole_ms(mean(&series.lcps)),
            sample_count: series.sample_count(),
        })
        .collect()
}

/// Whole-run p90 per target; independent of the bucketed view.
pub fn exposition(store: &AggregationStore) -> Vec<ExpositionSample> {
    store
        .targets()
        .filter(|(_, samples)| !samples.is_empty())
        .map(|(target, samples)| ExpositionSample {
            url: target.to_string(),
            p90_ms: whole_ms(percentile(samples, REPORT_PERCENTILE)),
        })
        .collect()
}

/// Renders exposition samples, one line per target:
/// `web_page_load_p90_ms{env="..",url="..",run_id=".."} <value>`
pub fn render_exposition(samples: &[ExpositionSample], environment: &str, run_id: &str) -> String {
    let mut out = String::new();
    for s in samples {
        out.push_str(&format!(
            "{}{{env=\"{}\",url=\"{}\",run_id=\"{}\"}} {}\n",
            METRIC_NAME,
            escape_label(environment),
            escape_label(&s.url),
            escape_label(run_id),
            s.p90_ms
        ));
    }
    out
}

/// Label value escaping of the text exposition format.
fn escape_label(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for c in v.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}
