// Aggregation store: per-target and per-(target, bucket) sample series.
// Append-only for one run; owned and mutated by the recorder task only.

pub mod bucket;
pub mod percentile;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::ProbeResult;

pub use bucket::bucket_start;
pub use percentile::{EMPTY_SENTINEL, mean, percentile, whole_ms};

/// Duration and LCP samples that fell into one bucket of one target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketSeries {
    pub durations: Vec<f64>,
    pub lcps: Vec<f64>,
}

impl BucketSeries {
    /// Rows count the larger of the two series, not their sum.
    pub fn sample_count(&self) -> usize {
        self.durations.len().max(self.lcps.len())
    }
}

/// Accumulated samples for one run.
///
/// Iteration is deterministic: targets in lexicographic order and, within a
/// target, buckets in ascending start order.
#[derive(Debug, Clone)]
pub struct AggregationStore {
    bucket_minutes: u32,
    durations: BTreeMap<String, Vec<f64>>,
    buckets: BTreeMap<String, BTreeMap<DateTime<Utc>, BucketSeries>>,
}

impl AggregationStore {
    pub fn new(bucket_minutes: u32) -> Self {
        Self {
            bucket_minutes,
            durations: BTreeMap::new(),
            buckets: BTreeMap::new(),
        }
    }

    pub fn bucket_minutes(&self) -> u32 {
        self.bucket_minutes
    }

    /// Folds one result into the series. Anything but SUCCESS is ignored.
    /// LCP is only kept when the driver reported a positive value.
    pub fn record(&mut self, result: &ProbeResult) {
        if !result.status.is_success() {
            return;
        }
        let duration = result.duration_ms as f64;
        self.durations
            .entry(result.target.clone())
            .or_default()
            .push(duration);

        let start = bucket_start(result.timestamp, self.bucket_minutes);
        let series = self
            .buckets
            .entry(result.target.clone())
            .or_default()
            .entry(start)
            .or_default();
        series.durations.push(duration);
        if result.lcp_ms > 0.0 {
            series.lcps.push(result.lcp_ms);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// Whole-run duration series per target.
    pub fn targets(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.durations
            .iter()
            .map(|(target, samples)| (target.as_str(), samples.as_slice()))
    }

    /// Bucketed series per target, ascending by bucket start.
    pub fn buckets(&self) -> impl Iterator<Item = (&str, DateTime<Utc>, &BucketSeries)> {
        self.buckets.iter().flat_map(|(target, by_start)| {
            by_start
                .iter()
                .map(move |(start, series)| (target.as_str(), *start, series))
        })
    }

    pub fn durations_for(&self, target: &str) -> Option<&[f64]> {
        self.durations.get(target).map(Vec::as_slice)
    }

    pub fn bucket_for(&self, target: &str, start: DateTime<Utc>) -> Option<&BucketSeries> {
        self.buckets.get(target).and_then(|b| b.get(&start))
    }
}
