// Report files. Each writer emits its header even when there are no rows,
// so a run with zero probes still leaves valid files behind.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::models::{BucketRow, RunManifest, SummaryRow};

const SUMMARY_HEADER: [&str; 6] = ["url", "avg_ms", "p90_ms", "max_ms", "min_ms", "sample_count"];

const BUCKETED_HEADER: [&str; 9] = [
    "bucket_start_utc",
    "env",
    "run_id",
    "url",
    "p90_load_ms",
    "avg_load_ms",
    "p90_lcp_ms",
    "avg_lcp_ms",
    "sample_count",
];

pub fn write_summary(path: &Path, rows: &[SummaryRow]) -> anyhow::Result<()> {
    write_rows(path, &SUMMARY_HEADER, rows)
}

pub fn write_bucketed(path: &Path, rows: &[BucketRow]) -> anyhow::Result<()> {
    write_rows(path, &BUCKETED_HEADER, rows)
}

pub fn write_exposition(path: &Path, rendered: &str) -> anyhow::Result<()> {
    std::fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))
}

pub fn write_manifest(path: &Path, manifest: &RunManifest) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

/// Header is written by hand so it is present for empty reports too
/// (serde-driven headers only appear with the first row).
fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> anyhow::Result<()> {
    let mut w = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    w.write_record(header)?;
    for row in rows {
        w.serialize(row)?;
    }
    w.flush()?;
    Ok(())
}
