// Interpolated percentile and mean over sample series.
// Both return EMPTY_SENTINEL for an empty series so reports can print -1.

/// Value reported for a statistic over an empty series.
pub const EMPTY_SENTINEL: f64 = -1.0;

/// Linear-interpolated percentile, `p` in [0, 100] (clamped).
///
/// Sorts a copy of `samples`, takes rank `k = (n - 1) * p / 100` and
/// interpolates between the elements at `floor(k)` and `ceil(k)`.
/// p = 0 and p = 100 hit an exact element (the min and the max).
///
/// ```
/// use synthmon::aggregation::percentile::percentile;
///
/// assert_eq!(percentile(&[10.0, 20.0, 30.0, 40.0], 50.0), 25.0);
/// assert_eq!(percentile(&[], 90.0), -1.0);
/// ```
pub fn percentile(samples: &[f64], p: f64) -> f64 {
    if samples.is_empty() {
        return EMPTY_SENTINEL;
    }
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (sorted.len() - 1) as f64 * (p / 100.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

/// Arithmetic mean; `EMPTY_SENTINEL` for an empty series.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return EMPTY_SENTINEL;
    }
    samples.iter().sum::<f64>() / (samples.len() as f64)
}

/// Truncates a statistic to whole milliseconds; the sentinel passes through.
pub fn whole_ms(v: f64) -> i64 {
    v.trunc() as i64
}
