// Fixed-width time windows for trend rows.

use chrono::{DateTime, TimeDelta, Timelike, Utc};

/// Floors `ts` to the start of its `width_minutes` window within the hour.
///
/// The minute is truncated to the nearest lower multiple of the width and
/// seconds/sub-seconds are zeroed; hour, day and month are untouched. A width
/// of 0 behaves like 1. Windows line up across hours when the width divides 60.
pub fn bucket_start(ts: DateTime<Utc>, width_minutes: u32) -> DateTime<Utc> {
    let width = width_minutes.max(1);
    let into_window = TimeDelta::minutes(i64::from(ts.minute() % width))
        + TimeDelta::seconds(i64::from(ts.second()))
        + TimeDelta::nanoseconds(i64::from(ts.nanosecond()));
    ts - into_window
}
