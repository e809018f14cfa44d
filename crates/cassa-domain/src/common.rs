//! Date helpers shared by projection buckets and aging.

use chrono::{Datelike, Duration, NaiveDate};

/// Number of days in one projection bucket.
pub const DAYS_PER_WEEK: i64 = 7;

/// Whole days from `from` to `to`; negative when `to` precedes `from`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Label used for a weekly bucket, e.g. `Sett 42 (13/10)`.
pub fn week_label(start: NaiveDate) -> String {
    format!("Sett {} ({})", start.iso_week().week(), start.format("%d/%m"))
}

/// Last day of the seven-day window that begins on `start`.
pub fn week_end(start: NaiveDate) -> NaiveDate {
    start + Duration::days(DAYS_PER_WEEK - 1)
}
