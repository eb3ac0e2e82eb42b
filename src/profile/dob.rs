//! Date-of-birth normalization and age computation.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Whole years between `dob` and `today`.
///
/// The year difference is decremented when today's month/day precedes the
/// birth month/day. Birth dates in the future yield 0.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

/// Parse a stored date of birth into a calendar date.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS`
/// timestamps and `DD/MM/YYYY`.
pub fn normalize_dob(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ndt.date());
    }
    NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok()
}

/// Canonical `YYYY-MM-DD` form used for form binding.
pub fn format_dob(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
