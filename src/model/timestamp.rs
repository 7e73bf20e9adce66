//! UTC normalization and the database timestamp format

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Storage format: `YYYY-MM-DD HH:MM:SS.ffffff`, always UTC
pub const DB_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Normalize any timezone-aware timestamp to UTC.
pub fn to_utc<Tz: TimeZone>(ts: &DateTime<Tz>) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}

pub fn format_db(ts: &DateTime<Utc>) -> String {
    ts.format(DB_FORMAT).to_string()
}

/// Parse a stored timestamp back to UTC.
///
/// Accepts the fractional part with any precision (or none), since SQLite
/// round-trips TEXT untouched but other writers may differ.
pub fn parse_db(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")?;
    Ok(Utc.from_utc_datetime(&naive))
}
