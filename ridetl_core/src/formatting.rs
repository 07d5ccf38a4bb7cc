use std::io::Write;

use anyhow::Result;
use time::{format_description::well_known, OffsetDateTime, UtcOffset};

/// Formats a time as an RFC 3339 string in UTC, e.g. "2024-06-01T08:00:00Z".
pub fn format_utc_date(date: OffsetDateTime) -> Result<String> {
    let mut buf = Vec::with_capacity(32);
    write_utc_date(&mut buf, date)?;
    Ok(String::from_utf8(buf)?)
}

pub fn write_utc_date<W: Write>(w: &mut W, date: OffsetDateTime) -> Result<()> {
    date.to_offset(UtcOffset::UTC)
        .format_into(w, &well_known::Rfc3339)?;
    Ok(())
}

/// Formats a number of seconds as "H:MM:SS". Non-finite values give an
/// empty string.
pub fn format_seconds(seconds: f64) -> String {
    if !seconds.is_finite() {
        return String::new();
    }

    let total = seconds.round() as i64;
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    format!(
        "{sign}{}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
