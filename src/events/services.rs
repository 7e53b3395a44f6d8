use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime, Time, UtcOffset,
};

use crate::error::{AppError, AppResult};

/// Accepts RFC3339 or a bare `YYYY-MM-DD[ HH:MM[:SS]]`, the latter read as UTC.
pub fn parse_deadline(raw: &str) -> AppResult<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts.to_offset(UtcOffset::UTC));
    }
    if let Ok(date) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
        return Ok(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc());
    }
    if let Ok(ts) = PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(ts.assume_utc());
    }
    if let Ok(ts) = PrimitiveDateTime::parse(raw, format_description!("[year]-[month]-[day] [hour]:[minute]")) {
        return Ok(ts.assume_utc());
    }
    Err(AppError::invalid(
        "invalid deadline format, use RFC3339 or YYYY-MM-DD",
    ))
}
