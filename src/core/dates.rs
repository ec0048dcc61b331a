use chrono::NaiveDate;

use crate::core::PolyError;

/// Wire format for path-substituted dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns `PolyError::InvalidArgument` for anything else.
pub fn parse_date(s: &str) -> Result<NaiveDate, PolyError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| PolyError::invalid(format!("invalid date (expected YYYY-MM-DD): {s}")))
}

/// Renders a date in the wire format.
#[must_use]
pub fn format_date(d: NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

/// Rejects ranges whose end precedes their start.
///
/// # Errors
///
/// Returns `PolyError::InvalidArgument` when `to < from`.
pub fn check_range(from: NaiveDate, to: NaiveDate) -> Result<(), PolyError> {
    if to < from {
        return Err(PolyError::invalid(format!(
            "end date {to} is before start date {from}"
        )));
    }
    Ok(())
}
