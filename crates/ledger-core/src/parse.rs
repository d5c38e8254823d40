//! Permissive coercion for importer rows.
//!
//! A single bad row must never abort a reconstruction, so numbers that are
//! missing or not finite become zero and dates that do not parse become
//! `None` ("unknown").

use chrono::NaiveDate;
use rust_decimal::prelude::*;

/// Date layouts seen in brokerage exports and warehouse extracts.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a ledger date, tolerating trailing time components
/// (`2024-03-01T00:00:00`, `2024-03-01 00:00:00 UTC`).
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    for candidate in [raw, raw.get(..10).unwrap_or(raw)] {
        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(candidate, fmt) {
                return Some(date);
            }
        }
    }

    None
}

/// Largest magnitude accepted as a quantity or cash amount. Anything bigger is
/// treated as malformed so running sums cannot overflow `Decimal`.
pub const MAX_LEDGER_MAGNITUDE: f64 = 1e15;

/// Coerce an optional float into a decimal, mapping null/NaN/inf and
/// out-of-range values to zero.
pub fn coerce_decimal(raw: Option<f64>) -> Decimal {
    raw.filter(|v| v.is_finite() && v.abs() <= MAX_LEDGER_MAGNITUDE)
        .and_then(Decimal::from_f64)
        .unwrap_or(Decimal::ZERO)
}

/// Round a money value to cents.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp(2)
}
