//! Money conversion utilities
//!
//! Amounts are `Decimal` in memory and `REAL` in the kitchen store. All
//! arithmetic happens on `Decimal`; conversion to `f64` only at the store
//! boundary.

use rust_decimal::prelude::*;

/// Rounding for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Round to currency precision
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert an amount for storage
pub fn to_storage(value: Decimal) -> f64 {
    round_money(value).to_f64().unwrap_or_default()
}

/// Convert a stored amount back, `None` for NaN/Infinity
pub fn from_storage(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value).map(round_money)
}

/// Format for display with two decimals
pub fn format_money(value: Decimal) -> String {
    format!("{:.2}", round_money(value))
}
