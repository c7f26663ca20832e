//! Amount codec between decimal currency values and integer minor units.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Balances and ledger amounts are stored and summed as `i64` minor units
//! (cents). Only the request/response boundary sees `Decimal`.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Number of minor units in one major currency unit.
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Decimal places represented by one minor unit.
const MINOR_UNIT_SCALE: u32 = 2;

/// Converts a decimal amount into integer minor units.
///
/// Digits past the second decimal place are truncated toward zero, not
/// rounded: `10.999` becomes `1099`. Negative amounts clamp to `0` so a
/// negative value never reaches storage.
///
/// Returns `None` only when the amount does not fit in an `i64` of minor
/// units.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    if amount.is_sign_negative() {
        return Some(0);
    }

    amount
        .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))?
        .trunc()
        .to_i64()
}

/// Converts integer minor units back into a decimal amount with two places.
#[must_use]
pub fn from_minor_units(units: i64) -> Decimal {
    Decimal::new(units, MINOR_UNIT_SCALE)
}
