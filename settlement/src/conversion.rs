//! Fixed-point currency conversion
//!
//! All arithmetic is done in [`Decimal`] with explicit half-up rounding so
//! results are reproducible across platforms. Amounts are never negative
//! here, so rounding the midpoint away from zero is the same as half-up.

use crate::{Error, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Default fractional digits kept for intermediate conversions
pub const DEFAULT_CONVERSION_SCALE: u32 = 7;

/// Largest scale a [`Decimal`] can carry
pub const MAX_SCALE: u32 = 28;

const HALF_UP: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// Convert original-currency minor units into reporting-currency minor units
///
/// `amount / rate`, rounded half-up to `scale` fractional digits. The caller
/// guarantees `rate > 0`.
pub fn to_reporting(amount: u64, rate: Decimal, scale: u32) -> Result<Decimal> {
    Decimal::from(amount)
        .checked_div(rate)
        .map(|converted| converted.round_dp_with_strategy(scale, HALF_UP))
        .ok_or_else(|| Error::AmountOverflow(format!("{} / {}", amount, rate)))
}

/// Round a reporting-currency amount to whole minor units, half-up
pub fn round_minor_units(amount: Decimal) -> Result<u64> {
    let rounded = amount.round_dp_with_strategy(0, HALF_UP);
    rounded
        .to_u64()
        .ok_or_else(|| Error::AmountOverflow(rounded.to_string()))
}
