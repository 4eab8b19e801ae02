//! Common utility functions for the calculators.
//!
//! This module provides shared functionality used across multiple
//! calculators, including rounding and compounding.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// This follows standard financial rounding conventions where values at exactly
/// 0.005 are rounded up to 0.01 (away from zero).
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use jeanbrun_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a positive amount up to the next cent.
///
/// Used for loan installments so that the rounded payment never
/// under-repays the principal.
///
/// ```
/// use rust_decimal_macros::dec;
/// use jeanbrun_core::calculations::common::round_up_to_cent;
///
/// assert_eq!(round_up_to_cent(dec!(416.6666)), dec!(416.67));
/// assert_eq!(round_up_to_cent(dec!(416.661)), dec!(416.67));
/// assert_eq!(round_up_to_cent(dec!(500)), dec!(500));
/// ```
pub fn round_up_to_cent(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::AwayFromZero)
}

/// Returns the maximum of two decimal values.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use jeanbrun_core::calculations::common::max;
///
/// assert_eq!(max(dec!(100.00), dec!(200.00)), dec!(200.00));
/// assert_eq!(max(dec!(-100.00), dec!(-200.00)), dec!(-100.00));
/// ```
pub fn max(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a > b { a } else { b }
}

/// `(1 + rate)^periods` by repeated multiplication.
///
/// Periods are bounded by loan and holding durations (a few hundred at
/// most), so the loop stays cheap and exact to decimal precision.
pub fn compound(
    rate: Decimal,
    periods: u32,
) -> Decimal {
    let factor = Decimal::ONE + rate;
    let mut result = Decimal::ONE;
    for _ in 0..periods {
        result *= factor;
    }
    result
}

/// Divides `amount` by `divisor`, returning zero when the divisor is zero.
pub fn ratio_or_zero(
    amount: Decimal,
    divisor: Decimal,
) -> Decimal {
    if divisor.is_zero() {
        Decimal::ZERO
    } else {
        amount / divisor
    }
}
