//! Rounding rules shared by the attendance builder and the payslip calculator.
//!
//! Money is rounded half-up (away from zero on an exact midpoint). Payable
//! days use their own ladder that only ever lands on whole or half days.

use rust_decimal::{Decimal, RoundingStrategy};

const HALF: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Round half-up to `dp` decimal places.
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Whole-rupee rounding used for monthly figures.
pub fn round0(value: Decimal) -> Decimal {
    round_half_up(value, 0)
}

/// Two-place rounding used for per-day figures.
pub fn round2(value: Decimal) -> Decimal {
    round_half_up(value, 2)
}

/// Payable-day ladder:
///
/// | tenths after one-place rounding | result            |
/// |---------------------------------|-------------------|
/// | .0                              | unchanged         |
/// | .1 - .4                         | up to .5          |
/// | .5                              | unchanged         |
/// | .6 - .9                         | up to next whole  |
///
/// Negative inputs are treated as zero.
pub fn round_payable_days(value: Decimal) -> Decimal {
    let value = round_half_up(value.max(Decimal::ZERO), 1);
    let whole = value.floor();
    let fraction = value - whole;

    if fraction.is_zero() || fraction == HALF {
        value.normalize()
    } else if fraction < HALF {
        whole + HALF
    } else {
        whole + Decimal::ONE
    }
}
