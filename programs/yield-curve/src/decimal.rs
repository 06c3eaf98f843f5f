//! Fixed-point decimal substrate.
//!
//! Every monetary quantity in the model is a [`Decimal`] (96-bit mantissa,
//! up to 28 fractional digits). Arithmetic that can overflow goes through the
//! `checked_*` family and surfaces as [`Error::MathOverflow`].

pub use rust_decimal::Decimal;

use crate::error::{Error, Result};

/// `a / b`, failing on division by zero or overflow.
pub fn ratio(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_div(b).ok_or(Error::MathOverflow)
}

/// Clamp a value to zero from below.
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// `|a - b| <= tolerance * max(|a|, |b|, 1)`.
///
/// Relative comparison for values that went through different rounding paths.
pub fn approx_eq(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    let scale = a.abs().max(b.abs()).max(Decimal::ONE);
    match a.checked_sub(b).and_then(|d| d.abs().checked_div(scale)) {
        Some(rel) => rel <= tolerance,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn ratio_rejects_zero_divisor() {
        assert!(matches!(ratio(dec!(1), Decimal::ZERO), Err(Error::MathOverflow)));
        assert_eq!(ratio(dec!(3), dec!(4)).unwrap(), dec!(0.75));
    }

    #[test]
    fn approx_eq_is_relative() {
        assert!(approx_eq(dec!(1000000), dec!(1000000.000001), dec!(0.000000000001)));
        assert!(!approx_eq(dec!(1), dec!(1.1), dec!(0.01)));
        assert_eq!(non_negative(dec!(-2)), Decimal::ZERO);
    }
}
