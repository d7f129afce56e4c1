use std::fmt;

use crate::types::coefficient::{Coefficient, Sign};
use crate::types::integer::UInt;

/// An arbitrary-precision decimal: a signed coefficient multiplied by 10 raised to a signed
/// exponent.
///
/// Decimals preserve their scale: `1.20` and `1.2` denote the same quantity but are distinct
/// values in the data model, as are `0` and `-0`. Accordingly, equality and hashing compare
/// the coefficient (including its sign) and the exponent directly rather than the quantities
/// they denote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    pub(crate) coefficient: Coefficient,
    pub(crate) exponent: i64,
}

impl Decimal {
    pub fn new<C: Into<Coefficient>>(coefficient: C, exponent: i64) -> Decimal {
        Decimal {
            coefficient: coefficient.into(),
            exponent,
        }
    }

    /// Constructs `-0d<exponent>`, which cannot be expressed via [Decimal::new] because Rust's
    /// primitive integer types have no negative zero.
    pub fn negative_zero_with_exponent(exponent: i64) -> Decimal {
        Decimal {
            coefficient: Coefficient::negative_zero(),
            exponent,
        }
    }

    /// Constructs `-0d0`.
    pub fn negative_zero() -> Decimal {
        Decimal::negative_zero_with_exponent(0)
    }

    pub fn coefficient(&self) -> &Coefficient {
        &self.coefficient
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    /// The number of digits in the coefficient's magnitude.
    pub fn precision(&self) -> u64 {
        self.coefficient.number_of_decimal_digits()
    }
}

// Renders the decimal in text Ion notation, preserving its scale. Values whose fractional
// digits fit comfortably to the right of a decimal point use point notation; everything
// else uses the explicit `d` exponent.
impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coefficient.sign() == Sign::Negative {
            write!(f, "-")?;
        }
        let digits = match self.coefficient.magnitude() {
            UInt::U64(m) => m.to_string(),
            UInt::BigUInt(m) => m.to_str_radix(10),
        };
        let number_of_digits = digits.len() as i64;
        // The same threshold BigDecimal uses to decide between plain and exponent notation
        let use_plain_notation =
            self.exponent < 0 && (number_of_digits - 1) + self.exponent >= -7;
        match self.exponent {
            0 => write!(f, "{digits}."),
            exponent if !use_plain_notation => write!(f, "{digits}d{exponent}"),
            exponent if -exponent < number_of_digits => {
                let split_at = (number_of_digits + exponent) as usize;
                write!(f, "{}.{}", &digits[..split_at], &digits[split_at..])
            }
            exponent if -exponent == number_of_digits => write!(f, "0.{digits}"),
            exponent => {
                // More fractional places than digits; pad with leading zeros
                let zeros = "0".repeat((-exponent - number_of_digits) as usize);
                write!(f, "0.{zeros}{digits}")
            }
        }
    }
}

#[cfg(test)]
mod decimal_tests {
    use super::*;
    use num_bigint::BigUint;
    use rstest::*;
    use std::str::FromStr;

    #[test]
    fn scale_is_preserved_by_equality() {
        // 1.2 and 1.20 denote the same quantity but differ in scale
        assert_ne!(Decimal::new(12, -1), Decimal::new(120, -2));
        assert_eq!(Decimal::new(12, -1), Decimal::new(12, -1));
    }

    #[test]
    fn negative_zero_is_not_zero() {
        assert_ne!(Decimal::negative_zero(), Decimal::new(0, 0));
        assert_eq!(Decimal::negative_zero(), Decimal::negative_zero());
        assert_ne!(
            Decimal::negative_zero_with_exponent(-3),
            Decimal::negative_zero()
        );
    }

    #[test]
    fn extreme_exponents() {
        let max = Decimal::new(1, i32::MAX as i64);
        let min = Decimal::new(1, i32::MIN as i64 + 1);
        assert_eq!(max.exponent(), i32::MAX as i64);
        assert_ne!(max, min);
    }

    #[test]
    fn big_coefficients() {
        let coefficient = BigUint::from_str("123456789012345678901234567890").unwrap();
        let decimal = Decimal::new(
            Coefficient::new(Sign::Positive, UInt::from(coefficient)),
            -10,
        );
        assert_eq!(decimal.precision(), 30);
    }

    #[rstest]
    #[case(Decimal::new(0, 0), "0.")]
    #[case(Decimal::new(5, 0), "5.")]
    #[case(Decimal::negative_zero(), "-0.")]
    #[case(Decimal::new(25, -1), "2.5")]
    #[case(Decimal::new(25, -2), "0.25")]
    #[case(Decimal::new(25, -4), "0.0025")]
    #[case(Decimal::new(-25, -3), "-0.025")]
    #[case(Decimal::new(25, 2), "25d2")]
    #[case(Decimal::new(-25, 2), "-25d2")]
    #[case(Decimal::new(0, -3), "0.000")]
    fn display(#[case] decimal: Decimal, #[case] expected: &str) {
        assert_eq!(format!("{decimal}"), expected);
    }
}
