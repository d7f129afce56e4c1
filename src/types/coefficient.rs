use std::fmt;

use num_bigint::{BigInt, BigUint, Sign as BigSign};

use crate::types::integer::{Int, UInt};

/// The sign of a [Coefficient].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Negative,
    Positive,
}

/// A signed integer that can be used as the coefficient of a [Decimal](crate::Decimal) value.
///
/// Unlike [Int], a `Coefficient` can represent negative zero, which the decimal data model
/// treats as distinct from positive zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coefficient {
    sign: Sign,
    magnitude: UInt,
}

impl Coefficient {
    pub fn new<M: Into<UInt>>(sign: Sign, magnitude: M) -> Coefficient {
        Coefficient {
            sign,
            magnitude: magnitude.into(),
        }
    }

    /// Constructs the coefficient `-0`.
    pub fn negative_zero() -> Coefficient {
        Coefficient {
            sign: Sign::Negative,
            magnitude: UInt::U64(0),
        }
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    pub fn magnitude(&self) -> &UInt {
        &self.magnitude
    }

    pub fn is_negative_zero(&self) -> bool {
        self.sign == Sign::Negative && self.magnitude.is_zero()
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }

    /// Returns the number of decimal digits in the magnitude.
    pub fn number_of_decimal_digits(&self) -> u64 {
        self.magnitude.number_of_decimal_digits()
    }

    /// Converts this coefficient to an [Int], losing the distinction between `0` and `-0`.
    pub fn as_int(&self) -> Int {
        Int::from_sign_and_magnitude(self.sign == Sign::Negative, self.magnitude.clone())
    }
}

impl From<Int> for Coefficient {
    fn from(int: Int) -> Coefficient {
        let sign = if int.is_negative() {
            Sign::Negative
        } else {
            Sign::Positive
        };
        let magnitude = match int {
            Int::I64(i) => UInt::U64(i.unsigned_abs()),
            Int::U64(u) => UInt::U64(u),
            Int::BigInt(b) => UInt::from(b.magnitude().clone()),
        };
        Coefficient { sign, magnitude }
    }
}

impl From<i64> for Coefficient {
    fn from(value: i64) -> Coefficient {
        Coefficient::from(Int::from(value))
    }
}

impl From<i32> for Coefficient {
    fn from(value: i32) -> Coefficient {
        Coefficient::from(Int::from(value))
    }
}

impl From<u64> for Coefficient {
    fn from(value: u64) -> Coefficient {
        Coefficient::from(Int::from(value))
    }
}

impl From<BigInt> for Coefficient {
    fn from(value: BigInt) -> Coefficient {
        Coefficient::from(Int::from(value))
    }
}

impl From<Coefficient> for BigInt {
    fn from(coefficient: Coefficient) -> BigInt {
        let magnitude: BigUint = coefficient.magnitude.as_big_uint();
        let sign = match coefficient.sign {
            Sign::Negative => BigSign::Minus,
            Sign::Positive => BigSign::Plus,
        };
        if magnitude.bits() == 0 {
            BigInt::from(0)
        } else {
            BigInt::from_biguint(sign, magnitude)
        }
    }
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sign == Sign::Negative {
            write!(f, "-")?;
        }
        write!(f, "{}", self.magnitude)
    }
}
