use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::ToPrimitive;

/// A signed integer of arbitrary size.
///
/// Each value is stored in its narrowest canonical representation: `I64` whenever the value
/// fits in an `i64`, `U64` for magnitudes between `i64::MAX + 1` and `u64::MAX`, and `BigInt`
/// beyond either end of that range. The accessor methods offer the value at each width,
/// returning `None` rather than truncating when the value does not fit.
#[derive(Debug, Clone)]
pub enum Int {
    I64(i64),
    U64(u64),
    BigInt(BigInt),
}

impl Int {
    /// Returns the value as an `i32` if it fits without loss.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Int::I64(i) => i32::try_from(*i).ok(),
            Int::U64(_) | Int::BigInt(_) => None,
        }
    }

    /// Returns the value as an `i64` if it fits without loss.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Int::I64(i) => Some(*i),
            Int::U64(_) | Int::BigInt(_) => None,
        }
    }

    /// Returns the value as a `u64` if it is non-negative and fits without loss.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Int::I64(i) => u64::try_from(*i).ok(),
            Int::U64(u) => Some(*u),
            Int::BigInt(_) => None,
        }
    }

    /// Returns the value as a `BigInt`, widening if necessary.
    pub fn as_big_int(&self) -> BigInt {
        match self {
            Int::I64(i) => BigInt::from(*i),
            Int::U64(u) => BigInt::from(*u),
            Int::BigInt(i) => i.clone(),
        }
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Int::I64(i) => *i < 0,
            Int::U64(_) => false,
            Int::BigInt(i) => i.sign() == Sign::Minus,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Int::I64(i) => *i == 0,
            Int::U64(u) => *u == 0,
            Int::BigInt(i) => i.sign() == Sign::NoSign,
        }
    }

    /// Returns the magnitude of the value as big-endian bytes alongside its sign. Used by the
    /// binary encoder, which writes sign and magnitude separately.
    pub(crate) fn magnitude_be_bytes(&self) -> (bool, Vec<u8>) {
        match self {
            Int::I64(i) => (*i < 0, strip_leading_zeros(&i.unsigned_abs().to_be_bytes())),
            Int::U64(u) => (false, strip_leading_zeros(&u.to_be_bytes())),
            Int::BigInt(i) => {
                let (sign, bytes) = i.to_bytes_be();
                (sign == Sign::Minus, bytes)
            }
        }
    }

    /// Constructs an `Int` from a sign and a magnitude, normalizing to the canonical variant.
    pub(crate) fn from_sign_and_magnitude(is_negative: bool, magnitude: UInt) -> Int {
        match (is_negative, magnitude) {
            (false, UInt::U64(m)) => {
                if let Ok(i) = i64::try_from(m) {
                    Int::I64(i)
                } else {
                    Int::U64(m)
                }
            }
            (true, UInt::U64(m)) => {
                // i64::MIN's magnitude is one more than i64::MAX's
                if m <= (i64::MAX as u64) + 1 {
                    Int::I64((m as i64).wrapping_neg())
                } else {
                    Int::BigInt(BigInt::from(m).neg())
                }
            }
            (false, UInt::BigUInt(m)) => Int::from(BigInt::from(m)),
            (true, UInt::BigUInt(m)) => Int::from(BigInt::from(m).neg()),
        }
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let first_nonzero = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first_nonzero..].to_vec()
}

impl PartialEq for Int {
    fn eq(&self, other: &Self) -> bool {
        // Canonical representations make variant-wise comparison sufficient
        use Int::*;
        match (self, other) {
            (I64(a), I64(b)) => a == b,
            (U64(a), U64(b)) => a == b,
            (BigInt(a), BigInt(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Int {}

impl PartialOrd for Int {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Int {
    fn cmp(&self, other: &Self) -> Ordering {
        use Int::*;
        match (self, other) {
            (I64(a), I64(b)) => a.cmp(b),
            (U64(a), U64(b)) => a.cmp(b),
            (I64(_), U64(_)) => Ordering::Less,
            (U64(_), I64(_)) => Ordering::Greater,
            (BigInt(a), BigInt(b)) => a.cmp(b),
            (a, BigInt(b)) => a.as_big_int().cmp(b),
            (BigInt(a), b) => a.cmp(&b.as_big_int()),
        }
    }
}

impl From<i64> for Int {
    fn from(value: i64) -> Int {
        Int::I64(value)
    }
}

impl From<i32> for Int {
    fn from(value: i32) -> Int {
        Int::I64(value as i64)
    }
}

impl From<u64> for Int {
    fn from(value: u64) -> Int {
        match i64::try_from(value) {
            Ok(i) => Int::I64(i),
            Err(_) => Int::U64(value),
        }
    }
}

impl From<BigInt> for Int {
    fn from(value: BigInt) -> Int {
        if let Some(i) = value.to_i64() {
            return Int::I64(i);
        }
        if let Some(u) = value.to_u64() {
            return Int::U64(u);
        }
        Int::BigInt(value)
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Int::I64(i) => write!(f, "{i}"),
            Int::U64(u) => write!(f, "{u}"),
            Int::BigInt(i) => write!(f, "{i}"),
        }
    }
}

/// An unsigned integer of arbitrary size, used to represent the magnitudes of decimal
/// coefficients and symbol IDs in the binary encoding.
#[derive(Debug, Clone)]
pub enum UInt {
    U64(u64),
    BigUInt(BigUint),
}

impl UInt {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            UInt::U64(u) => Some(*u),
            UInt::BigUInt(b) => b.to_u64(),
        }
    }

    pub fn as_big_uint(&self) -> BigUint {
        match self {
            UInt::U64(u) => BigUint::from(*u),
            UInt::BigUInt(b) => b.clone(),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            UInt::U64(u) => *u == 0,
            UInt::BigUInt(b) => b.bits() == 0,
        }
    }

    /// The number of decimal digits in this magnitude. Zero is considered one digit long.
    pub fn number_of_decimal_digits(&self) -> u64 {
        match self {
            UInt::U64(u) => {
                let mut digits = 1;
                let mut remaining = *u;
                while remaining >= 10 {
                    remaining /= 10;
                    digits += 1;
                }
                digits
            }
            UInt::BigUInt(b) => {
                if b.bits() == 0 {
                    1
                } else {
                    b.to_str_radix(10).len() as u64
                }
            }
        }
    }
}

impl PartialEq for UInt {
    fn eq(&self, other: &Self) -> bool {
        use UInt::*;
        match (self, other) {
            (U64(a), U64(b)) => a == b,
            (BigUInt(a), BigUInt(b)) => a == b,
            (U64(a), BigUInt(b)) | (BigUInt(b), U64(a)) => BigUint::from(*a) == *b,
        }
    }
}

impl Eq for UInt {}

impl From<u64> for UInt {
    fn from(value: u64) -> UInt {
        UInt::U64(value)
    }
}

impl From<usize> for UInt {
    fn from(value: usize) -> UInt {
        UInt::U64(value as u64)
    }
}

impl From<BigUint> for UInt {
    fn from(value: BigUint) -> UInt {
        match value.to_u64() {
            Some(u) => UInt::U64(u),
            None => UInt::BigUInt(value),
        }
    }
}

impl fmt::Display for UInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UInt::U64(u) => write!(f, "{u}"),
            UInt::BigUInt(b) => write!(f, "{b}"),
        }
    }
}

#[cfg(test)]
mod integer_tests {
    use super::*;
    use num_bigint::BigInt;
    use rstest::*;
    use std::str::FromStr;

    #[test]
    fn canonical_variants() {
        assert_eq!(Int::from(i64::MAX as u64), Int::I64(i64::MAX));
        assert_eq!(Int::from(i64::MAX as u64 + 1), Int::U64(i64::MAX as u64 + 1));
        assert_eq!(Int::from(u64::MAX), Int::U64(u64::MAX));
        let beyond_u64 = BigInt::from(u64::MAX) + 1u32;
        assert_eq!(Int::from(beyond_u64.clone()), Int::BigInt(beyond_u64));
        assert_eq!(Int::from(BigInt::from(7)), Int::I64(7));
    }

    #[rstest]
    #[case(Int::I64(5), Some(5), Some(5), Some(5))]
    #[case(Int::I64(-5), Some(-5), Some(-5), None)]
    #[case(Int::I64(i64::MAX), None, Some(i64::MAX), Some(i64::MAX as u64))]
    #[case(Int::U64(u64::MAX), None, None, Some(u64::MAX))]
    fn narrowest_lossless_accessors(
        #[case] value: Int,
        #[case] as_i32: Option<i32>,
        #[case] as_i64: Option<i64>,
        #[case] as_u64: Option<u64>,
    ) {
        assert_eq!(value.as_i32(), as_i32);
        assert_eq!(value.as_i64(), as_i64);
        assert_eq!(value.as_u64(), as_u64);
    }

    #[test]
    fn as_big_int_always_succeeds() {
        let expected = BigInt::from_str("18446744073709551616").unwrap(); // 2^64
        assert_eq!(Int::from(expected.clone()).as_big_int(), expected);
        assert_eq!(Int::I64(-12).as_big_int(), BigInt::from(-12));
    }

    #[test]
    fn ordering_crosses_variants() {
        let mut values = vec![
            Int::U64(u64::MAX),
            Int::I64(-3),
            Int::from(BigInt::from(u64::MAX) + 2),
            Int::I64(100),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Int::I64(-3),
                Int::I64(100),
                Int::U64(u64::MAX),
                Int::from(BigInt::from(u64::MAX) + 2),
            ]
        );
    }

    #[rstest]
    #[case(UInt::U64(0), 1)]
    #[case(UInt::U64(9), 1)]
    #[case(UInt::U64(10), 2)]
    #[case(UInt::U64(9_999), 4)]
    #[case(UInt::from(BigUint::from_str("123456789012345678901234567890").unwrap()), 30)]
    fn decimal_digit_counts(#[case] magnitude: UInt, #[case] expected: u64) {
        assert_eq!(magnitude.number_of_decimal_digits(), expected);
    }

    #[test]
    fn magnitude_bytes_are_minimal() {
        assert_eq!(Int::I64(0).magnitude_be_bytes(), (false, vec![]));
        assert_eq!(Int::I64(1).magnitude_be_bytes(), (false, vec![1]));
        assert_eq!(Int::I64(-256).magnitude_be_bytes(), (true, vec![1, 0]));
        assert_eq!(
            Int::U64(u64::MAX).magnitude_be_bytes(),
            (false, vec![0xFF; 8])
        );
    }
}
