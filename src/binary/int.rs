use std::io::Write;
use std::mem;

use num_bigint::{BigInt, Sign};

use crate::data_source::IonDataSource;
use crate::result::{invalid_encoding_error, IonResult};
use crate::types::integer::Int;

const SIGN_BITMASK: u8 = 0b1000_0000;
const MAGNITUDE_BITMASK: u8 = 0b0111_1111;

/// An Int payload of up to eight bytes carries at most 63 magnitude bits (the first byte's
/// high bit is the sign), so it always fits in an i64.
const MAX_I64_SIZE_IN_BYTES: usize = mem::size_of::<i64>();

/// Represents a fixed-length signed integer: big-endian magnitude bytes whose leading bit
/// is the sign. See the
/// [UInt and Int Fields](https://amazon-ion.github.io/ion-docs/docs/binary.html#uint-and-int-fields)
/// section of the binary Ion spec for more details.
///
/// The encoding can express negative zero. It is a legal coefficient for decimals and for
/// the fractional seconds of timestamps, but not a legal integer value; the context decides,
/// so the decoded form carries an [DecodedInt::is_negative_zero] flag.
#[derive(Debug)]
pub struct DecodedInt {
    value: Int,
    is_negative_zero: bool,
    size_in_bytes: usize,
}

impl DecodedInt {
    /// Reads an Int with `length` bytes from the provided data source.
    pub fn read<R: IonDataSource>(data_source: &mut R, length: usize) -> IonResult<DecodedInt> {
        if length == 0 {
            return Ok(DecodedInt {
                value: Int::I64(0),
                is_negative_zero: false,
                size_in_bytes: 0,
            });
        }

        if length > MAX_I64_SIZE_IN_BYTES {
            let mut fallback_buffer = Vec::new();
            return data_source.read_slice(length, &mut fallback_buffer, |bytes| {
                let is_negative = bytes[0] & SIGN_BITMASK != 0;
                let mut magnitude_bytes = bytes.to_vec();
                magnitude_bytes[0] &= MAGNITUDE_BITMASK;
                let sign = if is_negative { Sign::Minus } else { Sign::Plus };
                let magnitude = BigInt::from_bytes_be(sign, &magnitude_bytes);
                let is_negative_zero = is_negative && magnitude.sign() == Sign::NoSign;
                Ok(DecodedInt {
                    value: Int::from(magnitude),
                    is_negative_zero,
                    size_in_bytes: length,
                })
            });
        }

        let first_byte = match data_source.next_byte()? {
            Some(byte) => byte,
            None => return invalid_encoding_error("the stream ended in the middle of an Int", 0),
        };
        let is_negative = first_byte & SIGN_BITMASK != 0;
        let mut magnitude = (first_byte & MAGNITUDE_BITMASK) as u64;
        for _ in 1..length {
            let byte = match data_source.next_byte()? {
                Some(byte) => byte,
                None => {
                    return invalid_encoding_error("the stream ended in the middle of an Int", 0);
                }
            };
            magnitude = (magnitude << 8) | byte as u64;
        }

        let value = if is_negative {
            Int::I64(-(magnitude as i64))
        } else {
            Int::I64(magnitude as i64)
        };
        Ok(DecodedInt {
            value,
            is_negative_zero: is_negative && magnitude == 0,
            size_in_bytes: length,
        })
    }

    /// Encodes `value` as a sign-and-magnitude Int in the smallest whole number of bytes
    /// and writes it to the sink, returning the number of bytes written. Zero occupies
    /// zero bytes.
    pub fn write_i64<W: Write>(sink: &mut W, value: i64) -> IonResult<usize> {
        let magnitude = value.unsigned_abs();
        if magnitude == 0 {
            return Ok(0);
        }
        let be_bytes = magnitude.to_be_bytes();
        let first_occupied = magnitude.leading_zeros() as usize / 8;
        if be_bytes[first_occupied] & SIGN_BITMASK != 0 {
            // The leading magnitude byte's high bit is taken; an extra byte carries the sign
            let sign_byte = if value < 0 { SIGN_BITMASK } else { 0x00 };
            sink.write_all(&[sign_byte])?;
            sink.write_all(&be_bytes[first_occupied..])?;
            return Ok(1 + be_bytes.len() - first_occupied);
        }
        let mut bytes = be_bytes;
        if value < 0 {
            bytes[first_occupied] |= SIGN_BITMASK;
        }
        sink.write_all(&bytes[first_occupied..])?;
        Ok(bytes.len() - first_occupied)
    }

    /// Encodes negative zero: a single byte holding only the sign bit.
    pub fn write_negative_zero<W: Write>(sink: &mut W) -> IonResult<usize> {
        sink.write_all(&[SIGN_BITMASK])?;
        Ok(1)
    }

    /// The number of bytes [DecodedInt::write_i64] would produce for the given value.
    pub fn encoded_size_of(value: i64) -> usize {
        let magnitude = value.unsigned_abs();
        if magnitude == 0 {
            return 0;
        }
        let magnitude_bytes = MAX_I64_SIZE_IN_BYTES - magnitude.leading_zeros() as usize / 8;
        let leading_byte = (magnitude >> ((magnitude_bytes - 1) * 8)) as u8;
        if leading_byte & SIGN_BITMASK != 0 {
            magnitude_bytes + 1
        } else {
            magnitude_bytes
        }
    }

    pub fn value(&self) -> &Int {
        &self.value
    }

    /// Whether the encoded payload was negative zero. [DecodedInt::value] reports it as
    /// zero; the caller decides whether the distinction is legal in its context.
    pub fn is_negative_zero(&self) -> bool {
        self.is_negative_zero
    }

    /// Returns the number of bytes that were read from the data source to construct this
    /// signed integer.
    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }
}

#[cfg(test)]
mod int_tests {
    use super::*;
    use num_bigint::BigInt;
    use rstest::*;
    use std::io::Cursor;
    use std::str::FromStr;

    fn read_int(bytes: &[u8]) -> IonResult<DecodedInt> {
        DecodedInt::read(&mut Cursor::new(bytes), bytes.len())
    }

    #[rstest]
    #[case(&[], 0)]
    #[case(&[0x00], 0)]
    #[case(&[0x01], 1)]
    #[case(&[0x81], -1)]
    #[case(&[0x7F, 0xFF], 32_767)]
    #[case(&[0xFF, 0xFF], -32_767)]
    #[case(&[0x00, 0xFF], 255)]
    fn read_valid_encodings(#[case] bytes: &[u8], #[case] expected: i64) -> IonResult<()> {
        let decoded = read_int(bytes)?;
        assert_eq!(decoded.value(), &Int::I64(expected));
        assert!(!decoded.is_negative_zero());
        Ok(())
    }

    #[test]
    fn negative_zero_is_flagged() -> IonResult<()> {
        let decoded = read_int(&[0x80])?;
        assert!(decoded.is_negative_zero());
        assert_eq!(decoded.value(), &Int::I64(0));
        Ok(())
    }

    #[test]
    fn read_wider_than_i64() -> IonResult<()> {
        // 2^64 as a positive Int: sign byte then eight magnitude bytes
        let bytes = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let decoded = read_int(&bytes)?;
        let expected = BigInt::from_str("18446744073709551616").unwrap();
        assert_eq!(decoded.value().as_big_int(), expected);

        let negative = [0x81, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let decoded = read_int(&negative)?;
        assert_eq!(decoded.value().as_big_int(), -expected);
        Ok(())
    }

    #[test]
    fn truncated_input_is_an_error() {
        assert!(DecodedInt::read(&mut Cursor::new(&[0x01]), 2).is_err());
    }

    #[rstest]
    #[case(0, &[])]
    #[case(1, &[0x01])]
    #[case(-1, &[0x81])]
    #[case(127, &[0x7F])]
    // 128's magnitude needs the whole first byte, so the sign gets its own
    #[case(128, &[0x00, 0x80])]
    #[case(-128, &[0x80, 0x80])]
    #[case(32_767, &[0x7F, 0xFF])]
    #[case(-32_767, &[0xFF, 0xFF])]
    fn write_is_minimal(#[case] value: i64, #[case] expected: &[u8]) -> IonResult<()> {
        let mut buffer = Vec::new();
        let written = DecodedInt::write_i64(&mut buffer, value)?;
        assert_eq!(buffer.as_slice(), expected);
        assert_eq!(written, expected.len());
        assert_eq!(DecodedInt::encoded_size_of(value), expected.len());
        Ok(())
    }

    #[rstest]
    #[case(i64::MAX)]
    #[case(i64::MIN + 1)]
    #[case(255)]
    #[case(-255)]
    #[case(256)]
    fn round_trips(#[case] value: i64) -> IonResult<()> {
        let mut buffer = Vec::new();
        DecodedInt::write_i64(&mut buffer, value)?;
        let decoded = read_int(&buffer)?;
        assert_eq!(decoded.value(), &Int::I64(value));
        Ok(())
    }

    #[test]
    fn negative_zero_writes_a_single_byte() -> IonResult<()> {
        let mut buffer = Vec::new();
        DecodedInt::write_negative_zero(&mut buffer)?;
        assert_eq!(buffer, vec![0x80]);
        assert!(read_int(&buffer)?.is_negative_zero());
        Ok(())
    }
}
