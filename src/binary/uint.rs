use std::io::Write;
use std::mem;

use num_bigint::BigUint;

use crate::data_source::IonDataSource;
use crate::result::{invalid_encoding_error, IonResult};
use crate::types::integer::UInt;

/// The largest UInt payload that can be accumulated in a u64 rather than a BigUint.
const MAX_UINT_SIZE_IN_BYTES: usize = mem::size_of::<u64>();

/// Represents a fixed-length unsigned integer. See the
/// [UInt and Int Fields](https://amazon-ion.github.io/ion-docs/docs/binary.html#uint-and-int-fields)
/// section of the binary Ion spec for more details.
#[derive(Debug)]
pub struct DecodedUInt {
    value: UInt,
    size_in_bytes: usize,
}

impl DecodedUInt {
    /// Reads a UInt with `length` bytes from the provided data source. Payloads of eight or
    /// fewer bytes are decoded into a `u64`; longer payloads fall back to a `BigUint`.
    pub fn read<R: IonDataSource>(data_source: &mut R, length: usize) -> IonResult<DecodedUInt> {
        if length > MAX_UINT_SIZE_IN_BYTES {
            let mut fallback_buffer = Vec::new();
            let magnitude = data_source.read_slice(length, &mut fallback_buffer, |bytes| {
                Ok(BigUint::from_bytes_be(bytes))
            })?;
            return Ok(DecodedUInt {
                value: UInt::from(magnitude),
                size_in_bytes: length,
            });
        }

        let mut magnitude: u64 = 0;
        for _ in 0..length {
            let byte = match data_source.next_byte()? {
                Some(byte) => byte,
                None => {
                    return invalid_encoding_error("the stream ended in the middle of a UInt", 0);
                }
            };
            magnitude = (magnitude << 8) | byte as u64;
        }
        Ok(DecodedUInt {
            value: UInt::U64(magnitude),
            size_in_bytes: length,
        })
    }

    /// Encodes `magnitude` in the smallest whole number of big-endian bytes and writes them
    /// to the sink, returning the number of bytes written. Zero occupies zero bytes; the
    /// descriptor's length nibble is how a reader knows the difference.
    pub fn write_u64<W: Write>(sink: &mut W, magnitude: u64) -> IonResult<usize> {
        let encoded = encode_u64(magnitude);
        sink.write_all(encoded.as_bytes())?;
        Ok(encoded.as_bytes().len())
    }

    pub fn value(&self) -> &UInt {
        &self.value
    }

    /// Returns the number of bytes that were read from the data source to construct this
    /// unsigned integer.
    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }
}

/// The buffer-backed result of [encode_u64]: a slice of up to eight big-endian bytes with
/// leading zero bytes trimmed away.
#[derive(Debug)]
pub struct EncodedUInt {
    buffer: [u8; MAX_UINT_SIZE_IN_BYTES],
    first_occupied_byte: usize,
}

impl EncodedUInt {
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[self.first_occupied_byte..]
    }
}

/// Encodes the given magnitude in the smallest whole number of bytes. Zero encodes to an
/// empty slice.
pub fn encode_u64(magnitude: u64) -> EncodedUInt {
    let buffer = magnitude.to_be_bytes();
    let first_occupied_byte = if magnitude == 0 {
        MAX_UINT_SIZE_IN_BYTES
    } else {
        magnitude.leading_zeros() as usize / 8
    };
    EncodedUInt {
        buffer,
        first_occupied_byte,
    }
}

/// The number of bytes [encode_u64] would produce for the given magnitude.
pub fn encoded_size_of(magnitude: u64) -> usize {
    if magnitude == 0 {
        return 0;
    }
    MAX_UINT_SIZE_IN_BYTES - magnitude.leading_zeros() as usize / 8
}

#[cfg(test)]
mod uint_tests {
    use super::*;
    use num_bigint::BigUint;
    use rstest::*;
    use std::io::Cursor;
    use std::str::FromStr;

    #[rstest]
    #[case(&[], 0)]
    #[case(&[0x00], 0)]
    #[case(&[0x01], 1)]
    #[case(&[0x01, 0x00], 256)]
    #[case(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF], u64::MAX)]
    fn read_u64_sized(#[case] bytes: &[u8], #[case] expected: u64) -> IonResult<()> {
        let decoded = DecodedUInt::read(&mut Cursor::new(bytes), bytes.len())?;
        assert_eq!(decoded.value().as_u64(), Some(expected));
        assert_eq!(decoded.size_in_bytes(), bytes.len());
        Ok(())
    }

    #[test]
    fn read_wider_than_u64() -> IonResult<()> {
        // 2^64: nine bytes
        let bytes = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let decoded = DecodedUInt::read(&mut Cursor::new(&bytes[..]), bytes.len())?;
        let expected = BigUint::from_str("18446744073709551616").unwrap();
        assert_eq!(decoded.value().as_big_uint(), expected);
        Ok(())
    }

    #[test]
    fn truncated_input_is_an_error() {
        assert!(DecodedUInt::read(&mut Cursor::new(&[0x01]), 2).is_err());
    }

    #[rstest]
    #[case(0, &[])]
    #[case(1, &[0x01])]
    #[case(255, &[0xFF])]
    #[case(256, &[0x01, 0x00])]
    #[case(u64::MAX, &[0xFF; 8])]
    fn write_is_minimal(#[case] magnitude: u64, #[case] expected: &[u8]) -> IonResult<()> {
        let mut buffer = Vec::new();
        let written = DecodedUInt::write_u64(&mut buffer, magnitude)?;
        assert_eq!(buffer.as_slice(), expected);
        assert_eq!(written, expected.len());
        assert_eq!(encoded_size_of(magnitude), expected.len());
        Ok(())
    }
}
