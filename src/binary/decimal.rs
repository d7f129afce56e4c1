use std::io::Write;

use crate::binary::constants::v1_0::MAX_INLINE_LENGTH;
use crate::binary::int::DecodedInt;
use crate::binary::var_int::VarInt;
use crate::binary::var_uint::VarUInt;
use crate::types::coefficient::{Coefficient, Sign};
use crate::types::decimal::Decimal;
use crate::types::integer::UInt;
use crate::result::IonResult;

const DECIMAL_TYPE_CODE: u8 = 0x50;

const SIGN_BITMASK: u8 = 0b1000_0000;

/// Provides support to write [Decimal] into [Ion binary](https://amazon-ion.github.io/ion-docs/docs/binary.html#5-decimal).
pub(crate) trait DecimalBinaryEncoder {
    /// Encodes the content of a [Decimal] as per the Ion binary encoding.
    /// Returns the length of the encoded bytes.
    ///
    /// This does not encode the type descriptor nor the associated length.
    fn encode_decimal(&mut self, decimal: &Decimal) -> IonResult<usize>;

    /// Encodes a [Decimal] as an Ion value with the type descriptor and length.
    /// Returns the length of the encoded bytes.
    fn encode_decimal_value(&mut self, decimal: &Decimal) -> IonResult<usize>;
}

impl<W: Write> DecimalBinaryEncoder for W {
    fn encode_decimal(&mut self, decimal: &Decimal) -> IonResult<usize> {
        // The 0d0 special case: a totally empty body
        if decimal.coefficient().is_zero()
            && decimal.coefficient().sign() == Sign::Positive
            && decimal.exponent() == 0
        {
            return Ok(0);
        }

        let mut bytes_written: usize = 0;
        bytes_written += VarInt::write_i64(self, decimal.exponent())?;
        bytes_written += encode_coefficient(self, decimal.coefficient())?;
        Ok(bytes_written)
    }

    fn encode_decimal_value(&mut self, decimal: &Decimal) -> IonResult<usize> {
        let mut encoded = Vec::new();
        encoded.encode_decimal(decimal)?;

        let mut bytes_written: usize = 1;
        if encoded.len() <= MAX_INLINE_LENGTH {
            self.write_all(&[DECIMAL_TYPE_CODE | encoded.len() as u8])?;
        } else {
            self.write_all(&[DECIMAL_TYPE_CODE | 0x0E])?;
            bytes_written += VarUInt::write_u64(self, encoded.len() as u64)?;
        }
        self.write_all(&encoded)?;
        Ok(bytes_written + encoded.len())
    }
}

/// Writes a coefficient as a fixed-length signed Int, preserving negative zero.
pub(crate) fn encode_coefficient<W: Write>(
    sink: &mut W,
    coefficient: &Coefficient,
) -> IonResult<usize> {
    if coefficient.is_negative_zero() {
        return DecodedInt::write_negative_zero(sink);
    }
    if coefficient.is_zero() {
        // Positive zero needs no bytes; the descriptor's length says it all
        return Ok(0);
    }
    let is_negative = coefficient.sign() == Sign::Negative;
    match coefficient.magnitude() {
        UInt::U64(magnitude) => {
            if let Ok(signed) = i64::try_from(*magnitude) {
                let signed = if is_negative { -signed } else { signed };
                return DecodedInt::write_i64(sink, signed);
            }
            // The magnitude doesn't fit in an i64; write the bytes directly
            let bytes = magnitude.to_be_bytes();
            let first_occupied = magnitude.leading_zeros() as usize / 8;
            write_sign_and_magnitude_bytes(sink, is_negative, &bytes[first_occupied..])
        }
        UInt::BigUInt(magnitude) => {
            let bytes = magnitude.to_bytes_be();
            write_sign_and_magnitude_bytes(sink, is_negative, &bytes)
        }
    }
}

fn write_sign_and_magnitude_bytes<W: Write>(
    sink: &mut W,
    is_negative: bool,
    magnitude_bytes: &[u8],
) -> IonResult<usize> {
    if magnitude_bytes[0] & SIGN_BITMASK != 0 {
        // The leading magnitude byte's high bit is occupied; the sign needs its own byte
        let sign_byte = if is_negative { SIGN_BITMASK } else { 0x00 };
        sink.write_all(&[sign_byte])?;
        sink.write_all(magnitude_bytes)?;
        return Ok(1 + magnitude_bytes.len());
    }
    let mut bytes = magnitude_bytes.to_vec();
    if is_negative {
        bytes[0] |= SIGN_BITMASK;
    }
    sink.write_all(&bytes)?;
    Ok(bytes.len())
}
