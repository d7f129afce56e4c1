use std::io::Write;

use chrono::{Datelike, Timelike};

use crate::binary::constants::v1_0::MAX_INLINE_LENGTH;
use crate::binary::var_int::VarInt;
use crate::binary::var_uint::VarUInt;
use crate::result::IonResult;
use crate::types::coefficient::{Coefficient, Sign};
use crate::types::timestamp::{mantissa_coefficient_and_exponent, Precision, Timestamp};

const TIMESTAMP_TYPE_CODE: u8 = 0x60;

/// Provides support to write [Timestamp] into [Ion binary](https://amazon-ion.github.io/ion-docs/docs/binary.html#6-timestamp).
pub(crate) trait TimestampBinaryEncoder {
    /// Encodes the content of a [Timestamp] as per the Ion binary encoding.
    /// Returns the length of the encoded bytes.
    ///
    /// This does not encode the type descriptor nor the associated length.
    fn encode_timestamp(&mut self, timestamp: &Timestamp) -> IonResult<usize>;

    /// Encodes a [Timestamp] as an Ion value with the type descriptor and length.
    /// Returns the length of the encoded bytes.
    fn encode_timestamp_value(&mut self, timestamp: &Timestamp) -> IonResult<usize>;
}

impl<W: Write> TimestampBinaryEncoder for W {
    fn encode_timestamp(&mut self, timestamp: &Timestamp) -> IonResult<usize> {
        let mut bytes_written: usize = 0;

        // The offset comes first; -0 denotes an unknown offset
        match timestamp.offset_minutes() {
            Some(minutes) => bytes_written += VarInt::write_i64(self, minutes as i64)?,
            None => bytes_written += VarInt::write_negative_zero(self)?,
        }

        // The remaining fields are expressed in UTC
        let utc = timestamp.date_time_utc();
        bytes_written += VarUInt::write_u64(self, utc.year() as u64)?;
        let precision = timestamp.precision();
        if precision >= Precision::Month {
            bytes_written += VarUInt::write_u64(self, utc.month() as u64)?;
        }
        if precision >= Precision::Day {
            bytes_written += VarUInt::write_u64(self, utc.day() as u64)?;
        }
        if precision >= Precision::HourAndMinute {
            bytes_written += VarUInt::write_u64(self, utc.hour() as u64)?;
            bytes_written += VarUInt::write_u64(self, utc.minute() as u64)?;
        }
        if precision >= Precision::Second {
            bytes_written += VarUInt::write_u64(self, utc.second() as u64)?;
            if let Some(mantissa) = &timestamp.fractional_seconds {
                let (coefficient, exponent) =
                    mantissa_coefficient_and_exponent(mantissa, utc.nanosecond());
                bytes_written += VarInt::write_i64(self, exponent)?;
                bytes_written += crate::binary::decimal::encode_coefficient(
                    self,
                    &Coefficient::new(Sign::Positive, coefficient),
                )?;
            }
        }

        Ok(bytes_written)
    }

    fn encode_timestamp_value(&mut self, timestamp: &Timestamp) -> IonResult<usize> {
        let mut encoded = Vec::new();
        encoded.encode_timestamp(timestamp)?;

        let mut bytes_written: usize = 1;
        if encoded.len() <= MAX_INLINE_LENGTH {
            self.write_all(&[TIMESTAMP_TYPE_CODE | encoded.len() as u8])?;
        } else {
            self.write_all(&[TIMESTAMP_TYPE_CODE | 0x0E])?;
            bytes_written += VarUInt::write_u64(self, encoded.len() as u64)?;
        }
        self.write_all(&encoded)?;
        Ok(bytes_written + encoded.len())
    }
}

#[cfg(test)]
mod binary_timestamp_tests {
    use super::*;
    use crate::types::decimal::Decimal;
    use rstest::*;

    #[rstest]
    #[case(Timestamp::with_year(2021).build().unwrap(), &[0x63, 0xC0, 0x0F, 0xE5])]
    #[case(
        Timestamp::with_ymd(2021, 2, 8).build().unwrap(),
        &[0x65, 0xC0, 0x0F, 0xE5, 0x82, 0x88]
    )]
    #[case(
        Timestamp::with_ymd_hms(2021, 2, 8, 11, 30, 2).build_utc().unwrap(),
        &[0x68, 0x80, 0x0F, 0xE5, 0x82, 0x88, 0x8B, 0x9E, 0x82]
    )]
    fn encodings(#[case] timestamp: Timestamp, #[case] expected: &[u8]) -> IonResult<()> {
        let mut buffer = Vec::new();
        buffer.encode_timestamp_value(&timestamp)?;
        assert_eq!(buffer.as_slice(), expected);
        Ok(())
    }

    #[test]
    fn known_offsets_shift_to_utc() -> IonResult<()> {
        // 11:30 at -05:00 is 16:30 UTC
        let timestamp = Timestamp::with_ymd_hms(2021, 2, 8, 11, 30, 0).build_at_offset(-300)?;
        let mut buffer = Vec::new();
        buffer.encode_timestamp_value(&timestamp)?;
        assert_eq!(
            buffer.as_slice(),
            &[0x69, 0x42, 0xAC, 0x0F, 0xE5, 0x82, 0x88, 0x90, 0x9E, 0x80]
        );
        Ok(())
    }

    #[test]
    fn fractional_seconds_carry_scale() -> IonResult<()> {
        let timestamp = Timestamp::with_ymd_hms(2021, 2, 8, 11, 30, 2)
            .with_milliseconds(45)
            .build_utc()?;
        let mut buffer = Vec::new();
        buffer.encode_timestamp_value(&timestamp)?;
        // ... offset, y, m, d, h, m, s, exponent -3, coefficient 45
        assert_eq!(
            buffer.as_slice(),
            &[0x6A, 0x80, 0x0F, 0xE5, 0x82, 0x88, 0x8B, 0x9E, 0x82, 0xC3, 0x2D]
        );
        Ok(())
    }

    #[test]
    fn sub_nanosecond_fractions_round_trip_through_decimal() -> IonResult<()> {
        let timestamp = Timestamp::with_ymd_hms(2001, 1, 1, 0, 0, 0)
            .with_fractional_seconds(Decimal::new(999, -12))
            .build_utc()?;
        let mut buffer = Vec::new();
        buffer.encode_timestamp_value(&timestamp)?;
        // The tail is the VarInt exponent -12 followed by the Int coefficient 999
        let tail = &buffer[buffer.len() - 3..];
        assert_eq!(tail, &[0xCC, 0x03, 0xE7]);
        Ok(())
    }
}
