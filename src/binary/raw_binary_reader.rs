use chrono::{Datelike, Duration, NaiveDate, Timelike};

use crate::binary::constants::v1_0::length_codes;
use crate::binary::header::Header;
use crate::binary::int::DecodedInt;
use crate::binary::ion_type_code::IonTypeCode;
use crate::binary::uint::DecodedUInt;
use crate::binary::var_int::VarInt;
use crate::binary::var_uint::VarUInt;
use crate::data_source::IonDataSource;
use crate::raw_reader::{RawReader, RawStreamItem};
use crate::raw_symbol_token::RawSymbolToken;
use crate::result::{
    illegal_operation, illegal_operation_raw, invalid_encoding_error, invalid_encoding_error_raw,
    unsupported_version_error, IonError, IonResult,
};
use crate::types::decimal::Decimal;
use crate::types::integer::Int;
use crate::types::timestamp::{Precision, Timestamp};
use crate::types::IonType;

/// The location and shape of a value whose header has been read: where its descriptor byte
/// was found, how many bytes its VarUInt length occupied (if any), and how long its payload
/// is. The absolute end offset of the payload bounds every read inside the value.
#[derive(Debug, Clone)]
struct EncodedValue {
    ion_type: IonType,
    header: Header,
    is_null: bool,
    header_offset: usize,
    length_length: usize,
    value_length: usize,
}

impl EncodedValue {
    /// The absolute offset of the first byte of the payload.
    fn value_start(&self) -> usize {
        self.header_offset + 1 + self.length_length
    }

    /// The absolute offset of the first byte after the payload.
    fn value_end(&self) -> usize {
        self.value_start() + self.value_length
    }
}

/// A raw cursor over a binary Ion 1.0 stream.
///
/// The reader decodes one type descriptor at a time, tracking the absolute end offset of
/// each container it has stepped into. Values that the application does not read are
/// skipped wholesale using the lengths declared in their headers; the reader never
/// materializes data it was not asked for.
pub struct RawBinaryReader<R: IonDataSource> {
    data_source: R,
    // Scratch space for reads that span the data source's internal buffer
    scratch: Vec<u8>,
    // The (major, minor) version of the most recently read IVM
    ion_version: (u8, u8),
    // The number of bytes consumed from the data source so far; equivalently, the absolute
    // offset of the next unread byte
    bytes_read: usize,
    parents: Vec<EncodedValue>,
    is_in_struct: bool,
    value: Option<EncodedValue>,
    current_item: RawStreamItem,
    field_name_token: Option<RawSymbolToken>,
    annotation_tokens: Vec<RawSymbolToken>,
    // Fatal errors are sticky; once set, every operation returns this error
    fatal_error: Option<IonError>,
}

impl<R: IonDataSource> RawBinaryReader<R> {
    pub fn new(data_source: R) -> RawBinaryReader<R> {
        RawBinaryReader {
            data_source,
            scratch: Vec::new(),
            ion_version: (1, 0),
            bytes_read: 0,
            parents: Vec::new(),
            is_in_struct: false,
            value: None,
            current_item: RawStreamItem::Nothing,
            field_name_token: None,
            annotation_tokens: Vec::new(),
            fatal_error: None,
        }
    }

    /// The absolute offset of the next byte the reader will consume.
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    fn check_failed(&self) -> IonResult<()> {
        match &self.fatal_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn record_failure<T>(&mut self, result: IonResult<T>) -> IonResult<T> {
        if let Err(error) = &result {
            if error.is_fatal() {
                self.fatal_error = Some(error.clone());
            }
        }
        result
    }

    // === byte-accounting wrappers around the data source ===

    fn next_stream_byte(&mut self) -> IonResult<Option<u8>> {
        let byte = self.data_source.next_byte()?;
        if byte.is_some() {
            self.bytes_read += 1;
        }
        Ok(byte)
    }

    fn skip_stream_bytes(&mut self, number_of_bytes: usize) -> IonResult<()> {
        self.data_source.skip_bytes(number_of_bytes)?;
        self.bytes_read += number_of_bytes;
        Ok(())
    }

    fn read_var_uint(&mut self) -> IonResult<VarUInt> {
        let offset = self.bytes_read;
        let var_uint =
            VarUInt::read(&mut self.data_source).map_err(|e| e.with_default_offset(offset))?;
        self.bytes_read += var_uint.size_in_bytes();
        Ok(var_uint)
    }

    fn read_var_int(&mut self) -> IonResult<VarInt> {
        let offset = self.bytes_read;
        let var_int =
            VarInt::read(&mut self.data_source).map_err(|e| e.with_default_offset(offset))?;
        self.bytes_read += var_int.size_in_bytes();
        Ok(var_int)
    }

    fn read_uint(&mut self, length: usize) -> IonResult<DecodedUInt> {
        let offset = self.bytes_read;
        let uint = DecodedUInt::read(&mut self.data_source, length)
            .map_err(|e| e.with_default_offset(offset))?;
        self.bytes_read += uint.size_in_bytes();
        Ok(uint)
    }

    fn read_decoded_int(&mut self, length: usize) -> IonResult<DecodedInt> {
        let offset = self.bytes_read;
        let int = DecodedInt::read(&mut self.data_source, length)
            .map_err(|e| e.with_default_offset(offset))?;
        self.bytes_read += int.size_in_bytes();
        Ok(int)
    }

    fn read_payload_bytes(&mut self, length: usize) -> IonResult<Vec<u8>> {
        let RawBinaryReader {
            data_source,
            scratch,
            ..
        } = self;
        let bytes = data_source.read_slice(length, scratch, |bytes| Ok(bytes.to_vec()))?;
        self.bytes_read += length;
        Ok(bytes)
    }

    // === header parsing ===

    /// Interprets a header's length nibble, reading a trailing VarUInt length where the
    /// encoding calls for one. Returns (length of the length field, length of the payload).
    fn read_declared_length(
        &mut self,
        header: Header,
        header_offset: usize,
    ) -> IonResult<(usize, usize)> {
        use IonTypeCode::*;
        let length_code = header.length_code;
        let lengths = match header.ion_type_code {
            Boolean => match length_code {
                0 | 1 | length_codes::NULL => (0, 0),
                invalid => {
                    return invalid_encoding_error(
                        format!("bool descriptor with length code {invalid}"),
                        header_offset,
                    );
                }
            },
            Float => match length_code {
                0 | length_codes::NULL => (0, 0),
                4 => (0, 4),
                8 => (0, 8),
                invalid => {
                    return invalid_encoding_error(
                        format!("float descriptor with unsupported length {invalid}"),
                        header_offset,
                    );
                }
            },
            Struct if length_code == 1 => {
                // An ordered struct's length is always a VarUInt and must be non-zero
                let length = self.read_var_uint()?;
                if length.value() == 0 {
                    return invalid_encoding_error(
                        "ordered struct (length code 1) must contain at least one field",
                        header_offset,
                    );
                }
                (length.size_in_bytes(), length.value())
            }
            AnnotationOrIvm => match length_code {
                length_codes::NULL => {
                    return invalid_encoding_error(
                        "annotation wrappers cannot be null",
                        header_offset,
                    );
                }
                length_codes::VAR_UINT => {
                    let length = self.read_var_uint()?;
                    (length.size_in_bytes(), length.value())
                }
                n if n < 3 => {
                    return invalid_encoding_error(
                        "annotation wrappers must hold at least one annotation and one value",
                        header_offset,
                    );
                }
                n => (0, n as usize),
            },
            _ => match length_code {
                length_codes::NULL => (0, 0),
                length_codes::VAR_UINT => {
                    let length = self.read_var_uint()?;
                    (length.size_in_bytes(), length.value())
                }
                n => (0, n as usize),
            },
        };
        Ok(lengths)
    }

    fn encoded_value_for(&mut self, header: Header, header_offset: usize) -> IonResult<EncodedValue> {
        let (length_length, value_length) = self.read_declared_length(header, header_offset)?;
        let ion_type = header
            .ion_type_code
            .as_type()
            .map_err(|e| e.with_default_offset(header_offset))?;
        let value = EncodedValue {
            ion_type,
            header,
            is_null: header.is_null(),
            header_offset,
            length_length,
            value_length,
        };
        if let Some(parent) = self.parents.last() {
            if value.value_end() > parent.value_end() {
                return invalid_encoding_error(
                    format!(
                        "{} value runs past the end of its enclosing container",
                        value.ion_type
                    ),
                    header_offset,
                );
            }
        }
        Ok(value)
    }

    fn read_ivm(&mut self, marker_offset: usize) -> IonResult<RawStreamItem> {
        let mut remainder = [0u8; 3];
        for slot in remainder.iter_mut() {
            *slot = match self.next_stream_byte()? {
                Some(byte) => byte,
                None => {
                    return invalid_encoding_error(
                        "the stream ended in the middle of an Ion version marker",
                        marker_offset,
                    );
                }
            };
        }
        let [major, minor, terminator] = remainder;
        if terminator != 0xEA {
            return invalid_encoding_error(
                "found a version marker with an invalid terminating byte",
                marker_offset,
            );
        }
        if (major, minor) != (1, 0) {
            return unsupported_version_error(major, minor, marker_offset);
        }
        self.ion_version = (major, minor);
        let item = RawStreamItem::VersionMarker(major, minor);
        self.current_item = item;
        Ok(item)
    }

    fn next_impl(&mut self) -> IonResult<RawStreamItem> {
        // If the application didn't consume the previous value, skip whatever is left of it
        if let RawStreamItem::Value(_) | RawStreamItem::Null(_) = self.current_item {
            if let Some(value) = &self.value {
                let end = value.value_end();
                if self.bytes_read < end {
                    let remaining = end - self.bytes_read;
                    self.skip_stream_bytes(remaining)?;
                }
            }
        }
        self.current_item = RawStreamItem::Nothing;
        self.value = None;
        self.field_name_token = None;
        self.annotation_tokens.clear();

        // Set when an annotation wrapper has been unwrapped; the wrapped value's end offset
        // must land exactly here
        let mut pending_wrapper_end: Option<usize> = None;

        loop {
            // The end of the enclosing container means there is nothing further to read at
            // this depth
            if let Some(parent) = self.parents.last() {
                if self.bytes_read >= parent.value_end() {
                    return Ok(RawStreamItem::Nothing);
                }
            }

            // Inside a struct, a value (or NOP pad) is preceded by a field name SID. The
            // value inside an annotation wrapper is not; the field name came before the
            // wrapper itself.
            if self.is_in_struct
                && pending_wrapper_end.is_none()
                && self.field_name_token.is_none()
            {
                let field_sid = self.read_var_uint()?.value();
                self.field_name_token = Some(RawSymbolToken::SymbolId(field_sid));
            }

            let header_offset = self.bytes_read;
            let descriptor = match self.next_stream_byte()? {
                Some(byte) => byte,
                None => {
                    if self.parents.is_empty()
                        && self.field_name_token.is_none()
                        && self.annotation_tokens.is_empty()
                    {
                        // A clean end of the stream at the top level
                        return Ok(RawStreamItem::Nothing);
                    }
                    return invalid_encoding_error(
                        "the stream ended in the middle of a value",
                        header_offset,
                    );
                }
            };
            let header =
                Header::from_byte(descriptor).map_err(|e| e.with_default_offset(header_offset))?;

            use IonTypeCode::*;
            match header.ion_type_code {
                AnnotationOrIvm if header.length_code == 0 => {
                    if !self.parents.is_empty() {
                        return invalid_encoding_error(
                            "version markers are only legal at the top level",
                            header_offset,
                        );
                    }
                    if pending_wrapper_end.is_some() || !self.annotation_tokens.is_empty() {
                        return invalid_encoding_error(
                            "an annotation wrapper cannot wrap a version marker",
                            header_offset,
                        );
                    }
                    return self.read_ivm(header_offset);
                }
                AnnotationOrIvm => {
                    if pending_wrapper_end.is_some() || !self.annotation_tokens.is_empty() {
                        return invalid_encoding_error(
                            "an annotation wrapper cannot wrap another annotation wrapper",
                            header_offset,
                        );
                    }
                    let (length_length, wrapper_length) =
                        self.read_declared_length(header, header_offset)?;
                    let wrapper_end = header_offset + 1 + length_length + wrapper_length;
                    if let Some(parent) = self.parents.last() {
                        if wrapper_end > parent.value_end() {
                            return invalid_encoding_error(
                                "annotation wrapper runs past the end of its enclosing container",
                                header_offset,
                            );
                        }
                    }
                    let annotations_length = self.read_var_uint()?.value();
                    if annotations_length == 0 {
                        return invalid_encoding_error(
                            "annotation wrappers must declare at least one annotation",
                            header_offset,
                        );
                    }
                    let annotations_end = self.bytes_read + annotations_length;
                    if annotations_end >= wrapper_end {
                        return invalid_encoding_error(
                            "annotation wrapper leaves no room for a value",
                            header_offset,
                        );
                    }
                    while self.bytes_read < annotations_end {
                        let sid = self.read_var_uint()?.value();
                        self.annotation_tokens.push(RawSymbolToken::SymbolId(sid));
                    }
                    if self.bytes_read != annotations_end {
                        return invalid_encoding_error(
                            "annotation SID sequence overran its declared length",
                            header_offset,
                        );
                    }
                    pending_wrapper_end = Some(wrapper_end);
                    // Loop around to read the wrapped value's header
                }
                NullOrNop if header.is_nop() => {
                    if pending_wrapper_end.is_some() || !self.annotation_tokens.is_empty() {
                        return invalid_encoding_error(
                            "NOP padding cannot be annotated",
                            header_offset,
                        );
                    }
                    let (_, pad_length) = self.read_declared_length(header, header_offset)?;
                    if let Some(parent) = self.parents.last() {
                        if self.bytes_read + pad_length > parent.value_end() {
                            return invalid_encoding_error(
                                "NOP padding runs past the end of its enclosing container",
                                header_offset,
                            );
                        }
                    }
                    self.skip_stream_bytes(pad_length)?;
                    // A field name followed by a NOP is itself padding; discard the name
                    self.field_name_token = None;
                }
                Reserved => {
                    return invalid_encoding_error(
                        "found the reserved type code 15",
                        header_offset,
                    );
                }
                _ => {
                    let encoded = self.encoded_value_for(header, header_offset)?;
                    if let Some(expected_end) = pending_wrapper_end {
                        if encoded.value_end() != expected_end {
                            return invalid_encoding_error(
                                "annotation wrapper length does not match its wrapped value",
                                header_offset,
                            );
                        }
                    }
                    if header.ion_type_code == NegativeInteger && encoded.value_length == 0 {
                        return invalid_encoding_error(
                            "int zero must be encoded with the positive type code",
                            header_offset,
                        );
                    }
                    let item = RawStreamItem::nullable_value(encoded.ion_type, encoded.is_null);
                    self.value = Some(encoded);
                    self.current_item = item;
                    return Ok(item);
                }
            }
        }
    }

    /// Confirms that the reader is positioned on a non-null value of the expected type whose
    /// payload has not yet been consumed, and returns a copy of its encoding details.
    fn value_for_read(&self, ion_type: IonType, operation: &str) -> IonResult<EncodedValue> {
        match self.current_item {
            RawStreamItem::Value(t) if t == ion_type => {}
            other => {
                return illegal_operation(format!(
                    "{operation} called when the reader was positioned on {other}"
                ));
            }
        }
        let value = self
            .value
            .clone()
            .ok_or_else(|| illegal_operation_raw(format!("{operation} called with no current value")))?;
        if self.bytes_read != value.value_start() {
            return illegal_operation(format!(
                "{operation} called after the value was already consumed"
            ));
        }
        Ok(value)
    }

    fn read_int_impl(&mut self) -> IonResult<Int> {
        let value = self.value_for_read(IonType::Int, "read_int")?;
        let magnitude = self.read_uint(value.value_length)?;
        let is_negative = value.header.ion_type_code == IonTypeCode::NegativeInteger;
        if is_negative && magnitude.value().is_zero() {
            return invalid_encoding_error(
                "int zero must be encoded with the positive type code",
                value.header_offset,
            );
        }
        Ok(Int::from_sign_and_magnitude(
            is_negative,
            magnitude.value().clone(),
        ))
    }

    fn read_f64_impl(&mut self) -> IonResult<f64> {
        let value = self.value_for_read(IonType::Float, "read_f64")?;
        match value.value_length {
            0 => Ok(0f64),
            4 => {
                let bytes = self.read_payload_bytes(4)?;
                let array: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                    invalid_encoding_error_raw("float payload was truncated", value.header_offset)
                })?;
                Ok(f32::from_be_bytes(array) as f64)
            }
            8 => {
                let bytes = self.read_payload_bytes(8)?;
                let array: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    invalid_encoding_error_raw("float payload was truncated", value.header_offset)
                })?;
                Ok(f64::from_be_bytes(array))
            }
            // Unreachable; other lengths are rejected when the header is read
            invalid => invalid_encoding_error(
                format!("float with unsupported length {invalid}"),
                value.header_offset,
            ),
        }
    }

    /// Verifies that the fields read so far have not run past the value's declared end.
    fn check_payload_bound(&self, end: usize, header_offset: usize) -> IonResult<()> {
        if self.bytes_read > end {
            return invalid_encoding_error(
                "a field inside the value runs past the value's declared end",
                header_offset,
            );
        }
        Ok(())
    }

    fn read_decimal_impl(&mut self) -> IonResult<Decimal> {
        let value = self.value_for_read(IonType::Decimal, "read_decimal")?;
        if value.value_length == 0 {
            return Ok(Decimal::new(0, 0));
        }
        let exponent = self.read_var_int()?;
        self.check_payload_bound(value.value_end(), value.header_offset)?;
        let coefficient_length = value.value_end() - self.bytes_read;
        let coefficient = self.read_decoded_int(coefficient_length)?;
        if coefficient.is_negative_zero() {
            return Ok(Decimal::negative_zero_with_exponent(exponent.value()));
        }
        Ok(Decimal::new(coefficient.value().clone(), exponent.value()))
    }

    fn read_timestamp_impl(&mut self) -> IonResult<Timestamp> {
        let value = self.value_for_read(IonType::Timestamp, "read_timestamp")?;
        let end = value.value_end();
        let header_offset = value.header_offset;

        let offset_var_int = self.read_var_int()?;
        self.check_payload_bound(end, header_offset)?;
        let offset_is_known = !offset_var_int.is_negative_zero();
        let offset_minutes = offset_var_int.value();
        if offset_minutes.abs() > 1439 {
            return invalid_encoding_error(
                format!("timestamp offset {offset_minutes} is out of range"),
                header_offset,
            );
        }

        let mut year = self.read_var_uint()?.value() as u32;
        self.check_payload_bound(end, header_offset)?;
        let mut precision = Precision::Year;
        let (mut month, mut day, mut hour, mut minute, mut second) = (1u32, 1u32, 0u32, 0u32, 0u32);
        if self.bytes_read < end {
            month = self.read_var_uint()?.value() as u32;
            self.check_payload_bound(end, header_offset)?;
            precision = Precision::Month;
        }
        if self.bytes_read < end {
            day = self.read_var_uint()?.value() as u32;
            self.check_payload_bound(end, header_offset)?;
            precision = Precision::Day;
        }
        if self.bytes_read < end {
            hour = self.read_var_uint()?.value() as u32;
            self.check_payload_bound(end, header_offset)?;
            if self.bytes_read == end {
                return invalid_encoding_error(
                    "timestamps with an hour must also have a minute",
                    header_offset,
                );
            }
            minute = self.read_var_uint()?.value() as u32;
            self.check_payload_bound(end, header_offset)?;
            precision = Precision::HourAndMinute;
        }
        if self.bytes_read < end {
            second = self.read_var_uint()?.value() as u32;
            self.check_payload_bound(end, header_offset)?;
            precision = Precision::Second;
        }
        let mut fractional_seconds: Option<Decimal> = None;
        if self.bytes_read < end {
            let exponent = self.read_var_int()?;
            self.check_payload_bound(end, header_offset)?;
            let coefficient_length = end - self.bytes_read;
            let coefficient = self.read_decoded_int(coefficient_length)?;
            if coefficient.value().is_negative() {
                return invalid_encoding_error(
                    "timestamp fractional seconds cannot be negative",
                    header_offset,
                );
            }
            let is_empty_fraction = coefficient.value().is_zero() && exponent.value() >= 0;
            if !is_empty_fraction {
                fractional_seconds =
                    Some(Decimal::new(coefficient.value().clone(), exponent.value()));
            }
        }

        // The binary encoding's fields are in UTC; shift them into the offset's local time
        // to match the representation used everywhere else
        let offset_applies = offset_is_known && precision >= Precision::HourAndMinute;
        if offset_applies && offset_minutes != 0 {
            let date = NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(|| {
                invalid_encoding_error_raw("timestamp has invalid date fields", header_offset)
            })?;
            let utc = date.and_hms_opt(hour, minute, second).ok_or_else(|| {
                invalid_encoding_error_raw("timestamp has invalid time fields", header_offset)
            })?;
            let local = utc + Duration::minutes(offset_minutes);
            year = local.year() as u32;
            month = local.month();
            day = local.day();
            hour = local.hour();
            minute = local.minute();
            second = local.second();
        }

        let mut builder = Timestamp::with_year(year);
        if precision >= Precision::Month {
            builder = builder.with_month(month);
        }
        if precision >= Precision::Day {
            builder = builder.with_day(day);
        }
        if precision >= Precision::HourAndMinute {
            builder = builder.with_hour_and_minute(hour, minute);
        }
        if precision >= Precision::Second {
            builder = builder.with_second(second);
            if let Some(fraction) = fractional_seconds {
                builder = builder.with_fractional_seconds(fraction);
            }
        }
        let timestamp = if offset_applies {
            builder.build_at_offset(offset_minutes as i32)
        } else {
            builder.build_at_unknown_offset()
        };
        timestamp.map_err(|e| {
            invalid_encoding_error_raw(format!("timestamp failed validation: {e}"), header_offset)
        })
    }

    fn read_symbol_impl(&mut self) -> IonResult<RawSymbolToken> {
        let value = self.value_for_read(IonType::Symbol, "read_symbol")?;
        let magnitude = self.read_uint(value.value_length)?;
        let sid = magnitude
            .value()
            .as_u64()
            .and_then(|m| usize::try_from(m).ok())
            .ok_or_else(|| {
                invalid_encoding_error_raw(
                    "symbol ID is too large for this platform",
                    value.header_offset,
                )
            })?;
        Ok(RawSymbolToken::SymbolId(sid))
    }

    fn read_string_impl(&mut self) -> IonResult<String> {
        let value = self.value_for_read(IonType::String, "read_string")?;
        let bytes = self.read_payload_bytes(value.value_length)?;
        String::from_utf8(bytes).map_err(|_| {
            invalid_encoding_error_raw("string payload was not valid UTF-8", value.header_offset)
        })
    }
}

impl<R: IonDataSource> RawReader for RawBinaryReader<R> {
    fn ion_version(&self) -> (u8, u8) {
        self.ion_version
    }

    fn next(&mut self) -> IonResult<RawStreamItem> {
        self.check_failed()?;
        let result = self.next_impl();
        self.record_failure(result)
    }

    fn current(&self) -> RawStreamItem {
        self.current_item
    }

    fn ion_type(&self) -> Option<IonType> {
        match self.current_item {
            RawStreamItem::Value(ion_type) | RawStreamItem::Null(ion_type) => Some(ion_type),
            _ => None,
        }
    }

    fn is_null(&self) -> bool {
        matches!(self.current_item, RawStreamItem::Null(_))
    }

    fn annotations(&self) -> &[RawSymbolToken] {
        &self.annotation_tokens
    }

    fn field_name(&self) -> Option<&RawSymbolToken> {
        self.field_name_token.as_ref()
    }

    fn read_null(&mut self) -> IonResult<IonType> {
        match self.current_item {
            RawStreamItem::Null(ion_type) => Ok(ion_type),
            other => illegal_operation(format!(
                "read_null called when the reader was positioned on {other}"
            )),
        }
    }

    fn read_bool(&mut self) -> IonResult<bool> {
        let value = self.value_for_read(IonType::Bool, "read_bool")?;
        Ok(value.header.length_code == 1)
    }

    fn read_i64(&mut self) -> IonResult<i64> {
        self.read_int().and_then(|int| {
            int.as_i64().ok_or_else(|| {
                illegal_operation_raw(
                    "the current int does not fit in an i64; use read_int instead",
                )
            })
        })
    }

    fn read_int(&mut self) -> IonResult<Int> {
        self.check_failed()?;
        let result = self.read_int_impl();
        self.record_failure(result)
    }

    fn read_f32(&mut self) -> IonResult<f32> {
        self.read_f64().map(|f| f as f32)
    }

    fn read_f64(&mut self) -> IonResult<f64> {
        self.check_failed()?;
        let result = self.read_f64_impl();
        self.record_failure(result)
    }

    fn read_decimal(&mut self) -> IonResult<Decimal> {
        self.check_failed()?;
        let result = self.read_decimal_impl();
        self.record_failure(result)
    }

    fn read_string(&mut self) -> IonResult<String> {
        self.check_failed()?;
        let result = self.read_string_impl();
        self.record_failure(result)
    }

    fn read_symbol(&mut self) -> IonResult<RawSymbolToken> {
        self.check_failed()?;
        let result = self.read_symbol_impl();
        self.record_failure(result)
    }

    fn read_blob(&mut self) -> IonResult<Vec<u8>> {
        self.check_failed()?;
        let result = self
            .value_for_read(IonType::Blob, "read_blob")
            .and_then(|value| self.read_payload_bytes(value.value_length));
        self.record_failure(result)
    }

    fn read_clob(&mut self) -> IonResult<Vec<u8>> {
        self.check_failed()?;
        let result = self
            .value_for_read(IonType::Clob, "read_clob")
            .and_then(|value| self.read_payload_bytes(value.value_length));
        self.record_failure(result)
    }

    fn read_timestamp(&mut self) -> IonResult<Timestamp> {
        self.check_failed()?;
        let result = self.read_timestamp_impl();
        self.record_failure(result)
    }

    fn step_in(&mut self) -> IonResult<()> {
        self.check_failed()?;
        let value = match self.current_item {
            RawStreamItem::Value(ion_type) if ion_type.is_container() => self
                .value
                .clone()
                .ok_or_else(|| illegal_operation_raw("step_in called with no current value"))?,
            RawStreamItem::Null(ion_type) if ion_type.is_container() => {
                return illegal_operation("cannot step into a null container");
            }
            other => {
                return illegal_operation(format!(
                    "step_in is only valid on a container; the reader was positioned on {other}"
                ));
            }
        };
        self.is_in_struct = value.ion_type == IonType::Struct;
        self.parents.push(value);
        self.value = None;
        self.current_item = RawStreamItem::Nothing;
        self.field_name_token = None;
        self.annotation_tokens.clear();
        Ok(())
    }

    fn step_out(&mut self) -> IonResult<()> {
        self.check_failed()?;
        let parent = match self.parents.pop() {
            Some(parent) => parent,
            None => return illegal_operation("cannot step out when the reader is at the top level"),
        };
        let end = parent.value_end();
        if self.bytes_read < end {
            let remaining = end - self.bytes_read;
            let result = self.skip_stream_bytes(remaining);
            self.record_failure(result)?;
        }
        self.is_in_struct = self
            .parents
            .last()
            .map(|value| value.ion_type == IonType::Struct)
            .unwrap_or(false);
        self.value = None;
        self.current_item = RawStreamItem::Nothing;
        self.field_name_token = None;
        self.annotation_tokens.clear();
        Ok(())
    }

    fn parent_type(&self) -> Option<IonType> {
        self.parents.last().map(|value| value.ion_type)
    }

    fn depth(&self) -> usize {
        self.parents.len()
    }
}
