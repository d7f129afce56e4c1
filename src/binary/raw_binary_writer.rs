use std::io::Write;

use smallvec::SmallVec;

use crate::binary::constants::v1_0::{IVM, MAX_INLINE_LENGTH};
use crate::binary::decimal::DecimalBinaryEncoder;
use crate::binary::timestamp::TimestampBinaryEncoder;
use crate::binary::uint;
use crate::binary::var_uint::VarUInt;
use crate::raw_symbol_token_ref::{AsRawSymbolTokenRef, RawSymbolTokenRef};
use crate::result::{illegal_operation, IonError, IonResult};
use crate::types::decimal::Decimal;
use crate::types::integer::Int;
use crate::types::timestamp::Timestamp;
use crate::types::{IonType, SymbolId};
use crate::writer::IonWriter;

// Type codes with their length nibbles left blank
const NULL_TYPE_CODE: u8 = 0x00;
const BOOL_TYPE_CODE: u8 = 0x10;
const POSITIVE_INT_TYPE_CODE: u8 = 0x20;
const NEGATIVE_INT_TYPE_CODE: u8 = 0x30;
const FLOAT_TYPE_CODE: u8 = 0x40;
const SYMBOL_TYPE_CODE: u8 = 0x70;
const STRING_TYPE_CODE: u8 = 0x80;
const CLOB_TYPE_CODE: u8 = 0x90;
const BLOB_TYPE_CODE: u8 = 0xA0;
const LIST_TYPE_CODE: u8 = 0xB0;
const SEXP_TYPE_CODE: u8 = 0xC0;
const STRUCT_TYPE_CODE: u8 = 0xD0;
const ANNOTATION_TYPE_CODE: u8 = 0xE0;

const VAR_UINT_LENGTH_NIBBLE: u8 = 0x0E;
const NULL_LENGTH_NIBBLE: u8 = 0x0F;

/// One open container (or the top level): the bytes of its children so far, plus the field
/// name and annotations that were staged for the container itself when it was opened.
#[derive(Debug)]
struct EncodingLevel {
    container_type: IonType,
    field_id: Option<SymbolId>,
    annotations: SmallVec<[SymbolId; 2]>,
    buffer: Vec<u8>,
}

impl EncodingLevel {
    fn top_level() -> EncodingLevel {
        EncodingLevel {
            container_type: IonType::Null, // placeholder; the top level has no container type
            field_id: None,
            annotations: SmallVec::new(),
            buffer: Vec::new(),
        }
    }
}

/// A raw binary Ion writer.
///
/// The binary encoding prefixes every container with its length in bytes, which is unknown
/// until all of the container's children have been encoded. The writer therefore gives
/// every open container its own byte buffer; when the container is stepped out of, its
/// header is written to the parent level followed by the buffered child bytes. Buffers are
/// recycled through a small pool to avoid churning allocations.
///
/// At the raw level, all symbols (values, field names, and annotations) must be supplied
/// as symbol IDs; interning text is the job of the
/// [BinaryWriter](crate::binary::binary_writer::BinaryWriter) that wraps this type.
pub struct RawBinaryWriter<W: Write> {
    out: W,
    levels: Vec<EncodingLevel>,
    buffer_pool: Vec<Vec<u8>>,
    // The field name and annotations staged for the next value
    field_id: Option<RawSymbolTokenRefOwned>,
    annotations: SmallVec<[RawSymbolTokenRefOwned; 2]>,
    is_finished: bool,
    // IO failures are sticky; once one is recorded every operation returns it
    fatal_error: Option<IonError>,
}

// At this level, a symbol token is either a SID or text that will be rejected when it is
// used. Storing the text keeps the error message useful.
#[derive(Debug, Clone)]
enum RawSymbolTokenRefOwned {
    SymbolId(SymbolId),
    Text(String),
}

impl RawSymbolTokenRefOwned {
    fn from_token(token: RawSymbolTokenRef) -> RawSymbolTokenRefOwned {
        match token {
            RawSymbolTokenRef::SymbolId(sid) => RawSymbolTokenRefOwned::SymbolId(sid),
            RawSymbolTokenRef::Text(text) => RawSymbolTokenRefOwned::Text(text.to_string()),
        }
    }

    fn require_sid(&self, context: &str) -> IonResult<SymbolId> {
        match self {
            RawSymbolTokenRefOwned::SymbolId(sid) => Ok(*sid),
            RawSymbolTokenRefOwned::Text(text) => illegal_operation(format!(
                "the raw binary writer requires symbol IDs; {context} was given text '{text}'"
            )),
        }
    }
}

impl<W: Write> RawBinaryWriter<W> {
    pub fn new(out: W) -> RawBinaryWriter<W> {
        RawBinaryWriter {
            out,
            levels: vec![EncodingLevel::top_level()],
            buffer_pool: Vec::new(),
            field_id: None,
            annotations: SmallVec::new(),
            is_finished: false,
            fatal_error: None,
        }
    }

    fn check_failed(&self) -> IonResult<()> {
        match &self.fatal_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    /// Marks the writer as failed; every subsequent operation will return this error.
    pub(crate) fn poison(&mut self, error: IonError) {
        self.fatal_error = Some(error);
    }

    fn take_buffer(&mut self) -> Vec<u8> {
        let mut buffer = self.buffer_pool.pop().unwrap_or_default();
        buffer.clear();
        buffer
    }

    fn recycle_buffer(&mut self, buffer: Vec<u8>) {
        self.buffer_pool.push(buffer);
    }

    fn in_struct(&self) -> bool {
        self.levels
            .last()
            .map(|level| level.container_type == IonType::Struct)
            .unwrap_or(false)
    }

    /// Validates the staged field name against the current container, returning the SID to
    /// write (if any) without consuming it on success. A field name staged outside a struct
    /// is discarded as its error is raised, leaving the writer usable afterward.
    fn validate_field_name(&mut self) -> IonResult<Option<SymbolId>> {
        match (self.in_struct(), &self.field_id) {
            (true, Some(token)) => Ok(Some(token.require_sid("a field name")?)),
            (true, None) => {
                illegal_operation("values inside a struct must have a field name")
            }
            (false, Some(_)) => {
                self.field_id = None;
                illegal_operation("field names are only legal inside a struct")
            }
            (false, None) => Ok(None),
        }
    }

    fn validate_annotations(&self) -> IonResult<SmallVec<[SymbolId; 2]>> {
        let mut sids = SmallVec::new();
        for annotation in &self.annotations {
            sids.push(annotation.require_sid("an annotation")?);
        }
        Ok(sids)
    }

    /// Appends a fully encoded value to the current level, preceded by the staged field
    /// name and wrapped in the staged annotations.
    fn commit_value(&mut self, encoded_value: &[u8]) -> IonResult<()> {
        self.check_failed()?;
        if self.is_finished {
            return illegal_operation("cannot write to a writer after calling finish()");
        }
        let field_id = self.validate_field_name()?;
        let annotation_sids = self.validate_annotations()?;
        self.field_id = None;
        self.annotations.clear();

        let level = self
            .levels
            .last_mut()
            .expect("the encoding level stack is never empty");
        if let Some(sid) = field_id {
            VarUInt::write_u64(&mut level.buffer, sid as u64)?;
        }
        if annotation_sids.is_empty() {
            level.buffer.extend_from_slice(encoded_value);
            return Ok(());
        }

        // The wrapper's layout: descriptor, [VarUInt total length], VarUInt annotations
        // length, annotation SIDs, value
        let mut annotations_length: usize = 0;
        for sid in &annotation_sids {
            annotations_length += VarUInt::encoded_size_of(*sid as u64);
        }
        let wrapped_length = VarUInt::encoded_size_of(annotations_length as u64)
            + annotations_length
            + encoded_value.len();
        if wrapped_length <= MAX_INLINE_LENGTH {
            level
                .buffer
                .push(ANNOTATION_TYPE_CODE | wrapped_length as u8);
        } else {
            level
                .buffer
                .push(ANNOTATION_TYPE_CODE | VAR_UINT_LENGTH_NIBBLE);
            VarUInt::write_u64(&mut level.buffer, wrapped_length as u64)?;
        }
        VarUInt::write_u64(&mut level.buffer, annotations_length as u64)?;
        for sid in &annotation_sids {
            VarUInt::write_u64(&mut level.buffer, *sid as u64)?;
        }
        level.buffer.extend_from_slice(encoded_value);
        Ok(())
    }

    /// Encodes a scalar into a scratch buffer and commits it to the current level.
    fn write_scalar<F>(&mut self, encode_fn: F) -> IonResult<()>
    where
        F: FnOnce(&mut Vec<u8>) -> IonResult<()>,
    {
        let mut scratch = self.take_buffer();
        let result = encode_fn(&mut scratch).and_then(|_| self.commit_value(&scratch));
        self.recycle_buffer(scratch);
        result
    }
}

/// Encodes a length-prefixed value (string, clob, blob, or int magnitude) into the buffer.
fn push_type_and_bytes(buffer: &mut Vec<u8>, type_code: u8, payload: &[u8]) -> IonResult<()> {
    if payload.len() <= MAX_INLINE_LENGTH {
        buffer.push(type_code | payload.len() as u8);
    } else {
        buffer.push(type_code | VAR_UINT_LENGTH_NIBBLE);
        VarUInt::write_u64(buffer, payload.len() as u64)?;
    }
    buffer.extend_from_slice(payload);
    Ok(())
}

impl<W: Write> IonWriter for RawBinaryWriter<W> {
    type Output = W;

    fn ion_version(&self) -> (u8, u8) {
        (1, 0)
    }

    fn write_ion_version_marker(&mut self, major: u8, minor: u8) -> IonResult<()> {
        if self.depth() > 0 {
            return illegal_operation("can only write an IVM at the top level");
        }
        if (major, minor) != (1, 0) {
            return illegal_operation(format!(
                "cannot write an IVM for unsupported Ion version {major}.{minor}"
            ));
        }
        if self.is_finished {
            return illegal_operation("cannot write to a writer after calling finish()");
        }
        let level = self
            .levels
            .last_mut()
            .expect("the encoding level stack is never empty");
        level.buffer.extend_from_slice(&IVM);
        Ok(())
    }

    fn supports_text_symbol_tokens(&self) -> bool {
        // Raw binary streams can only write symbols that have already been interned
        false
    }

    fn set_annotations<I, A>(&mut self, annotations: I)
    where
        A: AsRawSymbolTokenRef,
        I: IntoIterator<Item = A>,
    {
        self.annotations.clear();
        for annotation in annotations {
            self.annotations.push(RawSymbolTokenRefOwned::from_token(
                annotation.as_raw_symbol_token_ref(),
            ));
        }
    }

    fn write_null(&mut self, ion_type: IonType) -> IonResult<()> {
        let type_code: u8 = match ion_type {
            IonType::Null => NULL_TYPE_CODE,
            IonType::Bool => BOOL_TYPE_CODE,
            IonType::Int => POSITIVE_INT_TYPE_CODE,
            IonType::Float => FLOAT_TYPE_CODE,
            IonType::Decimal => 0x50,
            IonType::Timestamp => 0x60,
            IonType::Symbol => SYMBOL_TYPE_CODE,
            IonType::String => STRING_TYPE_CODE,
            IonType::Clob => CLOB_TYPE_CODE,
            IonType::Blob => BLOB_TYPE_CODE,
            IonType::List => LIST_TYPE_CODE,
            IonType::SExp => SEXP_TYPE_CODE,
            IonType::Struct => STRUCT_TYPE_CODE,
        };
        self.write_scalar(|buffer| {
            buffer.push(type_code | NULL_LENGTH_NIBBLE);
            Ok(())
        })
    }

    fn write_bool(&mut self, value: bool) -> IonResult<()> {
        self.write_scalar(|buffer| {
            buffer.push(BOOL_TYPE_CODE | value as u8);
            Ok(())
        })
    }

    fn write_i64(&mut self, value: i64) -> IonResult<()> {
        self.write_scalar(|buffer| {
            let magnitude = value.unsigned_abs();
            let encoded = uint::encode_u64(magnitude);
            let type_code = if value >= 0 {
                POSITIVE_INT_TYPE_CODE
            } else {
                NEGATIVE_INT_TYPE_CODE
            };
            // A u64 magnitude is at most 8 bytes, so its length always fits in the nibble
            buffer.push(type_code | encoded.as_bytes().len() as u8);
            buffer.extend_from_slice(encoded.as_bytes());
            Ok(())
        })
    }

    fn write_int(&mut self, value: &Int) -> IonResult<()> {
        if let Some(small) = value.as_i64() {
            return self.write_i64(small);
        }
        self.write_scalar(|buffer| {
            let (is_negative, magnitude_bytes) = value.magnitude_be_bytes();
            let type_code = if is_negative {
                NEGATIVE_INT_TYPE_CODE
            } else {
                POSITIVE_INT_TYPE_CODE
            };
            push_type_and_bytes(buffer, type_code, &magnitude_bytes)
        })
    }

    fn write_f32(&mut self, value: f32) -> IonResult<()> {
        self.write_scalar(|buffer| {
            if value == 0f32 && !value.is_sign_negative() {
                buffer.push(FLOAT_TYPE_CODE);
                return Ok(());
            }
            buffer.push(FLOAT_TYPE_CODE | 4);
            buffer.extend_from_slice(&value.to_be_bytes());
            Ok(())
        })
    }

    fn write_f64(&mut self, value: f64) -> IonResult<()> {
        self.write_scalar(|buffer| {
            if value == 0f64 && !value.is_sign_negative() {
                buffer.push(FLOAT_TYPE_CODE);
                return Ok(());
            }
            // Use the 4-byte encoding when it loses no information
            let as_f32 = value as f32;
            if as_f32 as f64 == value {
                buffer.push(FLOAT_TYPE_CODE | 4);
                buffer.extend_from_slice(&as_f32.to_be_bytes());
                return Ok(());
            }
            buffer.push(FLOAT_TYPE_CODE | 8);
            buffer.extend_from_slice(&value.to_be_bytes());
            Ok(())
        })
    }

    fn write_decimal(&mut self, value: &Decimal) -> IonResult<()> {
        self.write_scalar(|buffer| {
            buffer.encode_decimal_value(value)?;
            Ok(())
        })
    }

    fn write_timestamp(&mut self, value: &Timestamp) -> IonResult<()> {
        self.write_scalar(|buffer| {
            buffer.encode_timestamp_value(value)?;
            Ok(())
        })
    }

    fn write_symbol<A: AsRawSymbolTokenRef>(&mut self, value: A) -> IonResult<()> {
        let sid = match value.as_raw_symbol_token_ref() {
            RawSymbolTokenRef::SymbolId(sid) => sid,
            RawSymbolTokenRef::Text(text) => {
                return illegal_operation(format!(
                    "the raw binary writer cannot write text symbols (here: '{text}')"
                ));
            }
        };
        self.write_scalar(|buffer| {
            let encoded = uint::encode_u64(sid as u64);
            buffer.push(SYMBOL_TYPE_CODE | encoded.as_bytes().len() as u8);
            buffer.extend_from_slice(encoded.as_bytes());
            Ok(())
        })
    }

    fn write_string<A: AsRef<str>>(&mut self, value: A) -> IonResult<()> {
        let text = value.as_ref();
        self.write_scalar(|buffer| push_type_and_bytes(buffer, STRING_TYPE_CODE, text.as_bytes()))
    }

    fn write_clob<A: AsRef<[u8]>>(&mut self, value: A) -> IonResult<()> {
        let bytes = value.as_ref();
        self.write_scalar(|buffer| push_type_and_bytes(buffer, CLOB_TYPE_CODE, bytes))
    }

    fn write_blob<A: AsRef<[u8]>>(&mut self, value: A) -> IonResult<()> {
        let bytes = value.as_ref();
        self.write_scalar(|buffer| push_type_and_bytes(buffer, BLOB_TYPE_CODE, bytes))
    }

    fn step_in(&mut self, container_type: IonType) -> IonResult<()> {
        self.check_failed()?;
        if !container_type.is_container() {
            return illegal_operation(format!("cannot step into a(n) {container_type}"));
        }
        if self.is_finished {
            return illegal_operation("cannot write to a writer after calling finish()");
        }
        // Validate the staged field name and annotations now so errors don't surface at
        // step_out; nothing is consumed until validation succeeds
        let field_id = self.validate_field_name()?;
        let annotation_sids = self.validate_annotations()?;
        self.field_id = None;
        self.annotations.clear();
        // The staged field name and annotations belong to the container itself; they are
        // written when the container's length is known
        let buffer = self.take_buffer();
        self.levels.push(EncodingLevel {
            container_type,
            field_id,
            annotations: annotation_sids,
            buffer,
        });
        Ok(())
    }

    fn set_field_name<A: AsRawSymbolTokenRef>(&mut self, name: A) {
        self.field_id = Some(RawSymbolTokenRefOwned::from_token(
            name.as_raw_symbol_token_ref(),
        ));
    }

    fn parent_type(&self) -> Option<IonType> {
        match self.levels.last() {
            Some(level) if self.levels.len() > 1 => Some(level.container_type),
            _ => None,
        }
    }

    fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    fn step_out(&mut self) -> IonResult<()> {
        self.check_failed()?;
        if self.depth() == 0 {
            return illegal_operation("cannot step out when the writer is at the top level");
        }
        let level = self
            .levels
            .pop()
            .expect("the encoding level stack is never empty");
        let type_code = match level.container_type {
            IonType::List => LIST_TYPE_CODE,
            IonType::SExp => SEXP_TYPE_CODE,
            IonType::Struct => STRUCT_TYPE_CODE,
            other => unreachable!("the writer stepped into a non-container: {other}"),
        };

        let mut encoded = self.take_buffer();
        let result = push_type_and_bytes(&mut encoded, type_code, &level.buffer).and_then(|_| {
            // Re-stage the container's own field name and annotations, then commit it like
            // any other value
            self.field_id = level.field_id.map(RawSymbolTokenRefOwned::SymbolId);
            self.annotations = level
                .annotations
                .iter()
                .map(|sid| RawSymbolTokenRefOwned::SymbolId(*sid))
                .collect();
            self.commit_value(&encoded)
        });
        self.recycle_buffer(encoded);
        self.recycle_buffer(level.buffer);
        result
    }

    fn flush(&mut self) -> IonResult<()> {
        self.check_failed()?;
        if self.depth() > 0 {
            return illegal_operation("cannot flush while a container is still open");
        }
        let level = self
            .levels
            .last_mut()
            .expect("the encoding level stack is never empty");
        let result: IonResult<()> = self
            .out
            .write_all(&level.buffer)
            .and_then(|_| self.out.flush())
            .map_err(IonError::from);
        if let Err(error) = &result {
            self.fatal_error = Some(error.clone());
            return result;
        }
        level.buffer.clear();
        Ok(())
    }

    fn finish(&mut self) -> IonResult<()> {
        if self.depth() > 0 {
            return illegal_operation("cannot finish while a container is still open");
        }
        self.flush()?;
        self.is_finished = true;
        Ok(())
    }

    fn output(&self) -> &W {
        &self.out
    }

    fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }
}

#[cfg(test)]
mod raw_binary_writer_tests {
    use super::*;
    use crate::binary::raw_binary_reader::RawBinaryReader;
    use crate::raw_reader::{RawReader, RawStreamItem};
    use crate::raw_symbol_token::local_sid_token;
    use crate::types::IonType;
    use std::io;

    fn writer() -> RawBinaryWriter<Vec<u8>> {
        let mut writer = RawBinaryWriter::new(Vec::new());
        writer.write_ion_version_marker(1, 0).unwrap();
        writer
    }

    fn bytes_of(mut writer: RawBinaryWriter<Vec<u8>>) -> Vec<u8> {
        writer.finish().unwrap();
        writer.output().clone()
    }

    #[test]
    fn empty_stream_is_just_the_ivm() {
        assert_eq!(bytes_of(writer()), IVM.to_vec());
    }

    #[test]
    fn scalars_encode_in_shortest_form() -> IonResult<()> {
        let mut writer = writer();
        writer.write_i64(0)?;
        writer.write_i64(1)?;
        writer.write_i64(-1)?;
        writer.write_i64(256)?;
        writer.write_bool(true)?;
        writer.write_bool(false)?;
        writer.write_null(IonType::Null)?;
        writer.write_null(IonType::Int)?;
        let bytes = bytes_of(writer);
        assert_eq!(
            &bytes[4..],
            &[
                0x20, // 0
                0x21, 0x01, // 1
                0x31, 0x01, // -1
                0x22, 0x01, 0x00, // 256
                0x11, 0x10, // true, false
                0x0F, 0x2F, // null.null, null.int
            ]
        );
        Ok(())
    }

    #[test]
    fn floats_narrow_when_lossless() -> IonResult<()> {
        let mut writer = writer();
        writer.write_f64(0.0)?;
        writer.write_f64(2.5)?; // representable as f32
        writer.write_f64(0.1)?; // not representable as f32
        let bytes = bytes_of(writer);
        assert_eq!(bytes[4], 0x40);
        assert_eq!(bytes[5], 0x44);
        assert_eq!(bytes[10], 0x48);
        Ok(())
    }

    #[test]
    fn negative_zero_float_is_not_shortened() -> IonResult<()> {
        let mut writer = writer();
        writer.write_f64(-0.0)?;
        let bytes = bytes_of(writer);
        // -0.0 must not collapse to the zero-length positive 0e0
        assert_eq!(bytes[4], 0x44);
        Ok(())
    }

    #[test]
    fn symbols_are_uint_sids() -> IonResult<()> {
        let mut writer = writer();
        writer.write_symbol(4usize)?;
        writer.write_symbol(0usize)?;
        let bytes = bytes_of(writer);
        assert_eq!(&bytes[4..], &[0x71, 0x04, 0x70]);
        Ok(())
    }

    #[test]
    fn text_symbols_are_rejected() {
        let mut writer = writer();
        assert!(writer.write_symbol("foo").is_err());
        // The error is recoverable
        assert!(writer.write_symbol(4usize).is_ok());
    }

    #[test]
    fn containers_round_trip() -> IonResult<()> {
        let mut writer = writer();
        writer.step_in(IonType::List)?;
        writer.write_i64(1)?;
        writer.step_in(IonType::SExp)?;
        writer.write_i64(2)?;
        writer.step_out()?;
        writer.write_string("three")?;
        writer.step_out()?;
        let bytes = bytes_of(writer);

        let mut reader = RawBinaryReader::new(io::Cursor::new(bytes));
        assert_eq!(reader.next()?, RawStreamItem::VersionMarker(1, 0));
        assert_eq!(reader.next()?, RawStreamItem::Value(IonType::List));
        reader.step_in()?;
        reader.next()?;
        assert_eq!(reader.read_i64()?, 1);
        assert_eq!(reader.next()?, RawStreamItem::Value(IonType::SExp));
        reader.step_in()?;
        reader.next()?;
        assert_eq!(reader.read_i64()?, 2);
        reader.step_out()?;
        reader.next()?;
        assert_eq!(reader.read_string()?, "three");
        reader.step_out()?;
        assert_eq!(reader.next()?, RawStreamItem::Nothing);
        Ok(())
    }

    #[test]
    fn structs_require_field_names() -> IonResult<()> {
        let mut writer = writer();
        writer.step_in(IonType::Struct)?;
        // No staged field name
        assert!(writer.write_i64(1).is_err());
        // Recoverable: stage one and continue
        writer.set_field_name(10usize);
        writer.write_i64(1)?;
        writer.step_out()?;
        let bytes = bytes_of(writer);

        let mut reader = RawBinaryReader::new(io::Cursor::new(bytes));
        reader.next()?;
        reader.next()?;
        reader.step_in()?;
        reader.next()?;
        assert_eq!(reader.field_name(), Some(&local_sid_token(10)));
        assert_eq!(reader.read_i64()?, 1);
        Ok(())
    }

    #[test]
    fn field_names_outside_structs_are_rejected() {
        let mut writer = writer();
        writer.set_field_name(10usize);
        assert!(writer.write_i64(1).is_err());
    }

    #[test]
    fn annotations_wrap_values() -> IonResult<()> {
        let mut writer = writer();
        writer.set_annotations([4usize, 5usize]);
        writer.write_i64(7)?;
        let bytes = bytes_of(writer);
        assert_eq!(&bytes[4..], &[0xE5, 0x82, 0x84, 0x85, 0x21, 0x07]);
        Ok(())
    }

    #[test]
    fn annotated_containers_round_trip() -> IonResult<()> {
        let mut writer = writer();
        writer.set_annotations([10usize]);
        writer.step_in(IonType::Struct)?;
        writer.set_field_name(11usize);
        writer.set_annotations([12usize]);
        writer.write_i64(5)?;
        writer.step_out()?;
        let bytes = bytes_of(writer);

        let mut reader = RawBinaryReader::new(io::Cursor::new(bytes));
        reader.next()?;
        assert_eq!(reader.next()?, RawStreamItem::Value(IonType::Struct));
        assert_eq!(reader.annotations(), &[local_sid_token(10)]);
        reader.step_in()?;
        reader.next()?;
        assert_eq!(reader.field_name(), Some(&local_sid_token(11)));
        assert_eq!(reader.annotations(), &[local_sid_token(12)]);
        assert_eq!(reader.read_i64()?, 5);
        Ok(())
    }

    #[test]
    fn finish_with_open_container_is_rejected() {
        let mut writer = writer();
        writer.step_in(IonType::Struct).unwrap();
        assert!(writer.finish().is_err());
        assert!(writer.flush().is_err());
        // Recoverable: close the container and finish
        writer.step_out().unwrap();
        assert!(writer.finish().is_ok());
    }

    #[test]
    fn writes_after_finish_are_rejected() {
        let mut writer = writer();
        writer.finish().unwrap();
        assert!(writer.write_i64(1).is_err());
        assert!(writer.step_in(IonType::List).is_err());
    }

    #[test]
    fn long_values_use_varuint_lengths() -> IonResult<()> {
        let mut writer = writer();
        let text = "a".repeat(20);
        writer.write_string(&text)?;
        let bytes = bytes_of(writer);
        assert_eq!(bytes[4], 0x8E);
        assert_eq!(bytes[5], 0x80 | 20);
        assert_eq!(&bytes[6..], text.as_bytes());
        Ok(())
    }

    #[test]
    fn big_ints_encode_sign_and_magnitude() -> IonResult<()> {
        use num_bigint::BigInt;
        let mut writer = writer();
        let value = Int::from(BigInt::from(u64::MAX) + 1); // 2^64
        writer.write_int(&value)?;
        let bytes = bytes_of(writer);
        assert_eq!(
            &bytes[4..],
            &[0x29, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
        Ok(())
    }
}
