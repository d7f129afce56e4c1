use std::io::Write;

use crate::binary::constants::v1_0::IVM;
use crate::binary::raw_binary_writer::RawBinaryWriter;
use crate::constants::v1_0::system_symbol_ids;
use crate::raw_symbol_token_ref::{AsRawSymbolTokenRef, RawSymbolTokenRef};
use crate::result::{illegal_operation, IonResult};
use crate::symbol_table::SymbolTable;
use crate::types::decimal::Decimal;
use crate::types::integer::Int;
use crate::types::timestamp::Timestamp;
use crate::types::{IonType, SymbolId};
use crate::writer::IonWriter;

/// Configures and constructs new instances of [BinaryWriter].
pub struct BinaryWriterBuilder {}

impl BinaryWriterBuilder {
    pub fn new() -> BinaryWriterBuilder {
        BinaryWriterBuilder {}
    }

    pub fn build<W: Write>(self, sink: W) -> IonResult<BinaryWriter<W>> {
        let symbol_table = SymbolTable::new();
        let symbols_flushed = symbol_table.len();
        Ok(BinaryWriter {
            raw_writer: RawBinaryWriter::new(Vec::new()),
            output: sink,
            symbol_table,
            symbols_flushed,
            ivm_written: false,
        })
    }
}

impl Default for BinaryWriterBuilder {
    fn default() -> Self {
        BinaryWriterBuilder::new()
    }
}

/// An application-level binary Ion writer.
///
/// Symbol values, field names, and annotations may be provided as text; the writer interns
/// each distinct string in its local symbol table and encodes the corresponding symbol ID.
/// Value bytes accumulate in an in-memory raw writer. At every [flush](IonWriter::flush),
/// the writer emits the version marker (once), a local symbol table struct covering any
/// symbols added since the previous flush (in append form so earlier SID assignments remain
/// valid), and then the buffered values.
pub struct BinaryWriter<W: Write> {
    raw_writer: RawBinaryWriter<Vec<u8>>,
    output: W,
    symbol_table: SymbolTable,
    // The number of symbol table slots that emitted LSTs already cover
    symbols_flushed: usize,
    ivm_written: bool,
}

impl<W: Write> BinaryWriter<W> {
    /// The symbol table that the writer has accumulated so far.
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbol_table
    }

    fn intern_token(&mut self, token: RawSymbolTokenRef) -> IonResult<SymbolId> {
        match token {
            RawSymbolTokenRef::Text(text) => Ok(self.symbol_table.intern(text.to_string())),
            RawSymbolTokenRef::SymbolId(sid) => {
                if !self.symbol_table.sid_is_valid(sid) {
                    return illegal_operation(format!(
                        "symbol ID ${sid} is not defined by the writer's symbol table"
                    ));
                }
                Ok(sid)
            }
        }
    }

    /// Writes a local symbol table struct covering the symbols added since the last flush.
    /// The table imports `$ion_symbol_table`, which preserves every SID the stream has
    /// already used.
    fn write_symbol_table(&mut self) -> IonResult<()> {
        let mut lst_writer = RawBinaryWriter::new(Vec::new());
        lst_writer.set_annotations([system_symbol_ids::ION_SYMBOL_TABLE]);
        lst_writer.step_in(IonType::Struct)?;
        lst_writer.set_field_name(system_symbol_ids::IMPORTS);
        lst_writer.write_symbol(system_symbol_ids::ION_SYMBOL_TABLE)?;
        lst_writer.set_field_name(system_symbol_ids::SYMBOLS);
        lst_writer.step_in(IonType::List)?;
        for symbol in self.symbol_table.symbols_tail(self.symbols_flushed) {
            match symbol.text() {
                Some(text) => lst_writer.write_string(text)?,
                // Slots with undefined text still need to occupy a position
                None => lst_writer.write_null(IonType::Null)?,
            }
        }
        lst_writer.step_out()?;
        lst_writer.step_out()?;
        lst_writer.finish()?;
        self.output.write_all(lst_writer.output())?;
        self.symbols_flushed = self.symbol_table.len();
        Ok(())
    }

    fn flush_to_output(&mut self) -> IonResult<()> {
        if !self.ivm_written {
            self.output.write_all(&IVM)?;
            self.ivm_written = true;
        }
        if self.symbol_table.len() > self.symbols_flushed {
            self.write_symbol_table()?;
        }
        self.raw_writer.flush()?;
        self.output.write_all(self.raw_writer.output())?;
        self.raw_writer.output_mut().clear();
        self.output.flush()?;
        Ok(())
    }
}

impl<W: Write> IonWriter for BinaryWriter<W> {
    type Output = W;

    fn ion_version(&self) -> (u8, u8) {
        (1, 0)
    }

    fn write_ion_version_marker(&mut self, major: u8, minor: u8) -> IonResult<()> {
        if (major, minor) != (1, 0) {
            return illegal_operation(format!(
                "cannot write an IVM for unsupported Ion version {major}.{minor}"
            ));
        }
        if self.depth() > 0 {
            return illegal_operation("can only write an IVM at the top level");
        }
        // Everything buffered so far belongs to the old symbol context; deliver it before
        // the marker resets that context
        self.flush()?;
        self.output.write_all(&IVM)?;
        self.ivm_written = true;
        self.symbol_table.reset();
        self.symbols_flushed = self.symbol_table.len();
        Ok(())
    }

    fn supports_text_symbol_tokens(&self) -> bool {
        true
    }

    fn set_annotations<I, A>(&mut self, annotations: I)
    where
        A: AsRawSymbolTokenRef,
        I: IntoIterator<Item = A>,
    {
        let sids: Vec<SymbolId> = annotations
            .into_iter()
            .map(|annotation| match annotation.as_raw_symbol_token_ref() {
                RawSymbolTokenRef::Text(text) => self.symbol_table.intern(text.to_string()),
                RawSymbolTokenRef::SymbolId(sid) => sid,
            })
            .collect();
        self.raw_writer.set_annotations(sids);
    }

    fn write_null(&mut self, ion_type: IonType) -> IonResult<()> {
        self.raw_writer.write_null(ion_type)
    }

    fn write_bool(&mut self, value: bool) -> IonResult<()> {
        self.raw_writer.write_bool(value)
    }

    fn write_i64(&mut self, value: i64) -> IonResult<()> {
        self.raw_writer.write_i64(value)
    }

    fn write_int(&mut self, value: &Int) -> IonResult<()> {
        self.raw_writer.write_int(value)
    }

    fn write_f32(&mut self, value: f32) -> IonResult<()> {
        self.raw_writer.write_f32(value)
    }

    fn write_f64(&mut self, value: f64) -> IonResult<()> {
        self.raw_writer.write_f64(value)
    }

    fn write_decimal(&mut self, value: &Decimal) -> IonResult<()> {
        self.raw_writer.write_decimal(value)
    }

    fn write_timestamp(&mut self, value: &Timestamp) -> IonResult<()> {
        self.raw_writer.write_timestamp(value)
    }

    fn write_symbol<A: AsRawSymbolTokenRef>(&mut self, value: A) -> IonResult<()> {
        let sid = self.intern_token(value.as_raw_symbol_token_ref())?;
        self.raw_writer.write_symbol(sid)
    }

    fn write_string<A: AsRef<str>>(&mut self, value: A) -> IonResult<()> {
        self.raw_writer.write_string(value)
    }

    fn write_clob<A: AsRef<[u8]>>(&mut self, value: A) -> IonResult<()> {
        self.raw_writer.write_clob(value)
    }

    fn write_blob<A: AsRef<[u8]>>(&mut self, value: A) -> IonResult<()> {
        self.raw_writer.write_blob(value)
    }

    fn step_in(&mut self, container_type: IonType) -> IonResult<()> {
        self.raw_writer.step_in(container_type)
    }

    fn set_field_name<A: AsRawSymbolTokenRef>(&mut self, name: A) {
        let sid = match name.as_raw_symbol_token_ref() {
            RawSymbolTokenRef::Text(text) => self.symbol_table.intern(text.to_string()),
            RawSymbolTokenRef::SymbolId(sid) => sid,
        };
        self.raw_writer.set_field_name(sid);
    }

    fn parent_type(&self) -> Option<IonType> {
        self.raw_writer.parent_type()
    }

    fn depth(&self) -> usize {
        self.raw_writer.depth()
    }

    fn step_out(&mut self) -> IonResult<()> {
        self.raw_writer.step_out()
    }

    fn flush(&mut self) -> IonResult<()> {
        if self.depth() > 0 {
            return illegal_operation("cannot flush while a container is still open");
        }
        let result = self.flush_to_output();
        if let Err(error) = &result {
            if error.is_fatal() {
                // Poison the raw writer so subsequent writes return the stored error
                self.raw_writer.poison(error.clone());
            }
        }
        result
    }

    fn finish(&mut self) -> IonResult<()> {
        if self.depth() > 0 {
            return illegal_operation("cannot finish while a container is still open");
        }
        self.flush()?;
        // Poison the raw writer against further writes
        self.raw_writer.finish()?;
        Ok(())
    }

    fn output(&self) -> &W {
        &self.output
    }

    fn output_mut(&mut self) -> &mut W {
        &mut self.output
    }
}

#[cfg(test)]
mod binary_writer_tests {
    use super::*;
    use crate::reader::{ReaderBuilder, StreamItem};
    use crate::stream_reader::IonReader;

    fn written_by<F>(write_fn: F) -> Vec<u8>
    where
        F: FnOnce(&mut BinaryWriter<Vec<u8>>),
    {
        let mut writer = BinaryWriterBuilder::new().build(Vec::new()).unwrap();
        write_fn(&mut writer);
        writer.finish().unwrap();
        writer.output().clone()
    }

    #[test]
    fn output_begins_with_the_ivm() {
        let bytes = written_by(|writer| {
            writer.write_i64(5).unwrap();
        });
        assert_eq!(&bytes[0..4], &IVM);
    }

    #[test]
    fn text_symbols_are_interned_and_round_trip() -> IonResult<()> {
        let bytes = written_by(|writer| {
            writer.write_symbol("foo").unwrap();
            writer.write_symbol("bar").unwrap();
            writer.write_symbol("foo").unwrap();
        });

        let mut reader = ReaderBuilder::new().build(bytes)?;
        assert_eq!(reader.next()?, StreamItem::Value(IonType::Symbol));
        let foo = reader.read_symbol()?;
        assert_eq!(foo.text(), Some("foo"));
        // Local symbols begin after the system table
        assert_eq!(foo.local_sid(), Some(10));
        reader.next()?;
        assert_eq!(reader.read_symbol()?.text(), Some("bar"));
        reader.next()?;
        // The repeated symbol reuses its SID
        assert_eq!(reader.read_symbol()?.local_sid(), Some(10));
        assert_eq!(reader.next()?, StreamItem::Nothing);
        Ok(())
    }

    #[test]
    fn field_names_and_annotations_are_interned() -> IonResult<()> {
        let bytes = written_by(|writer| {
            writer.set_annotations(["a1"]);
            writer.step_in(IonType::Struct).unwrap();
            writer.set_field_name("f1");
            writer.write_i64(1).unwrap();
            writer.set_field_name("f1");
            writer.write_i64(2).unwrap();
            writer.step_out().unwrap();
        });

        let mut reader = ReaderBuilder::new().build(bytes)?;
        assert_eq!(reader.next()?, StreamItem::Value(IonType::Struct));
        let annotations: Vec<Option<String>> = reader
            .annotations()
            .map(|symbol| symbol.text().map(String::from))
            .collect();
        assert_eq!(annotations, vec![Some("a1".to_string())]);
        reader.step_in()?;
        // Duplicate field names are both surfaced
        reader.next()?;
        assert_eq!(reader.field_name()?.text(), Some("f1"));
        assert_eq!(reader.read_i64()?, 1);
        reader.next()?;
        assert_eq!(reader.field_name()?.text(), Some("f1"));
        assert_eq!(reader.read_i64()?, 2);
        Ok(())
    }

    #[test]
    fn system_symbols_do_not_trigger_a_table() {
        // Writing only system symbols requires no LST; the stream is IVM + value
        let bytes = written_by(|writer| {
            writer.write_symbol(4usize).unwrap(); // 'name'
        });
        assert_eq!(&bytes, &[0xE0, 0x01, 0x00, 0xEA, 0x71, 0x04]);
    }

    #[test]
    fn multiple_flushes_append_to_the_table() -> IonResult<()> {
        let mut writer = BinaryWriterBuilder::new().build(Vec::new())?;
        writer.write_symbol("first")?;
        writer.flush()?;
        writer.write_symbol("second")?;
        writer.finish()?;
        let bytes = writer.output().clone();

        let mut reader = ReaderBuilder::new().build(bytes)?;
        reader.next()?;
        let first = reader.read_symbol()?;
        assert_eq!(first.text(), Some("first"));
        assert_eq!(first.local_sid(), Some(10));
        reader.next()?;
        let second = reader.read_symbol()?;
        assert_eq!(second.text(), Some("second"));
        // The second table appended rather than replacing
        assert_eq!(second.local_sid(), Some(11));
        assert_eq!(reader.next()?, StreamItem::Nothing);
        Ok(())
    }

    #[test]
    fn undefined_sids_are_rejected() {
        let mut writer = BinaryWriterBuilder::new().build(Vec::new()).unwrap();
        assert!(writer.write_symbol(999usize).is_err());
        // SID 0 is always legal
        assert!(writer.write_symbol(0usize).is_ok());
    }

    #[test]
    fn finish_with_open_container_is_rejected() {
        let mut writer = BinaryWriterBuilder::new().build(Vec::new()).unwrap();
        writer.step_in(IonType::Struct).unwrap();
        assert!(writer.finish().is_err());
    }
}
