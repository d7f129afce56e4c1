use crate::raw_symbol_token_ref::AsRawSymbolTokenRef;
use crate::result::IonResult;
use crate::types::decimal::Decimal;
use crate::types::integer::Int;
use crate::types::timestamp::Timestamp;
use crate::types::IonType;

/// This trait captures the functionality needed to serialize a stream of Ion values in
/// either encoding. Its operations mirror the reader API: scalars are written with
/// `write_*` methods, containers are opened and closed with [IonWriter::step_in] and
/// [IonWriter::step_out], and field names and annotations are staged with
/// [IonWriter::set_field_name] and [IonWriter::set_annotations] ahead of the value they
/// apply to.
pub trait IonWriter {
    /// The type to which this writer serializes its output.
    type Output;

    /// Returns the (major, minor) version of the Ion stream being written.
    fn ion_version(&self) -> (u8, u8);

    /// Writes an Ion version marker to the output stream.
    fn write_ion_version_marker(&mut self, major: u8, minor: u8) -> IonResult<()>;

    /// Returns `true` if this writer can pass symbol tokens through without interning them
    /// in a symbol table. (The text encoding can; the binary encoding cannot.)
    fn supports_text_symbol_tokens(&self) -> bool;

    /// Sets a list of annotations that will be applied to the next value written.
    fn set_annotations<I, A>(&mut self, annotations: I)
    where
        A: AsRawSymbolTokenRef,
        I: IntoIterator<Item = A>;

    /// Writes an Ion null of the specified type.
    fn write_null(&mut self, ion_type: IonType) -> IonResult<()>;

    /// Writes an Ion boolean.
    fn write_bool(&mut self, value: bool) -> IonResult<()>;

    /// Writes an Ion integer.
    fn write_i64(&mut self, value: i64) -> IonResult<()>;

    /// Writes an Ion integer of any size.
    fn write_int(&mut self, value: &Int) -> IonResult<()>;

    /// Writes an Ion float with 32 bits of precision.
    fn write_f32(&mut self, value: f32) -> IonResult<()>;

    /// Writes an Ion float with 64 bits of precision.
    fn write_f64(&mut self, value: f64) -> IonResult<()>;

    /// Writes an Ion decimal.
    fn write_decimal(&mut self, value: &Decimal) -> IonResult<()>;

    /// Writes an Ion timestamp.
    fn write_timestamp(&mut self, value: &Timestamp) -> IonResult<()>;

    /// Writes an Ion symbol. The token may be specified as text or as a symbol ID; writers
    /// that do not [support text symbol tokens](IonWriter::supports_text_symbol_tokens)
    /// will return an error for text tokens.
    fn write_symbol<A: AsRawSymbolTokenRef>(&mut self, value: A) -> IonResult<()>;

    /// Writes an Ion string.
    fn write_string<A: AsRef<str>>(&mut self, value: A) -> IonResult<()>;

    /// Writes an Ion clob.
    fn write_clob<A: AsRef<[u8]>>(&mut self, value: A) -> IonResult<()>;

    /// Writes an Ion blob.
    fn write_blob<A: AsRef<[u8]>>(&mut self, value: A) -> IonResult<()>;

    /// Begins a new container of the specified type. `container_type` must be
    /// [IonType::List], [IonType::SExp], or [IonType::Struct]; anything else is an error.
    fn step_in(&mut self, container_type: IonType) -> IonResult<()>;

    /// Sets the field name that will be used for the next value written into the current
    /// struct. Staging a field name outside a struct surfaces as an error when the value is
    /// written.
    fn set_field_name<A: AsRawSymbolTokenRef>(&mut self, name: A);

    /// If the writer is positioned inside a container, returns `Some(_)` with that
    /// container's [IonType]. Otherwise, returns `None`.
    fn parent_type(&self) -> Option<IonType>;

    /// Returns the number of containers the writer has stepped into without later stepping
    /// out.
    fn depth(&self) -> usize;

    /// Ends the current container and positions the writer after it in the enclosing
    /// context. If the writer is at the top level, returns an error.
    fn step_out(&mut self) -> IonResult<()>;

    /// Delivers all buffered output to the sink. The writer must be at the top level;
    /// flushing mid-container is an error.
    fn flush(&mut self) -> IonResult<()>;

    /// Flushes any remaining output and marks the writer as complete. Finishing with an
    /// open container is an error, as is writing any further values afterward.
    fn finish(&mut self) -> IonResult<()>;

    /// A reference to the sink this writer serializes to.
    fn output(&self) -> &Self::Output;

    /// A mutable reference to the sink this writer serializes to.
    fn output_mut(&mut self) -> &mut Self::Output;
}
