use crate::result::IonResult;
use crate::types::decimal::Decimal;
use crate::types::integer::Int;
use crate::types::timestamp::Timestamp;
use crate::types::IonType;

/// This trait captures the format-agnostic functionality needed to navigate within an Ion
/// stream and read the values encountered into native Rust data types.
///
/// Reader implementations representing different levels of abstraction will surface
/// different sets of encoding artifacts as their `Item` type. While an application-level
/// reader only surfaces Ion values, the system-level reader also surfaces version markers
/// and symbol table declarations.
pub trait IonReader {
    /// The type returned by calls to [Self::next], indicating the next entity in the stream.
    type Item;

    /// The types used to represent field names, annotations, and symbol values at this
    /// level of abstraction.
    type Symbol;

    /// Returns the (major, minor) version of the Ion stream being read. If ion_version is
    /// called before an Ion Version Marker has been read, the version (1, 0) will be
    /// returned.
    fn ion_version(&self) -> (u8, u8);

    /// Attempts to advance the cursor to the next item in the stream at the current depth,
    /// and returns that item.
    fn next(&mut self) -> IonResult<Self::Item>;

    /// Returns the stream item the reader is currently positioned on.
    fn current(&self) -> Self::Item;

    /// If the current item is a value, returns that value's Ion type. Otherwise, returns
    /// None.
    fn ion_type(&self) -> Option<IonType>;

    /// Returns `true` if the reader is currently positioned over an Ion null of any type.
    fn is_null(&self) -> bool;

    /// Returns an iterator that will yield each of the annotations for the current value in
    /// order. If there is no current value, returns an empty iterator.
    fn annotations<'a>(&'a self) -> Box<dyn Iterator<Item = Self::Symbol> + 'a>;

    /// If the current item is a field within a struct, returns the field's name. Otherwise,
    /// returns an error.
    fn field_name(&self) -> IonResult<Self::Symbol>;

    /// Attempts to read the current item as an Ion null and return its Ion type.
    fn read_null(&mut self) -> IonResult<IonType>;

    /// Attempts to read the current item as an Ion boolean.
    fn read_bool(&mut self) -> IonResult<bool>;

    /// Attempts to read the current item as an Ion integer that fits in an i64.
    fn read_i64(&mut self) -> IonResult<i64>;

    /// Attempts to read the current item as an Ion integer of any size.
    fn read_int(&mut self) -> IonResult<Int>;

    /// Attempts to read the current item as an Ion float and return it as an f32.
    fn read_f32(&mut self) -> IonResult<f32>;

    /// Attempts to read the current item as an Ion float and return it as an f64.
    fn read_f64(&mut self) -> IonResult<f64>;

    /// Attempts to read the current item as an Ion decimal.
    fn read_decimal(&mut self) -> IonResult<Decimal>;

    /// Attempts to read the current item as an Ion string.
    fn read_string(&mut self) -> IonResult<String>;

    /// Attempts to read the current item as an Ion symbol.
    fn read_symbol(&mut self) -> IonResult<Self::Symbol>;

    /// Attempts to read the current item as an Ion blob.
    fn read_blob(&mut self) -> IonResult<Vec<u8>>;

    /// Attempts to read the current item as an Ion clob.
    fn read_clob(&mut self) -> IonResult<Vec<u8>>;

    /// Attempts to read the current item as an Ion timestamp.
    fn read_timestamp(&mut self) -> IonResult<Timestamp>;

    /// If the current value is a container (i.e. a struct, list, or s-expression), positions
    /// the cursor at the beginning of that container's sequence of child values. The
    /// application must call [Self::next()] to advance to the first child value. If the
    /// current value is not a container, returns an error.
    fn step_in(&mut self) -> IonResult<()>;

    /// Positions the cursor at the end of the container currently being traversed, skipping
    /// any child values that were not read. If the cursor is not in a container, returns an
    /// error.
    fn step_out(&mut self) -> IonResult<()>;

    /// If the reader is positioned at the top level, returns `None`. Otherwise, returns
    /// `Some(_)` with the parent container's [IonType].
    fn parent_type(&self) -> Option<IonType>;

    /// Returns a [usize] indicating the reader's current level of nesting. At the top
    /// level, this method returns `0`.
    fn depth(&self) -> usize;
}
