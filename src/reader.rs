use std::fmt::{Display, Formatter};
use std::io;
use std::io::Read;

use delegate::delegate;

use crate::binary::constants::v1_0::IVM;
use crate::binary::raw_binary_reader::RawBinaryReader;
use crate::catalog::{Catalog, MapCatalog};
use crate::data_source::ToIonDataSource;
use crate::raw_reader::RawReader;
use crate::result::{unsupported_version_error, IonResult};
use crate::stream_reader::IonReader;
use crate::symbol::Symbol;
use crate::symbol_table::SymbolTable;
use crate::system_reader::{SystemReader, SystemStreamItem};
use crate::text::raw_text_reader::RawTextReader;
use crate::types::decimal::Decimal;
use crate::types::integer::Int;
use crate::types::timestamp::Timestamp;
use crate::types::IonType;

/// Configures and constructs new instances of [Reader].
pub struct ReaderBuilder {
    catalog: Box<dyn Catalog>,
}

impl ReaderBuilder {
    /// Constructs a [ReaderBuilder] pre-populated with common default settings.
    pub fn new() -> ReaderBuilder {
        ReaderBuilder {
            catalog: Box::new(MapCatalog::new()),
        }
    }

    /// Provides a catalog through which shared symbol table imports will be resolved.
    pub fn with_catalog<C: Catalog + 'static>(mut self, catalog: C) -> ReaderBuilder {
        self.catalog = Box::new(catalog);
        self
    }

    /// Applies the specified settings to a new instance of `Reader`. This process involves
    /// reading some data from the beginning of `input` to detect whether its content is
    /// text or binary Ion. If this read operation fails, `build` will return an `Err`
    /// describing the problem it encountered.
    pub fn build<'a, I: 'a + ToIonDataSource>(self, input: I) -> IonResult<Reader<'a>> {
        // Convert the provided input into an implementation of `BufRead`
        let mut input = input.to_ion_data_source();
        // Stack-allocated buffer to hold the first four bytes from input
        let mut header: [u8; 4] = [0u8; 4];

        // Read up to four bytes of input. This has to be done somewhat manually. Convenience
        // functions like `read_exact` will return an error if the input doesn't contain the
        // correct number of bytes, and there are legal Ion streams that have fewer than four
        // bytes in them. (For example, the stream `1 `.)
        let mut total_bytes_read = 0usize;
        while total_bytes_read < IVM.len() {
            let bytes_read = input.read(&mut header[total_bytes_read..])?;
            // If `bytes_read` is zero, we reached the end of the file before we could get
            // all four bytes. That means this isn't a (valid) binary stream. We'll assume
            // it's text.
            if bytes_read == 0 {
                // `header` is a stack-allocated buffer that won't outlive this function
                // call. Only some of it is populated, so we make an owned copy of the bytes
                // that we can move into the reader.
                let owned_header = Vec::from(&header[..total_bytes_read]);
                // The file was too short to be binary Ion. Construct a text Reader.
                return Ok(Self::make_text_reader(owned_header, self.catalog));
            }
            total_bytes_read += bytes_read;
        }

        // If we've reached this point, we successfully read 4 bytes from the file into
        // `header`. Match against `header` to see if it contains the Ion 1.0 version marker.
        match header {
            [0xE0, 0x01, 0x00, 0xEA] => {
                // Binary Ion v1.0
                let full_input = io::Cursor::new(header).chain(input);
                Ok(Self::make_binary_reader(full_input, self.catalog))
            }
            [0xE0, major, minor, 0xEA] => {
                // Binary Ion v{major}.{minor}
                unsupported_version_error(major, minor, 0)
            }
            _ => {
                // It's not binary, assume it's text
                let full_input = io::Cursor::new(header.to_vec()).chain(input);
                Ok(Self::make_text_reader_from_buf_read(full_input, self.catalog))
            }
        }
    }

    fn make_text_reader<'a>(data: Vec<u8>, catalog: Box<dyn Catalog>) -> Reader<'a> {
        let raw_reader: Box<dyn RawReader + 'a> =
            Box::new(RawTextReader::new(io::Cursor::new(data)));
        UserReader::new(SystemReader::new(raw_reader, catalog))
    }

    fn make_text_reader_from_buf_read<'a, I: 'a + io::BufRead>(
        data: I,
        catalog: Box<dyn Catalog>,
    ) -> Reader<'a> {
        let raw_reader: Box<dyn RawReader + 'a> = Box::new(RawTextReader::new(data));
        UserReader::new(SystemReader::new(raw_reader, catalog))
    }

    fn make_binary_reader<'a, I: 'a + io::BufRead>(
        data: I,
        catalog: Box<dyn Catalog>,
    ) -> Reader<'a> {
        let raw_reader: Box<dyn RawReader + 'a> = Box::new(RawBinaryReader::new(data));
        UserReader::new(SystemReader::new(raw_reader, catalog))
    }
}

impl Default for ReaderBuilder {
    fn default() -> Self {
        ReaderBuilder::new()
    }
}

/// A Reader that uses dynamic dispatch to abstract over the format (text or binary) being
/// read by an underlying [RawReader].
pub type Reader<'a> = UserReader<Box<dyn RawReader + 'a>>;

/// Stream components that an application-level [Reader] may encounter. Version markers and
/// symbol tables are handled internally and never surfaced.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum StreamItem {
    /// A non-null Ion value and its corresponding Ion data type.
    Value(IonType),
    /// A null Ion value and its corresponding Ion data type.
    Null(IonType),
    /// Indicates that the reader is not positioned over anything. This can happen:
    /// * before the reader has begun processing the stream.
    /// * after the reader has stepped into a container, but before the reader has called
    ///   next()
    /// * after the reader has stepped out of a container, but before the reader has called
    ///   next()
    /// * after the reader has read the last item in a container
    Nothing,
}

impl StreamItem {
    /// If `is_null` is `true`, returns `StreamItem::Null(ion_type)`. Otherwise,
    /// returns `StreamItem::Value(ion_type)`.
    pub fn nullable_value(ion_type: IonType, is_null: bool) -> StreamItem {
        if is_null {
            StreamItem::Null(ion_type)
        } else {
            StreamItem::Value(ion_type)
        }
    }
}

impl Display for StreamItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use StreamItem::*;
        match self {
            Value(ion_type) => write!(f, "{ion_type}"),
            Null(ion_type) => write!(f, "null.{ion_type}"),
            Nothing => Ok(()),
        }
    }
}

/// A streaming Ion reader that resolves symbol IDs into their corresponding text and hides
/// system-level constructs (version markers and symbol tables) from the application.
///
/// `UserReader` itself is format-agnostic; all format-specific logic is handled by the
/// wrapped raw reader.
pub struct UserReader<R: RawReader> {
    system_reader: SystemReader<R>,
}

impl<R: RawReader> UserReader<R> {
    pub(crate) fn new(system_reader: SystemReader<R>) -> UserReader<R> {
        UserReader { system_reader }
    }

    /// The symbol table currently in effect for the stream.
    pub fn symbol_table(&self) -> &SymbolTable {
        self.system_reader.symbol_table()
    }
}

impl<R: RawReader> IonReader for UserReader<R> {
    type Item = StreamItem;
    type Symbol = Symbol;

    /// Advances the reader to the next user-level Ion value, processing any system-level
    /// directives encountered along the way.
    fn next(&mut self) -> IonResult<StreamItem> {
        loop {
            match self.system_reader.next()? {
                SystemStreamItem::VersionMarker(_, _) | SystemStreamItem::SymbolTableValue(_) => {
                    // The system reader encountered encoding artifacts like an IVM or a
                    // serialized symbol table. The user reader ignores these and moves on
                    // to the next stream item.
                }
                SystemStreamItem::Value(ion_type) => return Ok(StreamItem::Value(ion_type)),
                SystemStreamItem::Null(ion_type) => return Ok(StreamItem::Null(ion_type)),
                SystemStreamItem::Nothing => return Ok(StreamItem::Nothing),
            }
        }
    }

    fn current(&self) -> StreamItem {
        match self.system_reader.current() {
            SystemStreamItem::Value(ion_type) => StreamItem::Value(ion_type),
            SystemStreamItem::Null(ion_type) => StreamItem::Null(ion_type),
            _ => StreamItem::Nothing,
        }
    }

    fn annotations<'a>(&'a self) -> Box<dyn Iterator<Item = Symbol> + 'a> {
        self.system_reader.annotations()
    }

    delegate! {
        to self.system_reader {
            fn ion_version(&self) -> (u8, u8);
            fn ion_type(&self) -> Option<IonType>;
            fn is_null(&self) -> bool;
            fn field_name(&self) -> IonResult<Symbol>;
            fn read_null(&mut self) -> IonResult<IonType>;
            fn read_bool(&mut self) -> IonResult<bool>;
            fn read_i64(&mut self) -> IonResult<i64>;
            fn read_int(&mut self) -> IonResult<Int>;
            fn read_f32(&mut self) -> IonResult<f32>;
            fn read_f64(&mut self) -> IonResult<f64>;
            fn read_decimal(&mut self) -> IonResult<Decimal>;
            fn read_string(&mut self) -> IonResult<String>;
            fn read_symbol(&mut self) -> IonResult<Symbol>;
            fn read_blob(&mut self) -> IonResult<Vec<u8>>;
            fn read_clob(&mut self) -> IonResult<Vec<u8>>;
            fn read_timestamp(&mut self) -> IonResult<Timestamp>;
            fn step_in(&mut self) -> IonResult<()>;
            fn step_out(&mut self) -> IonResult<()>;
            fn parent_type(&self) -> Option<IonType>;
            fn depth(&self) -> usize;
        }
    }
}

#[cfg(test)]
mod reader_tests {
    use super::*;
    use crate::binary::constants::v1_0::IVM;
    use crate::result::IonResult;
    use crate::StreamItem::Value;

    // Create a growable byte vector that starts with the Ion 1.0 version marker
    fn ion_data(bytes: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&IVM);
        data.extend_from_slice(bytes);
        data
    }

    fn ion_reader_for(bytes: &[u8]) -> Reader<'static> {
        ReaderBuilder::new().build(ion_data(bytes)).unwrap()
    }

    const EXAMPLE_STREAM: &[u8] = &[
        // $ion_symbol_table::{imports: $ion_symbol_table, symbols: ["foo", "bar", "baz"]}
        0xEE, // Var len annotations
        0x92, // Annotations + Value length: 18 bytes
        0x81, // Annotations length: 1
        0x83, // Annotation 3 ('$ion_symbol_table')
        0xDE, // Var len struct
        0x8E, // Length: 14 bytes
        0x87, // Field ID 7 ('symbols')
        0xBC, // 12-byte List
        0x83, 0x66, 0x6F, 0x6F, // "foo"
        0x83, 0x62, 0x61, 0x72, // "bar"
        0x83, 0x62, 0x61, 0x7A, // "baz"
        // System: {$10: 1, $11: 2, $12: 3}
        // User: {foo: 1, bar: 2, baz: 3}
        0xD9, // 9-byte struct
        0x8A, // Field ID 10
        0x21, 0x01, // Integer 1
        0x8B, // Field ID 11
        0x21, 0x02, // Integer 2
        0x8C, // Field ID 12
        0x21, 0x03, // Integer 3
    ];

    #[test]
    fn symbol_tables_are_not_surfaced() -> IonResult<()> {
        let mut reader = ion_reader_for(EXAMPLE_STREAM);
        // The symbol table struct is consumed without being surfaced
        assert_eq!(reader.next()?, Value(IonType::Struct));
        reader.step_in()?;

        assert_eq!(reader.next()?, Value(IonType::Int));
        assert_eq!(reader.field_name()?.text(), Some("foo"));
        assert_eq!(reader.read_i64()?, 1);

        assert_eq!(reader.next()?, Value(IonType::Int));
        assert_eq!(reader.field_name()?.text(), Some("bar"));
        assert_eq!(reader.read_i64()?, 2);

        assert_eq!(reader.next()?, Value(IonType::Int));
        assert_eq!(reader.field_name()?.text(), Some("baz"));
        assert_eq!(reader.read_i64()?, 3);

        assert_eq!(reader.next()?, StreamItem::Nothing);
        reader.step_out()?;
        assert_eq!(reader.next()?, StreamItem::Nothing);
        Ok(())
    }

    #[test]
    fn format_detection_picks_text_for_short_streams() -> IonResult<()> {
        let mut reader = ReaderBuilder::new().build("1 ")?;
        assert_eq!(reader.next()?, Value(IonType::Int));
        assert_eq!(reader.read_i64()?, 1);
        Ok(())
    }

    #[test]
    fn format_detection_picks_text_for_text_streams() -> IonResult<()> {
        let mut reader = ReaderBuilder::new().build("{greeting: \"hello\"}")?;
        assert_eq!(reader.next()?, Value(IonType::Struct));
        reader.step_in()?;
        reader.next()?;
        assert_eq!(reader.field_name()?.text(), Some("greeting"));
        assert_eq!(reader.read_string()?, "hello");
        Ok(())
    }

    #[test]
    fn unsupported_binary_versions_are_rejected_up_front() {
        let result = ReaderBuilder::new().build(&[0xE0u8, 0x02, 0x01, 0xEA][..]);
        assert!(matches!(
            result,
            Err(crate::IonError::UnsupportedVersionError {
                major: 2,
                minor: 1,
                ..
            })
        ));
    }

    #[test]
    fn symbol_values_resolve_through_the_table() -> IonResult<()> {
        // $ion (SID 1) as a symbol value
        let mut reader = ion_reader_for(&[0x71, 0x01]);
        assert_eq!(reader.next()?, Value(IonType::Symbol));
        let symbol = reader.read_symbol()?;
        assert_eq!(symbol.text(), Some("$ion"));
        assert_eq!(symbol.local_sid(), Some(1));
        Ok(())
    }

    #[test]
    fn sid_zero_is_legal_and_unknown() -> IonResult<()> {
        let mut reader = ion_reader_for(&[0x70]);
        assert_eq!(reader.next()?, Value(IonType::Symbol));
        let symbol = reader.read_symbol()?;
        assert_eq!(symbol.text(), None);
        assert_eq!(symbol.local_sid(), Some(0));
        Ok(())
    }

    #[test]
    fn annotations_resolve_through_the_table() -> IonResult<()> {
        // name::version::7 using system SIDs 4 and 5
        let mut reader = ion_reader_for(&[0xE5, 0x82, 0x84, 0x85, 0x21, 0x07]);
        assert_eq!(reader.next()?, Value(IonType::Int));
        let annotations: Vec<String> = reader
            .annotations()
            .map(|s| s.text().unwrap_or("$0").to_string())
            .collect();
        assert_eq!(annotations, vec!["name".to_string(), "version".to_string()]);
        Ok(())
    }
}
