use std::fmt::{Display, Formatter};

use crate::catalog::Catalog;
use crate::constants::v1_0::system_symbol_ids;
use crate::raw_reader::{RawReader, RawStreamItem};
use crate::raw_symbol_token::RawSymbolToken;
use crate::result::{
    illegal_operation, invalid_encoding_error, unresolved_import_error, IonError, IonResult,
};
use crate::stream_reader::IonReader;
use crate::symbol::Symbol;
use crate::symbol_table::SymbolTable;
use crate::types::decimal::Decimal;
use crate::types::integer::Int;
use crate::types::timestamp::Timestamp;
use crate::types::IonType;

/// Stream components that a [SystemReader] may encounter: every raw-level item, with
/// symbol table declarations distinguished from ordinary values.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SystemStreamItem {
    /// An Ion Version Marker. Encountering one resets the symbol table to the system table.
    VersionMarker(u8, u8),
    /// A local symbol table struct. By the time this item is surfaced, the reader has
    /// already consumed the struct and installed the table it declared.
    SymbolTableValue(IonType),
    /// A non-null Ion value and its corresponding Ion data type.
    Value(IonType),
    /// A null Ion value and its corresponding Ion data type.
    Null(IonType),
    /// Indicates that the reader is not positioned over anything.
    Nothing,
}

impl Display for SystemStreamItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use SystemStreamItem::*;
        match self {
            VersionMarker(major, minor) => write!(f, "ion version marker (v{major}.{minor})"),
            SymbolTableValue(ion_type) => write!(f, "symbol table ({ion_type})"),
            Value(ion_type) => write!(f, "{ion_type}"),
            Null(ion_type) => write!(f, "null.{ion_type}"),
            Nothing => write!(f, "nothing/end-of-sequence"),
        }
    }
}

/// An import descriptor parsed from a local symbol table's `imports` list.
#[derive(Debug)]
struct ImportDescriptor {
    name: Option<String>,
    version: Option<i64>,
    max_id: Option<i64>,
}

/// A reader that resolves the system-level constructs in a raw reader's stream: it resets
/// the symbol table at version markers, recognizes and installs `$ion_symbol_table`
/// structs (consulting a [Catalog] for shared-table imports), and resolves symbol IDs into
/// [Symbol]s with text.
///
/// SystemReader is format-agnostic; all encoding-specific logic lives in the wrapped
/// [RawReader].
pub struct SystemReader<R: RawReader> {
    raw_reader: R,
    symbol_table: SymbolTable,
    catalog: Box<dyn Catalog>,
    current_item: SystemStreamItem,
    fatal_error: Option<IonError>,
}

impl<R: RawReader> SystemReader<R> {
    pub fn new(raw_reader: R, catalog: Box<dyn Catalog>) -> SystemReader<R> {
        SystemReader {
            raw_reader,
            symbol_table: SymbolTable::new(),
            catalog,
            current_item: SystemStreamItem::Nothing,
            fatal_error: None,
        }
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbol_table
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

    /// Whether the raw reader is positioned on a top-level struct whose first annotation
    /// is `$ion_symbol_table`.
    fn on_symbol_table_struct(&self) -> bool {
        self.raw_reader.depth() == 0
            && self.raw_reader.current() == RawStreamItem::Value(IonType::Struct)
            && self
                .raw_reader
                .annotations()
                .first()
                .map(|token| token.matches(system_symbol_ids::ION_SYMBOL_TABLE, "$ion_symbol_table"))
                .unwrap_or(false)
    }

    fn next_impl(&mut self) -> IonResult<SystemStreamItem> {
        let item = match self.raw_reader.next()? {
            RawStreamItem::VersionMarker(major, minor) => {
                self.symbol_table.reset();
                SystemStreamItem::VersionMarker(major, minor)
            }
            RawStreamItem::Value(IonType::Struct) if self.on_symbol_table_struct() => {
                self.process_symbol_table()?;
                SystemStreamItem::SymbolTableValue(IonType::Struct)
            }
            RawStreamItem::Value(ion_type) => SystemStreamItem::Value(ion_type),
            RawStreamItem::Null(ion_type) => SystemStreamItem::Null(ion_type),
            RawStreamItem::Nothing => SystemStreamItem::Nothing,
        };
        self.current_item = item;
        Ok(item)
    }

    /// Consumes the `$ion_symbol_table` struct the raw reader is positioned on and installs
    /// the table it declares. The `imports` field is processed before the `symbols` field
    /// regardless of the order the two appear in.
    fn process_symbol_table(&mut self) -> IonResult<()> {
        self.raw_reader.step_in()?;

        let mut is_append = false;
        let mut imports: Vec<ImportDescriptor> = Vec::new();
        let mut declared_symbols: Vec<Option<String>> = Vec::new();
        let mut found_imports_field = false;
        let mut found_symbols_field = false;

        loop {
            let item = self.raw_reader.next()?;
            if item == RawStreamItem::Nothing {
                break;
            }
            let field_name = match self.raw_reader.field_name() {
                Some(token) => token.clone(),
                None => break,
            };
            if field_name.matches(system_symbol_ids::IMPORTS, "imports") {
                if found_imports_field {
                    return invalid_encoding_error(
                        "symbol table has two 'imports' fields",
                        0,
                    );
                }
                found_imports_field = true;
                match item {
                    RawStreamItem::Value(IonType::Symbol) => {
                        let token = self.raw_reader.read_symbol()?;
                        if token.matches(system_symbol_ids::ION_SYMBOL_TABLE, "$ion_symbol_table") {
                            is_append = true;
                        }
                        // Any other symbol in the imports field is ignored
                    }
                    RawStreamItem::Value(IonType::List) => {
                        imports = self.read_import_descriptors()?;
                    }
                    // Non-symbol, non-list imports fields are ignored
                    _ => {}
                }
            } else if field_name.matches(system_symbol_ids::SYMBOLS, "symbols") {
                if found_symbols_field {
                    return invalid_encoding_error(
                        "symbol table has two 'symbols' fields",
                        0,
                    );
                }
                found_symbols_field = true;
                if item == RawStreamItem::Value(IonType::List) {
                    declared_symbols = self.read_declared_symbols()?;
                }
                // A symbols field of any other type is ignored
            }
            // Fields other than imports/symbols are ignored
        }
        self.raw_reader.step_out()?;

        if !is_append {
            self.symbol_table.reset();
        }
        for import in &imports {
            self.resolve_import(import)?;
        }
        for declared in declared_symbols {
            match declared {
                Some(text) => {
                    self.symbol_table.add_symbol(text);
                }
                None => {
                    self.symbol_table.add_placeholder();
                }
            }
        }
        Ok(())
    }

    /// Reads the elements of a `symbols` list. String elements define symbol text; null
    /// and non-string elements become slots with undefined text that still consume a SID.
    fn read_declared_symbols(&mut self) -> IonResult<Vec<Option<String>>> {
        let mut declared = Vec::new();
        self.raw_reader.step_in()?;
        loop {
            match self.raw_reader.next()? {
                RawStreamItem::Nothing => break,
                RawStreamItem::Value(IonType::String) => {
                    declared.push(Some(self.raw_reader.read_string()?));
                }
                _ => declared.push(None),
            }
        }
        self.raw_reader.step_out()?;
        Ok(declared)
    }

    fn read_import_descriptors(&mut self) -> IonResult<Vec<ImportDescriptor>> {
        let mut descriptors = Vec::new();
        self.raw_reader.step_in()?;
        loop {
            match self.raw_reader.next()? {
                RawStreamItem::Nothing => break,
                RawStreamItem::Value(IonType::Struct) => {
                    descriptors.push(self.read_import_descriptor()?);
                }
                // Non-struct elements of the imports list are ignored
                _ => {}
            }
        }
        self.raw_reader.step_out()?;
        Ok(descriptors)
    }

    fn read_import_descriptor(&mut self) -> IonResult<ImportDescriptor> {
        let mut descriptor = ImportDescriptor {
            name: None,
            version: None,
            max_id: None,
        };
        self.raw_reader.step_in()?;
        loop {
            let item = self.raw_reader.next()?;
            if item == RawStreamItem::Nothing {
                break;
            }
            let field_name = match self.raw_reader.field_name() {
                Some(token) => token.clone(),
                None => break,
            };
            if field_name.matches(system_symbol_ids::NAME, "name") {
                if item == RawStreamItem::Value(IonType::String) {
                    descriptor.name = Some(self.raw_reader.read_string()?);
                }
            } else if field_name.matches(system_symbol_ids::VERSION, "version") {
                if item == RawStreamItem::Value(IonType::Int) {
                    descriptor.version = self.raw_reader.read_int()?.as_i64();
                }
            } else if field_name.matches(system_symbol_ids::MAX_ID, "max_id") {
                if item == RawStreamItem::Value(IonType::Int) {
                    descriptor.max_id = self.raw_reader.read_int()?.as_i64();
                }
            }
        }
        self.raw_reader.step_out()?;
        Ok(descriptor)
    }

    fn resolve_import(&mut self, import: &ImportDescriptor) -> IonResult<()> {
        let name = match &import.name {
            // An import with no usable name is ignored
            None => return Ok(()),
            // Imports of the system table are redundant and skipped
            Some(name) if name == "$ion" => return Ok(()),
            Some(name) => name.as_str(),
        };
        // Versions below 1 are treated as 1
        let version = match import.version {
            Some(version) if version >= 1 => version.min(u32::MAX as i64) as u32,
            _ => 1,
        };
        let max_id = match import.max_id {
            Some(max_id) if max_id >= 0 => Some(max_id as usize),
            Some(_) => None, // a negative max_id is treated as unspecified
            None => None,
        };

        if let Some(table) = self.catalog.find_exact(name, version) {
            self.symbol_table.add_import(&table, max_id);
            return Ok(());
        }
        if let Some(table) = self.catalog.find_latest(name) {
            // A substitute version is only usable if the declaration bounded its size
            return match max_id {
                Some(max_id) => {
                    self.symbol_table.add_import(&table, Some(max_id));
                    Ok(())
                }
                None => unresolved_import_error(name, version),
            };
        }
        match max_id {
            Some(max_id) => {
                self.symbol_table
                    .add_placeholder_import(name, version, max_id);
                Ok(())
            }
            None => unresolved_import_error(name, version),
        }
    }

    fn resolve_token(&self, token: &RawSymbolToken) -> Symbol {
        match token {
            RawSymbolToken::SymbolId(sid) => self.symbol_table.resolve(*sid),
            RawSymbolToken::Text(text) => Symbol::owned(text.clone()),
        }
    }
}

impl<R: RawReader> IonReader for SystemReader<R> {
    type Item = SystemStreamItem;
    type Symbol = Symbol;

    fn ion_version(&self) -> (u8, u8) {
        self.raw_reader.ion_version()
    }

    fn next(&mut self) -> IonResult<Self::Item> {
        self.check_failed()?;
        let result = self.next_impl();
        self.record_failure(result)
    }

    fn current(&self) -> Self::Item {
        self.current_item
    }

    fn ion_type(&self) -> Option<IonType> {
        self.raw_reader.ion_type()
    }

    fn is_null(&self) -> bool {
        self.raw_reader.is_null()
    }

    fn annotations<'a>(&'a self) -> Box<dyn Iterator<Item = Symbol> + 'a> {
        Box::new(
            self.raw_reader
                .annotations()
                .iter()
                .map(|token| self.resolve_token(token)),
        )
    }

    fn field_name(&self) -> IonResult<Symbol> {
        match self.raw_reader.field_name() {
            Some(token) => Ok(self.resolve_token(token)),
            None => illegal_operation("field_name is only defined inside a struct"),
        }
    }

    fn read_null(&mut self) -> IonResult<IonType> {
        self.raw_reader.read_null()
    }

    fn read_bool(&mut self) -> IonResult<bool> {
        self.raw_reader.read_bool()
    }

    fn read_i64(&mut self) -> IonResult<i64> {
        self.raw_reader.read_i64()
    }

    fn read_int(&mut self) -> IonResult<Int> {
        self.raw_reader.read_int()
    }

    fn read_f32(&mut self) -> IonResult<f32> {
        self.raw_reader.read_f32()
    }

    fn read_f64(&mut self) -> IonResult<f64> {
        self.raw_reader.read_f64()
    }

    fn read_decimal(&mut self) -> IonResult<Decimal> {
        self.raw_reader.read_decimal()
    }

    fn read_string(&mut self) -> IonResult<String> {
        self.raw_reader.read_string()
    }

    fn read_symbol(&mut self) -> IonResult<Symbol> {
        let token = self.raw_reader.read_symbol()?;
        Ok(self.resolve_token(&token))
    }

    fn read_blob(&mut self) -> IonResult<Vec<u8>> {
        self.raw_reader.read_blob()
    }

    fn read_clob(&mut self) -> IonResult<Vec<u8>> {
        self.raw_reader.read_clob()
    }

    fn read_timestamp(&mut self) -> IonResult<Timestamp> {
        self.raw_reader.read_timestamp()
    }

    fn step_in(&mut self) -> IonResult<()> {
        self.raw_reader.step_in()
    }

    fn step_out(&mut self) -> IonResult<()> {
        self.raw_reader.step_out()
    }

    fn parent_type(&self) -> Option<IonType> {
        self.raw_reader.parent_type()
    }

    fn depth(&self) -> usize {
        self.raw_reader.depth()
    }
}

#[cfg(test)]
mod system_reader_tests {
    use super::*;
    use crate::catalog::MapCatalog;
    use crate::symbol_table::SharedSymbolTable;
    use crate::text::raw_text_reader::RawTextReader;
    use std::io;

    fn system_reader_for(text: &str) -> SystemReader<RawTextReader<io::Cursor<Vec<u8>>>> {
        SystemReader::new(
            RawTextReader::new(io::Cursor::new(text.as_bytes().to_vec())),
            Box::new(MapCatalog::new()),
        )
    }

    fn system_reader_with_catalog(
        text: &str,
        catalog: MapCatalog,
    ) -> SystemReader<RawTextReader<io::Cursor<Vec<u8>>>> {
        SystemReader::new(
            RawTextReader::new(io::Cursor::new(text.as_bytes().to_vec())),
            Box::new(catalog),
        )
    }

    #[test]
    fn local_symbols_resolve() -> IonResult<()> {
        let mut reader =
            system_reader_for("$ion_symbol_table::{symbols:[\"foo\", \"bar\"]} foo bar");
        assert_eq!(
            reader.next()?,
            SystemStreamItem::SymbolTableValue(IonType::Struct)
        );
        assert_eq!(reader.symbol_table().sid_for(&"foo"), Some(10));
        assert_eq!(reader.symbol_table().sid_for(&"bar"), Some(11));

        assert_eq!(reader.next()?, SystemStreamItem::Value(IonType::Symbol));
        assert_eq!(reader.read_symbol()?.text(), Some("foo"));
        assert_eq!(reader.next()?, SystemStreamItem::Value(IonType::Symbol));
        assert_eq!(reader.read_symbol()?.text(), Some("bar"));
        assert_eq!(reader.next()?, SystemStreamItem::Nothing);
        Ok(())
    }

    #[test]
    fn appends_extend_the_installed_table() -> IonResult<()> {
        let text = r#"
            $ion_symbol_table::{symbols:["s1"]}
            $ion_symbol_table::{imports:$ion_symbol_table, symbols:["s2"]}
            s1 s2
        "#;
        let mut reader = system_reader_for(text);
        reader.next()?; // first symbol table
        let max_after_first = reader.symbol_table().max_id();
        assert_eq!(reader.symbol_table().sid_for(&"s1"), Some(10));

        reader.next()?; // appending symbol table
        // The first new symbol lands immediately after the prior max_id
        assert_eq!(reader.symbol_table().sid_for(&"s2"), Some(max_after_first + 1));
        // Previously defined text keeps its SID
        assert_eq!(reader.symbol_table().sid_for(&"s1"), Some(10));

        assert_eq!(reader.next()?, SystemStreamItem::Value(IonType::Symbol));
        assert_eq!(reader.read_symbol()?.text(), Some("s1"));
        assert_eq!(reader.next()?, SystemStreamItem::Value(IonType::Symbol));
        assert_eq!(reader.read_symbol()?.text(), Some("s2"));
        Ok(())
    }

    #[test]
    fn non_appending_table_replaces_the_previous_one() -> IonResult<()> {
        let text = r#"
            $ion_symbol_table::{symbols:["old"]}
            $ion_symbol_table::{symbols:["new"]}
        "#;
        let mut reader = system_reader_for(text);
        reader.next()?;
        assert_eq!(reader.symbol_table().sid_for(&"old"), Some(10));
        reader.next()?;
        assert_eq!(reader.symbol_table().sid_for(&"old"), None);
        assert_eq!(reader.symbol_table().sid_for(&"new"), Some(10));
        Ok(())
    }

    #[test]
    fn version_marker_resets_the_table() -> IonResult<()> {
        let text = "$ion_symbol_table::{symbols:[\"foo\"]} $ion_1_0 $10";
        let mut reader = system_reader_for(text);
        reader.next()?;
        assert_eq!(reader.symbol_table().sid_for(&"foo"), Some(10));
        assert_eq!(reader.next()?, SystemStreamItem::VersionMarker(1, 0));
        assert_eq!(reader.symbol_table().sid_for(&"foo"), None);
        // $10 is now out of range and resolves to unknown text
        reader.next()?;
        let symbol = reader.read_symbol()?;
        assert_eq!(symbol.text(), None);
        assert_eq!(symbol.local_sid(), Some(10));
        Ok(())
    }

    #[test]
    fn null_and_non_string_symbols_consume_sids() -> IonResult<()> {
        let text = "$ion_symbol_table::{symbols:[\"a\", null, 7, \"b\"]} $11 $13";
        let mut reader = system_reader_for(text);
        reader.next()?;
        assert_eq!(reader.symbol_table().sid_for(&"a"), Some(10));
        assert_eq!(reader.symbol_table().sid_for(&"b"), Some(13));
        reader.next()?;
        assert_eq!(reader.read_symbol()?.text(), None);
        reader.next()?;
        assert_eq!(reader.read_symbol()?.text(), Some("b"));
        Ok(())
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let text = "$ion_symbol_table::{symbols:[\"a\"], symbols:[\"b\"]}";
        let mut reader = system_reader_for(text);
        assert!(matches!(
            reader.next(),
            Err(IonError::InvalidEncodingError { .. })
        ));
        // and the failure is sticky
        assert!(reader.next().is_err());

        let text = "$ion_symbol_table::{imports:$ion_symbol_table, imports:$ion_symbol_table}";
        let mut reader = system_reader_for(text);
        assert!(reader.next().is_err());
    }

    #[test]
    fn catalog_imports_resolve_exactly() -> IonResult<()> {
        let mut catalog = MapCatalog::new();
        catalog.insert_table(SharedSymbolTable::new(
            "com.example.shared",
            2,
            vec![Some("alpha".to_string()), Some("beta".to_string())],
        )?);
        let text = r#"
            $ion_symbol_table::{imports:[{name:"com.example.shared", version:2, max_id:2}]}
            $10 $11
        "#;
        let mut reader = system_reader_with_catalog(text, catalog);
        reader.next()?;
        reader.next()?;
        assert_eq!(reader.read_symbol()?.text(), Some("alpha"));
        reader.next()?;
        assert_eq!(reader.read_symbol()?.text(), Some("beta"));
        Ok(())
    }

    #[test]
    fn import_max_id_pads_and_truncates() -> IonResult<()> {
        let mut catalog = MapCatalog::new();
        catalog.insert_table(SharedSymbolTable::new(
            "t",
            1,
            vec![Some("one".to_string()), Some("two".to_string())],
        )?);
        // max_id of 3 pads with an unknown-text slot; local symbols follow the padding
        let text = r#"
            $ion_symbol_table::{imports:[{name:"t", version:1, max_id:3}], symbols:["local"]}
            $12 $13
        "#;
        let mut reader = system_reader_with_catalog(text, catalog);
        reader.next()?;
        reader.next()?;
        let padded = reader.read_symbol()?;
        assert_eq!(padded.text(), None);
        let source = padded.source().expect("padding slots keep their source");
        assert_eq!(source.table(), "t");
        assert_eq!(source.sid(), 3);
        reader.next()?;
        assert_eq!(reader.read_symbol()?.text(), Some("local"));
        Ok(())
    }

    #[test]
    fn missing_import_with_max_id_uses_placeholders() -> IonResult<()> {
        let text = r#"
            $ion_symbol_table::{imports:[{name:"ghost", version:5, max_id:2}], symbols:["x"]}
            $10 $12
        "#;
        let mut reader = system_reader_for(text);
        reader.next()?;
        reader.next()?;
        let unknown = reader.read_symbol()?;
        assert_eq!(unknown.text(), None);
        assert_eq!(unknown.source().unwrap().table(), "ghost");
        assert_eq!(unknown.source().unwrap().version(), 5);
        reader.next()?;
        assert_eq!(reader.read_symbol()?.text(), Some("x"));
        Ok(())
    }

    #[test]
    fn missing_import_without_max_id_fails() {
        let text = r#"$ion_symbol_table::{imports:[{name:"ghost", version:5}]}"#;
        let mut reader = system_reader_for(text);
        match reader.next() {
            Err(IonError::UnresolvedImportError { name, version }) => {
                assert_eq!(name, "ghost");
                assert_eq!(version, 5);
            }
            other => panic!("expected an unresolved import error, found {other:?}"),
        }
    }

    #[test]
    fn substitute_version_requires_max_id() -> IonResult<()> {
        let mut catalog = MapCatalog::new();
        catalog.insert_table(SharedSymbolTable::new(
            "t",
            3,
            vec![Some("a".to_string())],
        )?);

        // Version 1 isn't in the catalog; version 3 substitutes because max_id bounds it
        let text = r#"$ion_symbol_table::{imports:[{name:"t", version:1, max_id:1}]} $10"#;
        let mut reader = system_reader_with_catalog(text, catalog);
        reader.next()?;
        reader.next()?;
        assert_eq!(reader.read_symbol()?.text(), Some("a"));

        // Without a max_id the substitution is an error
        let mut catalog = MapCatalog::new();
        catalog.insert_table(SharedSymbolTable::new(
            "t",
            3,
            vec![Some("a".to_string())],
        )?);
        let text = r#"$ion_symbol_table::{imports:[{name:"t", version:1}]}"#;
        let mut reader = system_reader_with_catalog(text, catalog);
        assert!(matches!(
            reader.next(),
            Err(IonError::UnresolvedImportError { .. })
        ));
        Ok(())
    }

    #[test]
    fn annotated_non_table_structs_are_ordinary_values() -> IonResult<()> {
        // The annotation must be the *first* annotation for the struct to be a table
        let mut reader = system_reader_for("foo::$ion_symbol_table::{symbols:[\"a\"]}");
        assert_eq!(reader.next()?, SystemStreamItem::Value(IonType::Struct));
        assert_eq!(reader.symbol_table().sid_for(&"a"), None);
        Ok(())
    }

    #[test]
    fn nested_symbol_table_structs_are_ordinary_values() -> IonResult<()> {
        let mut reader = system_reader_for("[$ion_symbol_table::{symbols:[\"a\"]}]");
        assert_eq!(reader.next()?, SystemStreamItem::Value(IonType::List));
        reader.step_in()?;
        assert_eq!(reader.next()?, SystemStreamItem::Value(IonType::Struct));
        assert_eq!(reader.symbol_table().sid_for(&"a"), None);
        Ok(())
    }
}
