use std::collections::HashMap;
use std::sync::Arc;

use crate::constants::v1_0;
use crate::result::{illegal_operation, IonResult};
use crate::symbol::{ImportSource, Symbol};
use crate::types::SymbolId;

/// An immutable, named, versioned list of symbols that can be referenced by the `imports`
/// field of a local symbol table. Shared tables are distributed out of band and resolved
/// through a [Catalog](crate::catalog::Catalog).
///
/// Slots with no known text (`None`) are legal; they arise when a shared table is itself
/// assembled from a stream with undefined symbols.
#[derive(Debug, Clone)]
pub struct SharedSymbolTable {
    name: Arc<str>,
    version: u32,
    symbols: Vec<Option<Arc<str>>>,
}

impl SharedSymbolTable {
    pub fn new<S: Into<String>>(
        name: S,
        version: u32,
        symbols: Vec<Option<String>>,
    ) -> IonResult<SharedSymbolTable> {
        let name = name.into();
        if name.is_empty() {
            return illegal_operation("shared symbol table names cannot be empty");
        }
        if version < 1 {
            return illegal_operation("shared symbol table versions begin at 1");
        }
        Ok(SharedSymbolTable {
            name: Arc::from(name),
            version,
            symbols: symbols
                .into_iter()
                .map(|text| text.map(Arc::from))
                .collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// The number of symbols this table defines.
    pub fn max_id(&self) -> usize {
        self.symbols.len()
    }

    /// The text of the symbol at the given position, where positions begin at 1 (matching
    /// the SIDs the table's symbols would receive if it were imported first).
    pub fn text_for(&self, position: usize) -> Option<&str> {
        if position == 0 {
            return None;
        }
        self.symbols
            .get(position - 1)
            .and_then(|text| text.as_ref())
            .map(|text| text.as_ref())
    }

    pub(crate) fn text_arc_for(&self, position: usize) -> Option<Arc<str>> {
        if position == 0 {
            return None;
        }
        self.symbols
            .get(position - 1)
            .and_then(|text| text.as_ref())
            .map(Arc::clone)
    }
}

// Two shared tables are the same table if their names and versions match; their contents
// are not consulted.
impl PartialEq for SharedSymbolTable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version
    }
}

impl Eq for SharedSymbolTable {}

/// Stores mappings from Symbol IDs to text and vice-versa: the flattened view of the system
/// table, any imported shared tables, and the stream's own local symbols.
///
/// SID assignment follows declaration order: slot 0 is `$0`, the system symbols occupy
/// 1 through 9, each import occupies the next contiguous block of `max_id` slots, and local
/// symbols follow. `sid_for` always returns the *smallest* SID mapped to a given text.
pub struct SymbolTable {
    symbols_by_id: Vec<Symbol>,
    ids_by_text: HashMap<Arc<str>, SymbolId>,
}

impl SymbolTable {
    /// Constructs a new symbol table pre-populated with the system symbols defined by the spec.
    pub fn new() -> SymbolTable {
        let mut symbol_table = SymbolTable {
            symbols_by_id: Vec::with_capacity(v1_0::SYSTEM_SYMBOLS.len()),
            ids_by_text: HashMap::new(),
        };
        symbol_table.initialize();
        symbol_table
    }

    fn initialize(&mut self) {
        // Slot 0 holds $0, the symbol with unknown text
        self.symbols_by_id.push(Symbol::unknown_text());
        for text in v1_0::SYSTEM_SYMBOLS.iter().skip(1) {
            let arc: Arc<str> = Arc::from(*text);
            self.ids_by_text
                .insert(Arc::clone(&arc), self.symbols_by_id.len());
            self.symbols_by_id.push(Symbol::shared(arc));
        }
    }

    /// Discards all symbols except the system symbols. Called when a reader encounters an
    /// Ion Version Marker.
    pub fn reset(&mut self) {
        self.symbols_by_id.clear();
        self.ids_by_text.clear();
        self.initialize();
    }

    /// Appends a symbol with the given text, consuming the next SID even if the text is
    /// already present. (A local symbol table's `symbols` list may repeat text; every entry
    /// still occupies a slot.) Returns the newly assigned SID.
    pub fn add_symbol<T: Into<Arc<str>>>(&mut self, text: T) -> SymbolId {
        let arc: Arc<str> = text.into();
        let sid = self.symbols_by_id.len();
        // Only the first SID mapped to a given text is returned by `sid_for`
        self.ids_by_text.entry(Arc::clone(&arc)).or_insert(sid);
        self.symbols_by_id.push(Symbol::shared(arc));
        sid
    }

    /// Appends a slot whose text is undefined, as produced by a null or non-string entry in
    /// a local symbol table's `symbols` list. The slot still consumes a SID.
    pub fn add_placeholder(&mut self) -> SymbolId {
        let sid = self.symbols_by_id.len();
        self.symbols_by_id.push(Symbol::unknown_text());
        sid
    }

    /// Appends every slot of the provided shared table, padding or truncating to
    /// `declared_max_id` when the import declared one. Slots with no known text record the
    /// import source so that the symbol's identity survives.
    pub fn add_import(
        &mut self,
        table: &SharedSymbolTable,
        declared_max_id: Option<usize>,
    ) -> &mut Self {
        let slot_count = declared_max_id.unwrap_or_else(|| table.max_id());
        for position in 1..=slot_count {
            match table.text_arc_for(position) {
                Some(text) => {
                    self.add_symbol(text);
                }
                None => {
                    // Either the table's own slot has no text or we're padding past its end
                    let source = ImportSource::new(table.name_arc(), table.version(), position);
                    let sid = self.symbols_by_id.len();
                    self.symbols_by_id
                        .push(Symbol::unknown_text().with_source(source));
                    debug_assert_eq!(sid + 1, self.symbols_by_id.len());
                }
            }
        }
        self
    }

    /// Appends slots for an import that could not be resolved through the catalog. All
    /// `max_id` slots have undefined text but remember their source.
    pub fn add_placeholder_import(
        &mut self,
        name: &str,
        version: u32,
        max_id: usize,
    ) -> &mut Self {
        let name: Arc<str> = Arc::from(name);
        for position in 1..=max_id {
            let source = ImportSource::new(Arc::clone(&name), version, position);
            self.symbols_by_id
                .push(Symbol::unknown_text().with_source(source));
        }
        self
    }

    /// If the text is already in the symbol table, returns the ID associated with it.
    /// Otherwise, adds it and returns the new ID. This is the writer-side entry point.
    pub fn intern<T: Into<Arc<str>>>(&mut self, text: T) -> SymbolId {
        let arc: Arc<str> = text.into();
        if let Some(sid) = self.ids_by_text.get(arc.as_ref()) {
            return *sid;
        }
        self.add_symbol(arc)
    }

    /// Returns the smallest SID associated with the given text, if any.
    pub fn sid_for<A: AsRef<str>>(&self, text: &A) -> Option<SymbolId> {
        self.ids_by_text.get(text.as_ref()).copied()
    }

    /// Returns the text associated with the given SID, if the SID is in range and its slot
    /// has known text.
    pub fn text_for(&self, sid: SymbolId) -> Option<&str> {
        self.symbols_by_id.get(sid).and_then(|symbol| symbol.text())
    }

    /// Resolves a SID into a [Symbol]. SID 0, out-of-range SIDs, and slots with undefined
    /// text all produce symbols with no text; the SID is preserved in the returned symbol.
    pub fn resolve(&self, sid: SymbolId) -> Symbol {
        match self.symbols_by_id.get(sid) {
            Some(symbol) => symbol.clone().with_local_sid(sid),
            None => Symbol::unknown_text().with_local_sid(sid),
        }
    }

    /// Returns true if `sid` maps to a slot in this table. Note that an in-range SID can
    /// still have undefined text.
    pub fn sid_is_valid(&self, sid: SymbolId) -> bool {
        sid < self.symbols_by_id.len()
    }

    /// Every symbol in the table in SID order, beginning with `$0`.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols_by_id
    }

    /// The symbols with SIDs greater than or equal to `start`, in SID order. Writers use
    /// this to assemble the `symbols` list of an appending local symbol table.
    pub fn symbols_tail(&self, start: usize) -> &[Symbol] {
        &self.symbols_by_id[start..]
    }

    /// The highest SID defined by this table.
    pub fn max_id(&self) -> SymbolId {
        self.symbols_by_id.len() - 1
    }

    /// The total number of slots, including `$0`.
    pub fn len(&self) -> usize {
        self.symbols_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        false // the system symbols are always present
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

#[cfg(test)]
mod symbol_table_tests {
    use super::*;

    fn shared_table(name: &str, version: u32, symbols: &[&str]) -> SharedSymbolTable {
        SharedSymbolTable::new(
            name,
            version,
            symbols.iter().map(|s| Some(s.to_string())).collect(),
        )
        .unwrap()
    }

    #[test]
    fn system_symbols_occupy_1_through_9() {
        let table = SymbolTable::new();
        assert_eq!(table.max_id(), 9);
        assert_eq!(table.text_for(1), Some("$ion"));
        assert_eq!(table.text_for(3), Some("$ion_symbol_table"));
        assert_eq!(table.text_for(9), Some("$ion_shared_symbol_table"));
        assert_eq!(table.text_for(0), None);
        assert_eq!(table.sid_for(&"name"), Some(4));
    }

    #[test]
    fn local_symbols_start_at_10() {
        let mut table = SymbolTable::new();
        assert_eq!(table.add_symbol("foo"), 10);
        assert_eq!(table.add_symbol("bar"), 11);
        assert_eq!(table.text_for(10), Some("foo"));
    }

    #[test]
    fn first_sid_wins_for_repeated_text() {
        let mut table = SymbolTable::new();
        let first = table.add_symbol("foo");
        let second = table.add_symbol("foo");
        assert_ne!(first, second);
        // Both slots exist, but lookups by text find the earliest
        assert_eq!(table.sid_for(&"foo"), Some(first));
        assert_eq!(table.text_for(second), Some("foo"));
        // Interning also reuses the earliest
        assert_eq!(table.intern("foo"), first);
    }

    #[test]
    fn imports_occupy_contiguous_blocks() {
        let mut table = SymbolTable::new();
        table.add_import(&shared_table("a", 1, &["a1", "a2"]), None);
        table.add_import(&shared_table("b", 1, &["b1"]), None);
        table.add_symbol("local");
        assert_eq!(table.text_for(10), Some("a1"));
        assert_eq!(table.text_for(11), Some("a2"));
        assert_eq!(table.text_for(12), Some("b1"));
        assert_eq!(table.text_for(13), Some("local"));
        assert_eq!(table.max_id(), 13);
    }

    #[test]
    fn imports_pad_and_truncate_to_declared_max_id() {
        let shared = shared_table("t", 1, &["one", "two", "three"]);

        let mut padded = SymbolTable::new();
        padded.add_import(&shared, Some(5));
        assert_eq!(padded.text_for(12), Some("three"));
        // Slots 13 and 14 are padding with a recorded source
        assert_eq!(padded.text_for(13), None);
        let symbol = padded.resolve(14);
        assert_eq!(symbol.source().unwrap().table(), "t");
        assert_eq!(symbol.source().unwrap().sid(), 5);
        assert_eq!(padded.max_id(), 14);

        let mut truncated = SymbolTable::new();
        truncated.add_import(&shared, Some(1));
        assert_eq!(truncated.text_for(10), Some("one"));
        assert_eq!(truncated.max_id(), 10);
    }

    #[test]
    fn unresolved_imports_keep_their_identity() {
        let mut table = SymbolTable::new();
        table.add_placeholder_import("com.example.missing", 3, 2);
        let symbol = table.resolve(11);
        assert_eq!(symbol.text(), None);
        let source = symbol.source().unwrap();
        assert_eq!(source.table(), "com.example.missing");
        assert_eq!(source.version(), 3);
        assert_eq!(source.sid(), 2);
    }

    #[test]
    fn out_of_range_sids_resolve_to_unknown_text() {
        let table = SymbolTable::new();
        let symbol = table.resolve(500);
        assert_eq!(symbol.text(), None);
        assert_eq!(symbol.local_sid(), Some(500));
        assert!(!table.sid_is_valid(500));
    }

    #[test]
    fn reset_discards_local_symbols() {
        let mut table = SymbolTable::new();
        table.add_symbol("foo");
        table.reset();
        assert_eq!(table.max_id(), 9);
        assert_eq!(table.sid_for(&"foo"), None);
    }

    #[test]
    fn shared_table_equality_ignores_contents() {
        let a = shared_table("t", 1, &["x"]);
        let b = shared_table("t", 1, &["y", "z"]);
        let c = shared_table("t", 2, &["x"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn shared_table_validation() {
        assert!(SharedSymbolTable::new("", 1, vec![]).is_err());
        assert!(SharedSymbolTable::new("t", 0, vec![]).is_err());
    }
}
