use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::types::SymbolId;

/// Identifies the shared symbol table slot from which a symbol with undefined text was
/// imported. Preserving the source allows such a symbol to be re-exported or compared even
/// though its text cannot be known without the shared table itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImportSource {
    table: Arc<str>,
    version: u32,
    sid: SymbolId,
}

impl ImportSource {
    pub fn new(table: Arc<str>, version: u32, sid: SymbolId) -> Self {
        ImportSource {
            table,
            version,
            sid,
        }
    }

    /// The name of the shared symbol table this symbol was imported from.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// The symbol's position within the shared table.
    pub fn sid(&self) -> SymbolId {
        self.sid
    }
}

/// The text of a [Symbol]. Symbol table lookups hand out `Arc<str>` references so that
/// resolving a symbol does not copy its text; symbols read inline from the stream own
/// their text directly.
#[derive(Debug, Clone)]
pub(crate) enum SymbolText {
    // This symbol's text was found in the symbol table
    Shared(Arc<str>),
    // This symbol's text was found inline in the input stream
    Owned(String),
    // This symbol has no known text; it is equivalent to `$0` unless an import source says
    // otherwise
    Unknown,
}

impl SymbolText {
    fn text(&self) -> Option<&str> {
        match self {
            SymbolText::Shared(s) => Some(s.as_ref()),
            SymbolText::Owned(s) => Some(s.as_str()),
            SymbolText::Unknown => None,
        }
    }
}

/// A fully resolved symbol token: optional text, an optional local symbol ID, and an
/// optional import source.
///
/// Comparison is text-first. Two symbols with known text are equal iff their text is equal;
/// a symbol with known text is never equal to one without; two symbols with unknown text
/// are compared by their import sources (two `$0`s are equal). The local symbol ID is
/// bookkeeping for the stream the symbol was read from and never participates in equality
/// or hashing.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub(crate) text: SymbolText,
    pub(crate) local_sid: Option<SymbolId>,
    pub(crate) source: Option<ImportSource>,
}

impl Symbol {
    pub fn owned<T: Into<String>>(text: T) -> Symbol {
        Symbol {
            text: SymbolText::Owned(text.into()),
            local_sid: None,
            source: None,
        }
    }

    pub(crate) fn shared(text: Arc<str>) -> Symbol {
        Symbol {
            text: SymbolText::Shared(text),
            local_sid: None,
            source: None,
        }
    }

    /// Constructs a symbol with undefined text, i.e. `$0`.
    pub fn unknown_text() -> Symbol {
        Symbol {
            text: SymbolText::Unknown,
            local_sid: None,
            source: None,
        }
    }

    pub(crate) fn with_local_sid(mut self, local_sid: SymbolId) -> Symbol {
        self.local_sid = Some(local_sid);
        self
    }

    pub(crate) fn with_source(mut self, source: ImportSource) -> Symbol {
        self.source = Some(source);
        self
    }

    /// If this symbol has known text, returns `Some(&str)`. Otherwise, returns `None`.
    pub fn text(&self) -> Option<&str> {
        self.text.text()
    }

    /// The symbol ID this symbol had in the stream it was read from, if any.
    pub fn local_sid(&self) -> Option<SymbolId> {
        self.local_sid
    }

    /// The shared-table slot this symbol was imported from, if its text is undefined.
    pub fn source(&self) -> Option<&ImportSource> {
        self.source.as_ref()
    }

    /// Returns the symbol's text or a panic-free placeholder for debugging output.
    pub fn text_or_unknown(&self) -> &str {
        self.text().unwrap_or("$0")
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Symbol {}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.text(), other.text()) {
            // If both symbols have known text, delegate the comparison to their text.
            (Some(s1), Some(s2)) => s1.cmp(s2),
            // Otherwise, unknown text is treated as 'less than' known text
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            // Neither has text; compare their import sources. Symbols with no source ($0)
            // sort ahead of symbols imported from a shared table.
            (None, None) => self.source.cmp(&other.source),
        }
    }
}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text().hash(state);
        if self.text().is_none() {
            self.source.hash(state);
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text() {
            Some(text) => write!(f, "{text}"),
            None => match (&self.source, self.local_sid) {
                (Some(source), _) => {
                    write!(f, "{}#{}", source.table(), source.sid())
                }
                (None, Some(sid)) => write!(f, "${sid}"),
                (None, None) => write!(f, "$0"),
            },
        }
    }
}

impl<T: Into<String>> From<T> for Symbol {
    fn from(text: T) -> Self {
        Symbol::owned(text.into())
    }
}

// Allows a HashMap<Symbol, _> to do lookups with a &str. Note that this panics if the
// Symbol has unknown text; maps keyed on potentially-unknown symbols should not use it.
impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        self.text()
            .expect("cannot borrow a &str from a Symbol with unknown text")
    }
}
