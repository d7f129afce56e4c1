use crate::raw_symbol_token::RawSymbolToken;
use crate::symbol::Symbol;
use crate::types::SymbolId;

/// Like RawSymbolToken, but the Text variant holds a borrowed reference instead of a String.
#[derive(Debug, PartialEq, Eq)]
pub enum RawSymbolTokenRef<'a> {
    SymbolId(SymbolId),
    Text(&'a str),
}

impl<'a> RawSymbolTokenRef<'a> {
    pub fn text(&self) -> Option<&str> {
        match self {
            RawSymbolTokenRef::SymbolId(_) => None,
            RawSymbolTokenRef::Text(t) => Some(t),
        }
    }

    pub fn to_owned(&self) -> RawSymbolToken {
        match self {
            RawSymbolTokenRef::SymbolId(sid) => RawSymbolToken::SymbolId(*sid),
            RawSymbolTokenRef::Text(text) => RawSymbolToken::Text(text.to_string()),
        }
    }
}

// Raw symbol tokens are not resolved, so we compare them structurally. This means that even in
// cases where the resolved tokens would be equal (`$7` == "symbols"), `eq` returns false.
impl<'a> PartialEq<RawSymbolToken> for RawSymbolTokenRef<'a> {
    fn eq(&self, other: &RawSymbolToken) -> bool {
        match (self, other) {
            (RawSymbolTokenRef::Text(t1), RawSymbolToken::Text(t2)) => t1 == t2,
            (RawSymbolTokenRef::SymbolId(sid1), RawSymbolToken::SymbolId(sid2)) => sid1 == sid2,
            _ => false,
        }
    }
}

/// Implemented by types that can be viewed as a [RawSymbolTokenRef] without allocations.
/// This is the bound used by the writer APIs, allowing applications to pass a `&str`,
/// `String`, `SymbolId`, or resolved [Symbol] anywhere a symbol token is expected.
pub trait AsRawSymbolTokenRef {
    fn as_raw_symbol_token_ref(&self) -> RawSymbolTokenRef;
}

impl<'a> AsRawSymbolTokenRef for RawSymbolTokenRef<'a> {
    fn as_raw_symbol_token_ref(&self) -> RawSymbolTokenRef {
        match self {
            RawSymbolTokenRef::SymbolId(sid) => RawSymbolTokenRef::SymbolId(*sid),
            RawSymbolTokenRef::Text(text) => RawSymbolTokenRef::Text(text),
        }
    }
}

impl AsRawSymbolTokenRef for SymbolId {
    fn as_raw_symbol_token_ref(&self) -> RawSymbolTokenRef {
        RawSymbolTokenRef::SymbolId(*self)
    }
}

impl AsRawSymbolTokenRef for String {
    fn as_raw_symbol_token_ref(&self) -> RawSymbolTokenRef {
        RawSymbolTokenRef::Text(self.as_str())
    }
}

impl AsRawSymbolTokenRef for &str {
    fn as_raw_symbol_token_ref(&self) -> RawSymbolTokenRef {
        RawSymbolTokenRef::Text(self)
    }
}

impl AsRawSymbolTokenRef for Symbol {
    fn as_raw_symbol_token_ref(&self) -> RawSymbolTokenRef {
        match self.text() {
            Some(text) => RawSymbolTokenRef::Text(text),
            None => RawSymbolTokenRef::SymbolId(0),
        }
    }
}

impl AsRawSymbolTokenRef for RawSymbolToken {
    fn as_raw_symbol_token_ref(&self) -> RawSymbolTokenRef {
        match self {
            RawSymbolToken::SymbolId(sid) => RawSymbolTokenRef::SymbolId(*sid),
            RawSymbolToken::Text(text) => RawSymbolTokenRef::Text(text.as_str()),
        }
    }
}

impl<T> AsRawSymbolTokenRef for &T
where
    T: AsRawSymbolTokenRef,
{
    fn as_raw_symbol_token_ref(&self) -> RawSymbolTokenRef {
        (*self).as_raw_symbol_token_ref()
    }
}
