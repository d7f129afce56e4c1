use crate::types::SymbolId;

/// A symbol token encountered in a text or binary Ion stream.
/// [RawSymbolToken]s do not store import source information for the token encountered. Similarly,
/// a [RawSymbolToken] cannot store both a symbol ID _and_ text, which means that it is not suitable
/// for representing a resolved symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSymbolToken {
    SymbolId(SymbolId),
    Text(String),
}

impl RawSymbolToken {
    /// Returns `true` if this token is the given symbol ID or its text matches the given
    /// string. System-level constructs (like the `$ion_symbol_table` annotation) can be
    /// spelled either way in the text encoding, so both must be checked.
    pub fn matches(&self, sid: SymbolId, text: &str) -> bool {
        match self {
            RawSymbolToken::SymbolId(s) => *s == sid,
            RawSymbolToken::Text(t) => t == text,
        }
    }

    pub fn local_sid(&self) -> Option<SymbolId> {
        match self {
            RawSymbolToken::SymbolId(s) => Some(*s),
            RawSymbolToken::Text(_t) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            RawSymbolToken::SymbolId(_s) => None,
            RawSymbolToken::Text(t) => Some(t.as_str()),
        }
    }
}

impl From<SymbolId> for RawSymbolToken {
    fn from(symbol_id: SymbolId) -> Self {
        RawSymbolToken::SymbolId(symbol_id)
    }
}

impl From<String> for RawSymbolToken {
    fn from(text: String) -> Self {
        RawSymbolToken::Text(text)
    }
}

impl From<&str> for RawSymbolToken {
    fn from(text: &str) -> Self {
        RawSymbolToken::Text(text.to_string())
    }
}

impl<T> From<&T> for RawSymbolToken
where
    T: Clone + Into<RawSymbolToken>,
{
    fn from(value: &T) -> Self {
        value.clone().into()
    }
}

/// A convenience method for constructing a [RawSymbolToken] with the provided text.
pub fn text_token<S: Into<String>>(text: S) -> RawSymbolToken {
    RawSymbolToken::Text(text.into())
}

/// A convenience method for constructing a [RawSymbolToken] with the provided symbol ID.
pub fn local_sid_token(sid: SymbolId) -> RawSymbolToken {
    RawSymbolToken::SymbolId(sid)
}

#[cfg(test)]
mod raw_symbol_token_tests {
    use super::*;
    use crate::constants::v1_0::system_symbol_ids;

    #[test]
    fn matches_either_spelling() {
        let by_sid = local_sid_token(system_symbol_ids::ION_SYMBOL_TABLE);
        let by_text = text_token("$ion_symbol_table");
        assert!(by_sid.matches(3, "$ion_symbol_table"));
        assert!(by_text.matches(3, "$ion_symbol_table"));
        assert!(!by_sid.matches(4, "$ion_symbol_table"));
        assert!(!by_text.matches(3, "name"));
    }

    #[test]
    fn accessors_are_mutually_exclusive() {
        assert_eq!(local_sid_token(10).local_sid(), Some(10));
        assert_eq!(local_sid_token(10).text(), None);
        assert_eq!(text_token("foo").text(), Some("foo"));
        assert_eq!(text_token("foo").local_sid(), None);
    }
}
