use std::io::BufRead;

use crate::raw_reader::{RawReader, RawStreamItem};
use crate::raw_symbol_token::RawSymbolToken;
use crate::result::{
    illegal_operation, illegal_operation_raw, syntax_error, unsupported_version_error, IonError,
    IonResult,
};
use crate::text::tokenizer::{Token, Tokenizer};
use crate::types::decimal::Decimal;
use crate::types::integer::Int;
use crate::types::timestamp::Timestamp;
use crate::types::IonType;

/// A scalar value or container opening parsed from the token stream, together with any
/// annotations that preceded it.
#[derive(Debug, Clone, PartialEq)]
enum TextValue {
    Null(IonType),
    Bool(bool),
    Int(Int),
    Float(f64),
    Decimal(Decimal),
    Timestamp(Timestamp),
    Symbol(RawSymbolToken),
    String(String),
    Clob(Vec<u8>),
    Blob(Vec<u8>),
    ListStart,
    SExpStart,
    StructStart,
}

impl TextValue {
    fn ion_type(&self) -> IonType {
        match self {
            TextValue::Null(ion_type) => *ion_type,
            TextValue::Bool(_) => IonType::Bool,
            TextValue::Int(_) => IonType::Int,
            TextValue::Float(_) => IonType::Float,
            TextValue::Decimal(_) => IonType::Decimal,
            TextValue::Timestamp(_) => IonType::Timestamp,
            TextValue::Symbol(_) => IonType::Symbol,
            TextValue::String(_) => IonType::String,
            TextValue::Clob(_) => IonType::Clob,
            TextValue::Blob(_) => IonType::Blob,
            TextValue::ListStart => IonType::List,
            TextValue::SExpStart => IonType::SExp,
            TextValue::StructStart => IonType::Struct,
        }
    }
}

/// One level of the reader's container stack.
#[derive(Debug, Clone)]
struct ParentContainer {
    ion_type: IonType,
    // Whether the container's closing delimiter has been seen
    is_exhausted: bool,
    // Whether the value just parsed must be followed by a separator (or the closing
    // delimiter) before another value is legal
    needs_separator: bool,
}

impl ParentContainer {
    fn new(ion_type: IonType) -> ParentContainer {
        ParentContainer {
            ion_type,
            is_exhausted: false,
            needs_separator: false,
        }
    }
}

/// A raw cursor over a text Ion 1.0 stream, implemented as a state machine over the
/// tokenizer. The reader looks at most one token ahead, and only to distinguish an
/// annotation (`foo ::`) from a symbol value (`foo`).
pub struct RawTextReader<R: BufRead> {
    tokenizer: Tokenizer<R>,
    // A single token of pushback
    pushback: Option<Token>,
    parents: Vec<ParentContainer>,
    current_value: Option<TextValue>,
    current_item: RawStreamItem,
    annotation_tokens: Vec<RawSymbolToken>,
    field_name_token: Option<RawSymbolToken>,
    is_eof: bool,
    ion_version: (u8, u8),
    fatal_error: Option<IonError>,
}

/// `null`, `true`, `false`, and `nan` read as their literal values when unquoted; they
/// cannot be used as unquoted annotations or field names.
fn is_keyword(text: &str) -> bool {
    matches!(text, "null" | "true" | "false" | "nan")
}

/// If `text` looks like an Ion version marker symbol (`$ion_N_M`), returns the version.
fn as_version_marker(text: &str) -> Option<(u8, u8)> {
    let versions = text.strip_prefix("$ion_")?;
    let (major, minor) = versions.split_once('_')?;
    if major.is_empty() || minor.is_empty() {
        return None;
    }
    if !major.bytes().all(|b| b.is_ascii_digit()) || !minor.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((major.parse().ok()?, minor.parse().ok()?))
}

impl<R: BufRead> RawTextReader<R> {
    pub fn new(source: R) -> RawTextReader<R> {
        RawTextReader {
            tokenizer: Tokenizer::new(source),
            pushback: None,
            parents: Vec::new(),
            current_value: None,
            current_item: RawStreamItem::Nothing,
            annotation_tokens: Vec::new(),
            field_name_token: None,
            is_eof: false,
            ion_version: (1, 0),
            fatal_error: None,
        }
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

    fn in_sexp(&self) -> bool {
        self.parents
            .last()
            .map(|parent| parent.ion_type == IonType::SExp)
            .unwrap_or(false)
    }

    fn next_token(&mut self) -> IonResult<Token> {
        if let Some(token) = self.pushback.take() {
            return Ok(token);
        }
        let in_sexp = self.in_sexp();
        self.tokenizer.next_token(in_sexp)
    }

    fn unread_token(&mut self, token: Token) {
        debug_assert!(self.pushback.is_none());
        self.pushback = Some(token);
    }

    fn offset(&self) -> usize {
        self.tokenizer.offset()
    }

    fn next_impl(&mut self) -> IonResult<RawStreamItem> {
        // Calling next() while positioned on an unentered container skips the container
        if matches!(
            self.current_value,
            Some(TextValue::ListStart) | Some(TextValue::SExpStart) | Some(TextValue::StructStart)
        ) {
            self.step_in_impl()?;
            self.step_out_impl()?;
        }
        self.current_value = None;
        self.current_item = RawStreamItem::Nothing;
        self.field_name_token = None;
        self.annotation_tokens.clear();

        if self.parents.is_empty() {
            return self.next_top_level();
        }

        let parent = self
            .parents
            .last()
            .cloned()
            .expect("parents stack cannot be empty here");
        if parent.is_exhausted {
            return Ok(RawStreamItem::Nothing);
        }
        match parent.ion_type {
            IonType::List => self.next_list_value(parent.needs_separator),
            IonType::SExp => self.next_sexp_value(),
            IonType::Struct => self.next_struct_field(parent.needs_separator),
            scalar => unreachable!("the parents stack contained a scalar value: {scalar}"),
        }
    }

    fn next_top_level(&mut self) -> IonResult<RawStreamItem> {
        if self.is_eof {
            return Ok(RawStreamItem::Nothing);
        }
        let token = self.next_token()?;
        if token == Token::Eof {
            self.is_eof = true;
            return Ok(RawStreamItem::Nothing);
        }

        // An unannotated, unquoted `$ion_N_M` symbol at the top level is a version marker
        if let Token::Symbol(text) = &token {
            if let Some((major, minor)) = as_version_marker(text) {
                if !self.at_annotation_boundary()? {
                    if (major, minor) != (1, 0) {
                        return unsupported_version_error(major, minor, self.offset());
                    }
                    self.ion_version = (major, minor);
                    self.current_item = RawStreamItem::VersionMarker(major, minor);
                    return Ok(self.current_item);
                }
            }
        }

        let value = self.parse_annotated_value(token)?;
        self.set_current_value(value);
        Ok(self.current_item)
    }

    /// Returns `true` if the next token is `::`, without consuming it. Used to decide
    /// whether a `$ion_1_0` symbol is a version marker or an annotation.
    fn at_annotation_boundary(&mut self) -> IonResult<bool> {
        let next = self.next_token()?;
        let is_double_colon = next == Token::DoubleColon;
        self.unread_token(next);
        Ok(is_double_colon)
    }

    fn next_list_value(&mut self, needs_separator: bool) -> IonResult<RawStreamItem> {
        if needs_separator {
            match self.next_token()? {
                Token::Comma => {}
                Token::CloseBracket => return self.end_container(),
                other => {
                    return syntax_error(
                        format!("expected ',' or ']' in list, found {other}"),
                        self.offset(),
                    );
                }
            }
        }
        let token = self.next_token()?;
        if token == Token::CloseBracket {
            return self.end_container();
        }
        let value = self.parse_annotated_value(token)?;
        self.set_current_value(value);
        Ok(self.current_item)
    }

    fn next_sexp_value(&mut self) -> IonResult<RawStreamItem> {
        let token = self.next_token()?;
        if token == Token::CloseParen {
            return self.end_container();
        }
        let value = self.parse_annotated_value(token)?;
        self.set_current_value(value);
        Ok(self.current_item)
    }

    fn next_struct_field(&mut self, needs_separator: bool) -> IonResult<RawStreamItem> {
        if needs_separator {
            match self.next_token()? {
                Token::Comma => {}
                Token::CloseBrace => return self.end_container(),
                other => {
                    return syntax_error(
                        format!("expected ',' or '}}' in struct, found {other}"),
                        self.offset(),
                    );
                }
            }
        }
        let field_name = match self.next_token()? {
            Token::CloseBrace => return self.end_container(),
            Token::Symbol(text) => {
                if is_keyword(&text) {
                    return syntax_error(
                        format!("'{text}' cannot be used as an unquoted field name"),
                        self.offset(),
                    );
                }
                RawSymbolToken::Text(text)
            }
            Token::QuotedSymbol(text) | Token::String(text) => RawSymbolToken::Text(text),
            Token::SymbolId(sid) => RawSymbolToken::SymbolId(sid),
            other => {
                return syntax_error(
                    format!("expected a field name or '}}' in struct, found {other}"),
                    self.offset(),
                );
            }
        };
        match self.next_token()? {
            Token::Colon => {}
            Token::DoubleColon => {
                return syntax_error("field names cannot have annotations", self.offset());
            }
            other => {
                return syntax_error(
                    format!("expected ':' after a field name, found {other}"),
                    self.offset(),
                );
            }
        }
        self.field_name_token = Some(field_name);
        let token = self.next_token()?;
        let value = self.parse_annotated_value(token)?;
        self.set_current_value(value);
        Ok(self.current_item)
    }

    fn end_container(&mut self) -> IonResult<RawStreamItem> {
        if let Some(parent) = self.parents.last_mut() {
            parent.is_exhausted = true;
        }
        Ok(RawStreamItem::Nothing)
    }

    fn set_current_value(&mut self, value: TextValue) {
        let ion_type = value.ion_type();
        let is_null = matches!(value, TextValue::Null(_));
        self.current_item = RawStreamItem::nullable_value(ion_type, is_null);
        self.current_value = Some(value);
        if let Some(parent) = self.parents.last_mut() {
            parent.needs_separator = true;
        }
    }

    /// Parses a chain of zero or more annotations followed by a value, beginning with the
    /// already-consumed `token`.
    fn parse_annotated_value(&mut self, mut token: Token) -> IonResult<TextValue> {
        loop {
            token = match token {
                Token::Symbol(text) => {
                    if self.at_annotation_boundary()? {
                        self.next_token()?; // consume the '::'
                        if is_keyword(&text) {
                            return syntax_error(
                                format!("'{text}' cannot be used as an annotation"),
                                self.offset(),
                            );
                        }
                        self.annotation_tokens.push(RawSymbolToken::Text(text));
                        self.next_token()?
                    } else {
                        return Ok(self.symbol_or_keyword_value(text));
                    }
                }
                Token::QuotedSymbol(text) => {
                    if self.at_annotation_boundary()? {
                        self.next_token()?;
                        self.annotation_tokens.push(RawSymbolToken::Text(text));
                        self.next_token()?
                    } else {
                        return Ok(TextValue::Symbol(RawSymbolToken::Text(text)));
                    }
                }
                Token::SymbolId(sid) => {
                    if self.at_annotation_boundary()? {
                        self.next_token()?;
                        self.annotation_tokens.push(RawSymbolToken::SymbolId(sid));
                        self.next_token()?
                    } else {
                        return Ok(TextValue::Symbol(RawSymbolToken::SymbolId(sid)));
                    }
                }
                Token::Operator(text) => {
                    // The tokenizer only produces operators inside s-expressions
                    return Ok(TextValue::Symbol(RawSymbolToken::Text(text)));
                }
                Token::NullType(ion_type) => return Ok(TextValue::Null(ion_type)),
                Token::Int(value) => return Ok(TextValue::Int(value)),
                Token::Float(value) => return Ok(TextValue::Float(value)),
                Token::Decimal(value) => return Ok(TextValue::Decimal(value)),
                Token::Timestamp(value) => return Ok(TextValue::Timestamp(value)),
                Token::String(value) => return Ok(TextValue::String(value)),
                Token::Blob(value) => return Ok(TextValue::Blob(value)),
                Token::Clob(value) => return Ok(TextValue::Clob(value)),
                Token::OpenBracket => return Ok(TextValue::ListStart),
                Token::OpenParen => return Ok(TextValue::SExpStart),
                Token::OpenBrace => return Ok(TextValue::StructStart),
                Token::Eof => {
                    return syntax_error(
                        "unexpected end of input while expecting a value",
                        self.offset(),
                    );
                }
                other => {
                    return syntax_error(
                        format!("expected a value, found {other}"),
                        self.offset(),
                    );
                }
            };
        }
    }

    /// Converts unquoted symbol text into its value: keywords become their literal values,
    /// everything else is a symbol.
    fn symbol_or_keyword_value(&self, text: String) -> TextValue {
        match text.as_str() {
            "null" => TextValue::Null(IonType::Null),
            "true" => TextValue::Bool(true),
            "false" => TextValue::Bool(false),
            "nan" => TextValue::Float(f64::NAN),
            _ => TextValue::Symbol(RawSymbolToken::Text(text)),
        }
    }

    /// Confirms that the reader is positioned on a non-null value of the expected type and
    /// returns a reference to it.
    fn value_for_read(&self, ion_type: IonType, operation: &str) -> IonResult<&TextValue> {
        match self.current_item {
            RawStreamItem::Value(t) if t == ion_type => {}
            other => {
                return illegal_operation(format!(
                    "{operation} called when the reader was positioned on {other}"
                ));
            }
        }
        self.current_value
            .as_ref()
            .ok_or_else(|| illegal_operation_raw(format!("{operation} called with no current value")))
    }

    fn step_in_impl(&mut self) -> IonResult<()> {
        let container_type = match &self.current_value {
            Some(TextValue::ListStart) => IonType::List,
            Some(TextValue::SExpStart) => IonType::SExp,
            Some(TextValue::StructStart) => IonType::Struct,
            _ => {
                return illegal_operation(format!(
                    "step_in is only valid on a container; the reader was positioned on {}",
                    self.current_item
                ));
            }
        };
        self.parents.push(ParentContainer::new(container_type));
        self.current_value = None;
        self.current_item = RawStreamItem::Nothing;
        self.field_name_token = None;
        self.annotation_tokens.clear();
        Ok(())
    }

    fn step_out_impl(&mut self) -> IonResult<()> {
        if self.parents.is_empty() {
            return illegal_operation("cannot step out when the reader is at the top level");
        }
        // Drain the remainder of the container at the token level. Unlike the binary
        // reader, which can skip-scan using declared lengths, the text reader must visit
        // every value between its position and the closing delimiter.
        while !self
            .parents
            .last()
            .map(|parent| parent.is_exhausted)
            .unwrap_or(true)
        {
            let item = self.next_impl()?;
            if item == RawStreamItem::Nothing {
                break;
            }
        }
        self.parents.pop();
        self.current_value = None;
        self.current_item = RawStreamItem::Nothing;
        self.field_name_token = None;
        self.annotation_tokens.clear();
        Ok(())
    }
}

impl<R: BufRead> RawReader for RawTextReader<R> {
    fn ion_version(&self) -> (u8, u8) {
        self.ion_version
    }

    fn next(&mut self) -> IonResult<RawStreamItem> {
        self.check_failed()?;
        let result = self.next_impl();
        self.record_failure(result)
    }

    fn current(&self) -> RawStreamItem {
        self.current_item
    }

    fn ion_type(&self) -> Option<IonType> {
        match self.current_item {
            RawStreamItem::Value(ion_type) | RawStreamItem::Null(ion_type) => Some(ion_type),
            _ => None,
        }
    }

    fn is_null(&self) -> bool {
        matches!(self.current_item, RawStreamItem::Null(_))
    }

    fn annotations(&self) -> &[RawSymbolToken] {
        &self.annotation_tokens
    }

    fn field_name(&self) -> Option<&RawSymbolToken> {
        self.field_name_token.as_ref()
    }

    fn read_null(&mut self) -> IonResult<IonType> {
        match self.current_item {
            RawStreamItem::Null(ion_type) => Ok(ion_type),
            other => illegal_operation(format!(
                "read_null called when the reader was positioned on {other}"
            )),
        }
    }

    fn read_bool(&mut self) -> IonResult<bool> {
        match self.value_for_read(IonType::Bool, "read_bool")? {
            TextValue::Bool(value) => Ok(*value),
            _ => unreachable!("value_for_read validated the type"),
        }
    }

    fn read_i64(&mut self) -> IonResult<i64> {
        self.read_int().and_then(|int| {
            int.as_i64().ok_or_else(|| {
                illegal_operation_raw(
                    "the current int does not fit in an i64; use read_int instead",
                )
            })
        })
    }

    fn read_int(&mut self) -> IonResult<Int> {
        match self.value_for_read(IonType::Int, "read_int")? {
            TextValue::Int(value) => Ok(value.clone()),
            _ => unreachable!("value_for_read validated the type"),
        }
    }

    fn read_f32(&mut self) -> IonResult<f32> {
        self.read_f64().map(|f| f as f32)
    }

    fn read_f64(&mut self) -> IonResult<f64> {
        match self.value_for_read(IonType::Float, "read_f64")? {
            TextValue::Float(value) => Ok(*value),
            _ => unreachable!("value_for_read validated the type"),
        }
    }

    fn read_decimal(&mut self) -> IonResult<Decimal> {
        match self.value_for_read(IonType::Decimal, "read_decimal")? {
            TextValue::Decimal(value) => Ok(value.clone()),
            _ => unreachable!("value_for_read validated the type"),
        }
    }

    fn read_string(&mut self) -> IonResult<String> {
        match self.value_for_read(IonType::String, "read_string")? {
            TextValue::String(value) => Ok(value.clone()),
            _ => unreachable!("value_for_read validated the type"),
        }
    }

    fn read_symbol(&mut self) -> IonResult<RawSymbolToken> {
        match self.value_for_read(IonType::Symbol, "read_symbol")? {
            TextValue::Symbol(value) => Ok(value.clone()),
            _ => unreachable!("value_for_read validated the type"),
        }
    }

    fn read_blob(&mut self) -> IonResult<Vec<u8>> {
        match self.value_for_read(IonType::Blob, "read_blob")? {
            TextValue::Blob(value) => Ok(value.clone()),
            _ => unreachable!("value_for_read validated the type"),
        }
    }

    fn read_clob(&mut self) -> IonResult<Vec<u8>> {
        match self.value_for_read(IonType::Clob, "read_clob")? {
            TextValue::Clob(value) => Ok(value.clone()),
            _ => unreachable!("value_for_read validated the type"),
        }
    }

    fn read_timestamp(&mut self) -> IonResult<Timestamp> {
        match self.value_for_read(IonType::Timestamp, "read_timestamp")? {
            TextValue::Timestamp(value) => Ok(value.clone()),
            _ => unreachable!("value_for_read validated the type"),
        }
    }

    fn step_in(&mut self) -> IonResult<()> {
        self.check_failed()?;
        let result = self.step_in_impl();
        self.record_failure(result)
    }

    fn step_out(&mut self) -> IonResult<()> {
        self.check_failed()?;
        let result = self.step_out_impl();
        self.record_failure(result)
    }

    fn parent_type(&self) -> Option<IonType> {
        self.parents.last().map(|parent| parent.ion_type)
    }

    fn depth(&self) -> usize {
        self.parents.len()
    }
}

#[cfg(test)]
mod raw_text_reader_tests {
    use super::*;
    use crate::raw_symbol_token::{local_sid_token, text_token};
    use crate::RawStreamItem::*;
    use rstest::*;
    use std::io;

    fn reader_for(text: &str) -> RawTextReader<io::Cursor<Vec<u8>>> {
        RawTextReader::new(io::Cursor::new(text.as_bytes().to_vec()))
    }

    fn next_type(
        reader: &mut RawTextReader<io::Cursor<Vec<u8>>>,
        ion_type: IonType,
        is_null: bool,
    ) {
        assert_eq!(
            reader.next().unwrap(),
            RawStreamItem::nullable_value(ion_type, is_null)
        );
    }

    #[test]
    fn read_multiple_top_level_values() -> IonResult<()> {
        let ion_data = r#"
            null
            true
            5
            5e0
            5.5
            2021-09-25T
            foo
            "hello"
        "#;
        let reader = &mut reader_for(ion_data);
        next_type(reader, IonType::Null, true);

        next_type(reader, IonType::Bool, false);
        assert!(reader.read_bool()?);

        next_type(reader, IonType::Int, false);
        assert_eq!(reader.read_i64()?, 5);

        next_type(reader, IonType::Float, false);
        assert_eq!(reader.read_f64()?, 5.0);

        next_type(reader, IonType::Decimal, false);
        assert_eq!(reader.read_decimal()?, Decimal::new(55, -1));

        next_type(reader, IonType::Timestamp, false);
        assert_eq!(
            reader.read_timestamp()?,
            Timestamp::with_ymd(2021, 9, 25).build()?
        );

        next_type(reader, IonType::Symbol, false);
        assert_eq!(reader.read_symbol()?, text_token("foo"));

        next_type(reader, IonType::String, false);
        assert_eq!(reader.read_string()?, "hello");

        assert_eq!(reader.next()?, Nothing);
        assert_eq!(reader.next()?, Nothing);
        Ok(())
    }

    #[test]
    fn typed_nulls() -> IonResult<()> {
        let reader = &mut reader_for("null.string null.list");
        next_type(reader, IonType::String, true);
        assert_eq!(reader.read_null()?, IonType::String);
        next_type(reader, IonType::List, true);
        // Stepping into a null container is illegal
        assert!(reader.step_in().is_err());
        Ok(())
    }

    #[test]
    fn annotations_are_surfaced_in_order() -> IonResult<()> {
        let reader = &mut reader_for("mercury::venus::5 $17::'earth'::true");
        next_type(reader, IonType::Int, false);
        assert_eq!(
            reader.annotations(),
            &[text_token("mercury"), text_token("venus")]
        );
        assert_eq!(reader.read_i64()?, 5);
        next_type(reader, IonType::Bool, false);
        assert_eq!(
            reader.annotations(),
            &[local_sid_token(17), text_token("earth")]
        );
        Ok(())
    }

    #[test]
    fn keywords_cannot_be_annotations() {
        let reader = &mut reader_for("true::5");
        assert!(matches!(
            reader.next(),
            Err(IonError::SyntaxError { .. })
        ));
    }

    #[test]
    fn quoted_keywords_are_ordinary_symbols() -> IonResult<()> {
        let reader = &mut reader_for("'null'::5 'true'");
        next_type(reader, IonType::Int, false);
        assert_eq!(reader.annotations(), &[text_token("null")]);
        next_type(reader, IonType::Symbol, false);
        assert_eq!(reader.read_symbol()?, text_token("true"));
        Ok(())
    }

    #[test]
    fn structs_with_string_and_empty_field_names() -> IonResult<()> {
        let reader = &mut reader_for(r#"{foo: bar::baz, "":42}"#);
        next_type(reader, IonType::Struct, false);
        reader.step_in()?;

        next_type(reader, IonType::Symbol, false);
        assert_eq!(reader.field_name(), Some(&text_token("foo")));
        assert_eq!(reader.annotations(), &[text_token("bar")]);
        assert_eq!(reader.read_symbol()?, text_token("baz"));

        next_type(reader, IonType::Int, false);
        assert_eq!(reader.field_name(), Some(&text_token("")));
        assert_eq!(reader.read_i64()?, 42);

        assert_eq!(reader.next()?, Nothing);
        reader.step_out()?;
        assert_eq!(reader.next()?, Nothing);
        Ok(())
    }

    #[test]
    fn duplicate_field_names_are_surfaced() -> IonResult<()> {
        let reader = &mut reader_for("{a: 1, a: 2}");
        reader.next()?;
        reader.step_in()?;
        next_type(reader, IonType::Int, false);
        assert_eq!(reader.field_name(), Some(&text_token("a")));
        assert_eq!(reader.read_i64()?, 1);
        next_type(reader, IonType::Int, false);
        assert_eq!(reader.field_name(), Some(&text_token("a")));
        assert_eq!(reader.read_i64()?, 2);
        Ok(())
    }

    #[test]
    fn field_names_cannot_have_annotations() {
        let reader = &mut reader_for("{foo::bar: 1}");
        reader.next().unwrap();
        reader.step_in().unwrap();
        let error = reader.next().unwrap_err();
        match error {
            IonError::SyntaxError { description, .. } => {
                assert!(description.contains("field names cannot have annotations"));
            }
            other => panic!("expected a syntax error, found {other:?}"),
        }
    }

    #[test]
    fn keywords_cannot_be_field_names() {
        let reader = &mut reader_for("{null: 1}");
        reader.next().unwrap();
        reader.step_in().unwrap();
        assert!(matches!(
            reader.next(),
            Err(IonError::SyntaxError { .. })
        ));
    }

    #[test]
    fn lists_require_commas() -> IonResult<()> {
        let reader = &mut reader_for("[1, 2] [3 4]");
        reader.next()?;
        reader.step_in()?;
        next_type(reader, IonType::Int, false);
        next_type(reader, IonType::Int, false);
        assert_eq!(reader.next()?, Nothing);
        reader.step_out()?;
        reader.next()?;
        reader.step_in()?;
        reader.next()?;
        assert!(matches!(
            reader.next(),
            Err(IonError::SyntaxError { .. })
        ));
        Ok(())
    }

    #[test]
    fn sexps_use_whitespace_separators() -> IonResult<()> {
        let reader = &mut reader_for("(1 + 2 foo)");
        next_type(reader, IonType::SExp, false);
        reader.step_in()?;
        next_type(reader, IonType::Int, false);
        assert_eq!(reader.read_i64()?, 1);
        next_type(reader, IonType::Symbol, false);
        assert_eq!(reader.read_symbol()?, text_token("+"));
        next_type(reader, IonType::Int, false);
        assert_eq!(reader.read_i64()?, 2);
        next_type(reader, IonType::Symbol, false);
        assert_eq!(reader.read_symbol()?, text_token("foo"));
        assert_eq!(reader.next()?, Nothing);
        reader.step_out()?;
        Ok(())
    }

    #[test]
    fn operator_only_sexp() -> IonResult<()> {
        let reader = &mut reader_for("(+)");
        next_type(reader, IonType::SExp, false);
        reader.step_in()?;
        next_type(reader, IonType::Symbol, false);
        assert_eq!(reader.read_symbol()?, text_token("+"));
        assert_eq!(reader.next()?, Nothing);
        reader.step_out()?;
        Ok(())
    }

    #[test]
    fn operators_outside_sexps_are_rejected() {
        let reader = &mut reader_for("+ ");
        assert!(matches!(
            reader.next(),
            Err(IonError::SyntaxError { .. })
        ));
    }

    #[test]
    fn commas_outside_containers_are_rejected() {
        let reader = &mut reader_for("1, 2");
        reader.next().unwrap();
        assert!(matches!(
            reader.next(),
            Err(IonError::SyntaxError { .. })
        ));
    }

    #[test]
    fn skipping_containers() -> IonResult<()> {
        let ion_data = "0 [1, 2, 3] (4 5) 6";
        let reader = &mut reader_for(ion_data);
        next_type(reader, IonType::Int, false);
        assert_eq!(reader.read_i64()?, 0);

        next_type(reader, IonType::List, false);
        reader.step_in()?;
        next_type(reader, IonType::Int, false);
        assert_eq!(reader.read_i64()?, 1);
        reader.step_out()?;
        // This should have skipped over the `2, 3` at the end of the list
        next_type(reader, IonType::SExp, false);
        // Don't step into the s-expression. Instead, skip over it.
        next_type(reader, IonType::Int, false);
        assert_eq!(reader.read_i64()?, 6);
        Ok(())
    }

    #[test]
    fn nested_containers() -> IonResult<()> {
        let reader = &mut reader_for("{a: [1, {b: 2}], c: (d)}");
        reader.next()?;
        reader.step_in()?;
        next_type(reader, IonType::List, false);
        assert_eq!(reader.field_name(), Some(&text_token("a")));
        reader.step_in()?;
        next_type(reader, IonType::Int, false);
        next_type(reader, IonType::Struct, false);
        reader.step_in()?;
        next_type(reader, IonType::Int, false);
        assert_eq!(reader.field_name(), Some(&text_token("b")));
        assert_eq!(reader.read_i64()?, 2);
        reader.step_out()?;
        assert_eq!(reader.next()?, Nothing);
        reader.step_out()?;
        next_type(reader, IonType::SExp, false);
        assert_eq!(reader.field_name(), Some(&text_token("c")));
        reader.step_out()?;
        assert_eq!(reader.next()?, Nothing);
        Ok(())
    }

    #[test]
    fn version_markers() -> IonResult<()> {
        let reader = &mut reader_for("$ion_1_0 5");
        assert_eq!(reader.next()?, VersionMarker(1, 0));
        next_type(reader, IonType::Int, false);
        assert_eq!(reader.read_i64()?, 5);
        Ok(())
    }

    #[test]
    fn unsupported_text_versions_are_rejected() {
        let reader = &mut reader_for("$ion_2_0 5");
        assert!(matches!(
            reader.next(),
            Err(IonError::UnsupportedVersionError { major: 2, minor: 0, .. })
        ));
    }

    #[test]
    fn quoted_or_annotated_version_markers_are_symbols() -> IonResult<()> {
        let reader = &mut reader_for("'$ion_1_0' foo::$ion_1_0");
        next_type(reader, IonType::Symbol, false);
        assert_eq!(reader.read_symbol()?, text_token("$ion_1_0"));
        next_type(reader, IonType::Symbol, false);
        assert_eq!(reader.annotations(), &[text_token("foo")]);
        assert_eq!(reader.read_symbol()?, text_token("$ion_1_0"));
        Ok(())
    }

    #[test]
    fn version_marker_inside_container_is_a_symbol() -> IonResult<()> {
        let reader = &mut reader_for("[$ion_1_0]");
        reader.next()?;
        reader.step_in()?;
        next_type(reader, IonType::Symbol, false);
        assert_eq!(reader.read_symbol()?, text_token("$ion_1_0"));
        Ok(())
    }

    #[test]
    fn unexpected_eof_inside_container_is_fatal() {
        let reader = &mut reader_for("[1, 2");
        reader.next().unwrap();
        reader.step_in().unwrap();
        reader.next().unwrap();
        let result = loop {
            match reader.next() {
                Ok(Nothing) => panic!("expected an error before the end of the list"),
                Ok(_) => continue,
                Err(e) => break e,
            }
        };
        assert!(matches!(result, IonError::SyntaxError { .. }));
        // The failure is sticky
        assert!(reader.next().is_err());
    }

    #[rstest]
    #[case("{a 1}")] // missing colon
    #[case("[1 2]")] // missing comma
    #[case("{a: 1,, b: 2}")] // doubled comma
    fn separator_errors(#[case] text: &str) {
        let reader = &mut reader_for(text);
        reader.next().unwrap();
        reader.step_in().unwrap();
        let mut saw_error = false;
        for _ in 0..4 {
            if reader.next().is_err() {
                saw_error = true;
                break;
            }
        }
        assert!(saw_error, "expected a syntax error for {text}");
    }

    #[test]
    fn blob_and_clob_values() -> IonResult<()> {
        let reader = &mut reader_for(r#"{{ZW5jb2RlZA==}} {{"hello"}}"#);
        next_type(reader, IonType::Blob, false);
        assert_eq!(reader.read_blob()?, b"encoded".to_vec());
        next_type(reader, IonType::Clob, false);
        assert_eq!(reader.read_clob()?, b"hello".to_vec());
        Ok(())
    }

    #[test]
    fn deep_nesting() -> IonResult<()> {
        let mut text = String::new();
        const DEPTH: usize = 100;
        for _ in 0..DEPTH {
            text.push('[');
        }
        text.push_str("42");
        for _ in 0..DEPTH {
            text.push(']');
        }
        let reader = &mut reader_for(&text);
        for _ in 0..DEPTH {
            next_type(reader, IonType::List, false);
            reader.step_in()?;
        }
        next_type(reader, IonType::Int, false);
        assert_eq!(reader.read_i64()?, 42);
        for _ in 0..DEPTH {
            reader.step_out()?;
        }
        assert_eq!(reader.depth(), 0);
        assert_eq!(reader.next()?, Nothing);
        Ok(())
    }
}
