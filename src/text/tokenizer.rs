use std::fmt;
use std::io::BufRead;

use num_bigint::BigUint;

use crate::result::{syntax_error, syntax_error_raw, IonResult};
use crate::text::text_buffer::TextBuffer;
use crate::types::coefficient::{Coefficient, Sign};
use crate::types::decimal::Decimal;
use crate::types::integer::{Int, UInt};
use crate::types::timestamp::{Timestamp, TimestampBuilder};
use crate::types::{IonType, SymbolId};

/// The characters that may appear in an operator symbol. Operator symbols are only legal
/// inside s-expressions.
const OPERATOR_CHARS: &str = "!#%&*+-./;<=>?@^`|~";

/// A single token scanned from the text stream. Scalar tokens arrive fully parsed; the
/// reader's state machine decides whether a given token is legal where it appears.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// An unquoted identifier. May turn out to be a keyword (`null`, `true`, `false`,
    /// `nan`); the reader resolves keywords, not the tokenizer.
    Symbol(String),
    /// A single-quoted symbol. Never a keyword, even if its text matches one.
    QuotedSymbol(String),
    /// A symbol ID literal such as `$10`.
    SymbolId(SymbolId),
    /// A run of operator characters; only produced inside s-expressions.
    Operator(String),
    /// A typed null such as `null.int`. The tokenizer resolves these because the `.` must
    /// be adjacent to `null`, which only the character stream can confirm.
    NullType(IonType),
    String(String),
    Int(Int),
    Float(f64),
    Decimal(Decimal),
    Timestamp(Timestamp),
    Blob(Vec<u8>),
    Clob(Vec<u8>),
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    Comma,
    Colon,
    DoubleColon,
    Dot,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;
        match self {
            Symbol(text) => write!(f, "symbol '{text}'"),
            QuotedSymbol(text) => write!(f, "symbol '{text}'"),
            SymbolId(sid) => write!(f, "symbol '${sid}'"),
            Operator(text) => write!(f, "operator '{text}'"),
            NullType(ion_type) => write!(f, "null.{ion_type}"),
            String(_) => write!(f, "a string"),
            Int(value) => write!(f, "int {value}"),
            Float(value) => write!(f, "float {value}"),
            Decimal(value) => write!(f, "decimal {value}"),
            Timestamp(value) => write!(f, "timestamp {value}"),
            Blob(_) => write!(f, "a blob"),
            Clob(_) => write!(f, "a clob"),
            OpenBrace => write!(f, "'{{'"),
            CloseBrace => write!(f, "'}}'"),
            OpenBracket => write!(f, "'['"),
            CloseBracket => write!(f, "']'"),
            OpenParen => write!(f, "'('"),
            CloseParen => write!(f, "')'"),
            Comma => write!(f, "','"),
            Colon => write!(f, "':'"),
            DoubleColon => write!(f, "'::'"),
            Dot => write!(f, "'.'"),
            Eof => write!(f, "end of input"),
        }
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

fn is_operator_char(ch: char) -> bool {
    OPERATOR_CHARS.contains(ch)
}

/// Returns `true` if text consisting of these characters is a valid unquoted symbol.
pub(crate) fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if is_identifier_start(first) => chars.all(is_identifier_char),
        _ => false,
    }
}

/// Scans an Ion text stream into [Token]s.
///
/// The tokenizer is context-free with one exception: operator characters only form tokens
/// inside an s-expression, so [Tokenizer::next_token] takes an `in_sexp` flag from the
/// reader driving it.
pub(crate) struct Tokenizer<R: BufRead> {
    buffer: TextBuffer<R>,
}

impl<R: BufRead> Tokenizer<R> {
    pub fn new(source: R) -> Tokenizer<R> {
        Tokenizer {
            buffer: TextBuffer::new(source),
        }
    }

    /// The absolute byte offset of the next unread character, for error reporting.
    pub fn offset(&self) -> usize {
        self.buffer.offset()
    }

    pub fn next_token(&mut self, in_sexp: bool) -> IonResult<Token> {
        self.skip_whitespace_and_comments()?;
        let offset = self.buffer.offset();
        let ch = match self.buffer.next()? {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };
        match ch {
            '{' => {
                if self.buffer.try_consume("{")? {
                    return self.scan_lob();
                }
                Ok(Token::OpenBrace)
            }
            '}' => Ok(Token::CloseBrace),
            '[' => Ok(Token::OpenBracket),
            ']' => Ok(Token::CloseBracket),
            '(' => Ok(Token::OpenParen),
            ')' => Ok(Token::CloseParen),
            ',' => Ok(Token::Comma),
            ':' => {
                if self.buffer.try_consume(":")? {
                    return Ok(Token::DoubleColon);
                }
                Ok(Token::Colon)
            }
            '"' => Ok(Token::String(self.scan_short_string()?)),
            '\'' => {
                if self.buffer.try_consume("''")? {
                    return Ok(Token::String(self.scan_long_string_sequence()?));
                }
                Ok(Token::QuotedSymbol(self.scan_quoted_symbol()?))
            }
            '+' => {
                if self.buffer.try_consume("inf")? && self.at_value_terminator(in_sexp)? {
                    return Ok(Token::Float(f64::INFINITY));
                }
                if in_sexp {
                    return self.scan_operator(ch);
                }
                syntax_error("'+' is only legal inside an s-expression", offset)
            }
            '-' => {
                match self.buffer.peek()? {
                    Some(next) if next.is_ascii_digit() => return self.scan_number(ch, in_sexp),
                    _ => {}
                }
                if self.buffer.try_consume("inf")? && self.at_value_terminator(in_sexp)? {
                    return Ok(Token::Float(f64::NEG_INFINITY));
                }
                if in_sexp {
                    return self.scan_operator(ch);
                }
                syntax_error("unexpected '-' outside an s-expression", offset)
            }
            '.' if in_sexp => self.scan_operator(ch),
            '.' => Ok(Token::Dot),
            ch if ch.is_ascii_digit() => self.scan_number(ch, in_sexp),
            ch if is_identifier_start(ch) => self.scan_identifier(ch),
            ch if is_operator_char(ch) => {
                if in_sexp {
                    return self.scan_operator(ch);
                }
                syntax_error(
                    format!("operator character '{ch}' is only legal inside an s-expression"),
                    offset,
                )
            }
            other => syntax_error(format!("unexpected character '{other}'"), offset),
        }
    }

    // === whitespace and comments ===

    fn skip_whitespace_and_comments(&mut self) -> IonResult<()> {
        loop {
            match self.buffer.next()? {
                Some(ch) if ch.is_whitespace() => continue,
                Some('/') => match self.buffer.peek()? {
                    Some('/') => {
                        // A line comment runs to the end of the line
                        while let Some(ch) = self.buffer.next()? {
                            if ch == '\n' {
                                break;
                            }
                        }
                    }
                    Some('*') => {
                        self.buffer.next()?;
                        self.skip_block_comment()?;
                    }
                    _ => {
                        // A lone slash is an operator character, not a comment
                        self.buffer.unread('/');
                        return Ok(());
                    }
                },
                Some(ch) => {
                    self.buffer.unread(ch);
                    return Ok(());
                }
                None => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self) -> IonResult<()> {
        // Block comments do not nest
        let mut previous = ' ';
        loop {
            match self.buffer.next()? {
                Some('/') if previous == '*' => return Ok(()),
                Some(ch) => previous = ch,
                None => {
                    return syntax_error(
                        "the stream ended inside a block comment",
                        self.buffer.offset(),
                    );
                }
            }
        }
    }

    // === identifiers, keywords, and typed nulls ===

    fn scan_identifier(&mut self, first: char) -> IonResult<Token> {
        let mut text = String::new();
        text.push(first);
        while let Some(ch) = self.buffer.next()? {
            if is_identifier_char(ch) {
                text.push(ch);
            } else {
                self.buffer.unread(ch);
                break;
            }
        }

        // `$` followed only by digits is a symbol ID literal
        if text.len() > 1 && text.starts_with('$') && text[1..].bytes().all(|b| b.is_ascii_digit())
        {
            let sid = text[1..].parse::<SymbolId>().map_err(|_| {
                syntax_error_raw(
                    format!("symbol ID literal '{text}' is out of range"),
                    self.buffer.offset(),
                )
            })?;
            return Ok(Token::SymbolId(sid));
        }

        // `null` immediately followed by `.` is a typed null
        if text == "null" && self.buffer.try_consume(".")? {
            return self.scan_null_type();
        }

        Ok(Token::Symbol(text))
    }

    fn scan_null_type(&mut self) -> IonResult<Token> {
        let offset = self.buffer.offset();
        let mut name = String::new();
        while let Some(ch) = self.buffer.next()? {
            if is_identifier_char(ch) {
                name.push(ch);
            } else {
                self.buffer.unread(ch);
                break;
            }
        }
        let ion_type = match name.as_str() {
            "null" => IonType::Null,
            "bool" => IonType::Bool,
            "int" => IonType::Int,
            "float" => IonType::Float,
            "decimal" => IonType::Decimal,
            "timestamp" => IonType::Timestamp,
            "symbol" => IonType::Symbol,
            "string" => IonType::String,
            "clob" => IonType::Clob,
            "blob" => IonType::Blob,
            "list" => IonType::List,
            "sexp" => IonType::SExp,
            "struct" => IonType::Struct,
            other => {
                return syntax_error(format!("'{other}' is not an Ion type"), offset);
            }
        };
        Ok(Token::NullType(ion_type))
    }

    fn scan_operator(&mut self, first: char) -> IonResult<Token> {
        let mut text = String::new();
        text.push(first);
        while let Some(ch) = self.buffer.next()? {
            if is_operator_char(ch) {
                text.push(ch);
            } else {
                self.buffer.unread(ch);
                break;
            }
        }
        Ok(Token::Operator(text))
    }

    /// Whether the next character can legally follow a numeric value. Numbers must be
    /// delimited; `1a` is a syntax error rather than two tokens.
    fn at_value_terminator(&mut self, in_sexp: bool) -> IonResult<bool> {
        let ch = match self.buffer.peek()? {
            Some(ch) => ch,
            None => return Ok(true),
        };
        let terminates = ch.is_whitespace()
            || matches!(ch, '{' | '}' | '[' | ']' | '(' | ')' | ',' | '"' | '\'' | ':' | '/')
            || (in_sexp && is_operator_char(ch));
        Ok(terminates)
    }

    fn expect_value_terminator(&mut self, in_sexp: bool) -> IonResult<()> {
        if self.at_value_terminator(in_sexp)? {
            return Ok(());
        }
        let offset = self.buffer.offset();
        let ch = self.buffer.peek()?.unwrap_or(' ');
        syntax_error(
            format!("unexpected character '{ch}' after a numeric value"),
            offset,
        )
    }

    // === numbers and timestamps ===

    fn scan_number(&mut self, first: char, in_sexp: bool) -> IonResult<Token> {
        let offset = self.buffer.offset();
        let is_negative = first == '-';
        let first_digit = if is_negative {
            match self.buffer.next()? {
                Some(ch) => ch,
                None => return syntax_error("unexpected end of input after '-'", offset),
            }
        } else {
            first
        };

        // Radix prefixes
        if first_digit == '0' {
            match self.buffer.peek()? {
                Some('x') | Some('X') => {
                    self.buffer.next()?;
                    let digits = self.scan_radix_digits(16)?;
                    self.expect_value_terminator(in_sexp)?;
                    return self.parse_radix_int(&digits, 16, is_negative, offset);
                }
                Some('b') | Some('B') => {
                    self.buffer.next()?;
                    let digits = self.scan_radix_digits(2)?;
                    self.expect_value_terminator(in_sexp)?;
                    return self.parse_radix_int(&digits, 2, is_negative, offset);
                }
                _ => {}
            }
        }

        let integer_digits = self.scan_digits(first_digit)?;

        // Four digits followed by '-' or 'T' begin a timestamp
        if !is_negative && integer_digits.len() == 4 {
            if let Some(next) = self.buffer.peek()? {
                if next == '-' || next == 'T' {
                    let token = self.scan_timestamp(&integer_digits)?;
                    self.expect_value_terminator(in_sexp)?;
                    return Ok(token);
                }
            }
        }

        if integer_digits.len() > 1 && integer_digits.starts_with('0') {
            return syntax_error("numbers cannot have leading zeros", offset);
        }

        // Optional fractional digits
        let mut fractional_digits = String::new();
        let mut has_decimal_point = false;
        if let Some('.') = self.buffer.peek()? {
            self.buffer.next()?;
            has_decimal_point = true;
            if let Some(ch) = self.buffer.peek()? {
                if ch.is_ascii_digit() {
                    let first_fraction_digit = self.buffer.next()?.unwrap_or('0');
                    fractional_digits = self.scan_digits(first_fraction_digit)?;
                }
            }
        }

        // Optional exponent: 'e' makes a float, 'd' makes a decimal
        let mut exponent_kind: Option<char> = None;
        let mut exponent_text = String::new();
        if let Some(ch) = self.buffer.peek()? {
            if ch == 'e' || ch == 'E' || ch == 'd' || ch == 'D' {
                self.buffer.next()?;
                exponent_kind = Some(ch.to_ascii_lowercase());
                if let Some(sign) = self.buffer.peek()? {
                    if sign == '+' || sign == '-' {
                        self.buffer.next()?;
                        if sign == '-' {
                            exponent_text.push('-');
                        }
                    }
                }
                let mut digit_count = 0;
                while let Some(digit) = self.buffer.peek()? {
                    if digit.is_ascii_digit() {
                        self.buffer.next()?;
                        exponent_text.push(digit);
                        digit_count += 1;
                    } else {
                        break;
                    }
                }
                if digit_count == 0 {
                    return syntax_error("expected digits in exponent", self.buffer.offset());
                }
            }
        }
        self.expect_value_terminator(in_sexp)?;

        match exponent_kind {
            Some('e') => {
                let mut text = String::new();
                if is_negative {
                    text.push('-');
                }
                text.push_str(&integer_digits);
                if has_decimal_point {
                    text.push('.');
                    text.push_str(&fractional_digits);
                }
                text.push('e');
                text.push_str(&exponent_text);
                let value = text.parse::<f64>().map_err(|_| {
                    syntax_error_raw(format!("could not parse float '{text}'"), offset)
                })?;
                Ok(Token::Float(value))
            }
            Some(_d) => {
                let declared_exponent = exponent_text.parse::<i64>().map_err(|_| {
                    syntax_error_raw("decimal exponent is out of range", offset)
                })?;
                self.decimal_token(
                    &integer_digits,
                    &fractional_digits,
                    declared_exponent,
                    is_negative,
                    offset,
                )
            }
            None if has_decimal_point => {
                self.decimal_token(&integer_digits, &fractional_digits, 0, is_negative, offset)
            }
            None => {
                let int = parse_decimal_int(&integer_digits, is_negative)
                    .ok_or_else(|| syntax_error_raw("could not parse integer", offset))?;
                Ok(Token::Int(int))
            }
        }
    }

    /// Scans digits (and interior underscores) beginning with the already-consumed `first`.
    fn scan_digits(&mut self, first: char) -> IonResult<String> {
        let mut digits = String::new();
        digits.push(first);
        let mut previous_was_underscore = false;
        while let Some(ch) = self.buffer.next()? {
            if ch.is_ascii_digit() {
                digits.push(ch);
                previous_was_underscore = false;
            } else if ch == '_' {
                if previous_was_underscore {
                    return syntax_error(
                        "underscores in numbers must be separated by digits",
                        self.buffer.offset(),
                    );
                }
                previous_was_underscore = true;
            } else {
                self.buffer.unread(ch);
                break;
            }
        }
        if previous_was_underscore {
            return syntax_error(
                "numbers cannot end with an underscore",
                self.buffer.offset(),
            );
        }
        Ok(digits)
    }

    fn scan_radix_digits(&mut self, radix: u32) -> IonResult<String> {
        let mut digits = String::new();
        let mut previous_was_underscore = true; // a leading underscore is also invalid
        while let Some(ch) = self.buffer.next()? {
            if ch.is_digit(radix) {
                digits.push(ch);
                previous_was_underscore = false;
            } else if ch == '_' {
                if previous_was_underscore {
                    return syntax_error(
                        "underscores in numbers must be separated by digits",
                        self.buffer.offset(),
                    );
                }
                previous_was_underscore = true;
            } else {
                self.buffer.unread(ch);
                break;
            }
        }
        if digits.is_empty() || previous_was_underscore {
            return syntax_error("expected digits after radix prefix", self.buffer.offset());
        }
        Ok(digits)
    }

    fn parse_radix_int(
        &mut self,
        digits: &str,
        radix: u32,
        is_negative: bool,
        offset: usize,
    ) -> IonResult<Token> {
        if let Ok(magnitude) = u64::from_str_radix(digits, radix) {
            let int = if is_negative {
                Int::from_sign_and_magnitude(true, UInt::U64(magnitude))
            } else {
                Int::from(magnitude)
            };
            return Ok(Token::Int(int));
        }
        let magnitude = BigUint::parse_bytes(digits.as_bytes(), radix)
            .ok_or_else(|| syntax_error_raw("could not parse integer digits", offset))?;
        let int = Int::from_sign_and_magnitude(is_negative, UInt::from(magnitude));
        Ok(Token::Int(int))
    }

    fn decimal_token(
        &mut self,
        integer_digits: &str,
        fractional_digits: &str,
        declared_exponent: i64,
        is_negative: bool,
        offset: usize,
    ) -> IonResult<Token> {
        let mut coefficient_digits = String::with_capacity(
            integer_digits.len() + fractional_digits.len(),
        );
        coefficient_digits.push_str(integer_digits);
        coefficient_digits.push_str(fractional_digits);
        let exponent = declared_exponent
            .checked_sub(fractional_digits.len() as i64)
            .ok_or_else(|| syntax_error_raw("decimal exponent is out of range", offset))?;
        let magnitude = parse_magnitude(&coefficient_digits)
            .ok_or_else(|| syntax_error_raw("could not parse decimal digits", offset))?;
        let sign = if is_negative {
            Sign::Negative
        } else {
            Sign::Positive
        };
        Ok(Token::Decimal(Decimal::new(
            Coefficient::new(sign, magnitude),
            exponent,
        )))
    }

    fn scan_timestamp(&mut self, year_digits: &str) -> IonResult<Token> {
        let offset = self.buffer.offset();
        let year = year_digits
            .parse::<u32>()
            .map_err(|_| syntax_error_raw("invalid timestamp year", offset))?;

        if self.buffer.try_consume("T")? {
            // Year precision requires the trailing T
            let timestamp = Timestamp::with_year(year)
                .build()
                .map_err(|e| syntax_error_raw(format!("invalid timestamp: {e}"), offset))?;
            return Ok(Token::Timestamp(timestamp));
        }

        self.expect_char('-', "timestamp")?;
        let month = self.scan_fixed_digits(2, "timestamp month")?;
        let mut builder = Timestamp::with_year(year).with_month(month);
        if self.buffer.try_consume("T")? {
            let timestamp = builder
                .build()
                .map_err(|e| syntax_error_raw(format!("invalid timestamp: {e}"), offset))?;
            return Ok(Token::Timestamp(timestamp));
        }

        self.expect_char('-', "timestamp")?;
        let day = self.scan_fixed_digits(2, "timestamp day")?;
        builder = builder.with_day(day);
        if !self.buffer.try_consume("T")? {
            // Day precision; no trailing T
            let timestamp = builder
                .build()
                .map_err(|e| syntax_error_raw(format!("invalid timestamp: {e}"), offset))?;
            return Ok(Token::Timestamp(timestamp));
        }

        // A 'T' not followed by a digit is still day precision
        match self.buffer.peek()? {
            Some(ch) if ch.is_ascii_digit() => {}
            _ => {
                let timestamp = builder
                    .build()
                    .map_err(|e| syntax_error_raw(format!("invalid timestamp: {e}"), offset))?;
                return Ok(Token::Timestamp(timestamp));
            }
        }

        let hour = self.scan_fixed_digits(2, "timestamp hour")?;
        self.expect_char(':', "timestamp")?;
        let minute = self.scan_fixed_digits(2, "timestamp minute")?;
        builder = builder.with_hour_and_minute(hour, minute);

        if self.buffer.try_consume(":")? {
            let second = self.scan_fixed_digits(2, "timestamp second")?;
            builder = builder.with_second(second);
            if self.buffer.try_consume(".")? {
                let mut digits = String::new();
                while let Some(ch) = self.buffer.peek()? {
                    if ch.is_ascii_digit() {
                        self.buffer.next()?;
                        digits.push(ch);
                    } else {
                        break;
                    }
                }
                if digits.is_empty() {
                    return syntax_error(
                        "timestamp fractional seconds require at least one digit",
                        self.buffer.offset(),
                    );
                }
                let magnitude = parse_magnitude(&digits)
                    .ok_or_else(|| syntax_error_raw("invalid fractional seconds", offset))?;
                let fraction = Decimal::new(
                    Coefficient::new(Sign::Positive, magnitude),
                    -(digits.len() as i64),
                );
                builder = builder.with_fractional_seconds(fraction);
            }
        }

        self.finish_timestamp_with_offset(builder, offset)
    }

    fn finish_timestamp_with_offset(
        &mut self,
        builder: TimestampBuilder,
        offset: usize,
    ) -> IonResult<Token> {
        let map_error =
            |e: crate::IonError| syntax_error_raw(format!("invalid timestamp: {e}"), offset);
        match self.buffer.next()? {
            Some('Z') | Some('z') => Ok(Token::Timestamp(
                builder.build_at_offset(0).map_err(map_error)?,
            )),
            Some(sign @ ('+' | '-')) => {
                let hours = self.scan_fixed_digits(2, "timestamp offset hours")?;
                self.expect_char(':', "timestamp offset")?;
                let minutes = self.scan_fixed_digits(2, "timestamp offset minutes")?;
                if minutes > 59 {
                    return syntax_error("timestamp offset minutes are out of range", offset);
                }
                let total_minutes = (hours * 60 + minutes) as i32;
                if sign == '-' {
                    if total_minutes == 0 {
                        // -00:00 denotes an unknown offset
                        return Ok(Token::Timestamp(
                            builder.build_at_unknown_offset().map_err(map_error)?,
                        ));
                    }
                    return Ok(Token::Timestamp(
                        builder.build_at_offset(-total_minutes).map_err(map_error)?,
                    ));
                }
                Ok(Token::Timestamp(
                    builder.build_at_offset(total_minutes).map_err(map_error)?,
                ))
            }
            _ => syntax_error(
                "timestamps with a time component require an offset or 'Z'",
                offset,
            ),
        }
    }

    fn scan_fixed_digits(&mut self, count: usize, label: &str) -> IonResult<u32> {
        let mut value = 0u32;
        for _ in 0..count {
            match self.buffer.next()? {
                Some(ch) if ch.is_ascii_digit() => {
                    value = value * 10 + (ch as u32 - '0' as u32);
                }
                _ => {
                    return syntax_error(
                        format!("expected {count} digits for {label}"),
                        self.buffer.offset(),
                    );
                }
            }
        }
        Ok(value)
    }

    fn expect_char(&mut self, expected: char, label: &str) -> IonResult<()> {
        match self.buffer.next()? {
            Some(ch) if ch == expected => Ok(()),
            _ => syntax_error(
                format!("expected '{expected}' in {label}"),
                self.buffer.offset(),
            ),
        }
    }

    // === strings, symbols, and escapes ===

    fn scan_short_string(&mut self) -> IonResult<String> {
        let mut text = String::new();
        loop {
            match self.buffer.next()? {
                Some('"') => return Ok(text),
                Some('\\') => {
                    if let Some(ch) = self.read_escaped_char(false)? {
                        text.push(ch);
                    }
                }
                Some('\n') | Some('\r') => {
                    return syntax_error(
                        "short strings cannot contain unescaped newlines",
                        self.buffer.offset(),
                    );
                }
                Some(ch) => text.push(ch),
                None => {
                    return syntax_error(
                        "the stream ended inside a string",
                        self.buffer.offset(),
                    );
                }
            }
        }
    }

    fn scan_quoted_symbol(&mut self) -> IonResult<String> {
        let mut text = String::new();
        loop {
            match self.buffer.next()? {
                Some('\'') => return Ok(text),
                Some('\\') => {
                    if let Some(ch) = self.read_escaped_char(false)? {
                        text.push(ch);
                    }
                }
                Some('\n') | Some('\r') => {
                    return syntax_error(
                        "quoted symbols cannot contain unescaped newlines",
                        self.buffer.offset(),
                    );
                }
                Some(ch) => text.push(ch),
                None => {
                    return syntax_error(
                        "the stream ended inside a quoted symbol",
                        self.buffer.offset(),
                    );
                }
            }
        }
    }

    /// Scans the body of a long string whose opening `'''` has been consumed, then any
    /// further long-string segments separated only by whitespace and comments. The segments
    /// are concatenated into a single logical string.
    fn scan_long_string_sequence(&mut self) -> IonResult<String> {
        let mut text = String::new();
        loop {
            self.scan_long_string_segment(&mut text)?;
            // Segments separated only by whitespace/comments are concatenated
            self.skip_whitespace_and_comments()?;
            if !self.buffer.try_consume("'''")? {
                return Ok(text);
            }
        }
    }

    fn scan_long_string_segment(&mut self, text: &mut String) -> IonResult<()> {
        loop {
            match self.buffer.next()? {
                Some('\'') => {
                    if self.buffer.try_consume("''")? {
                        return Ok(());
                    }
                    text.push('\'');
                }
                Some('\\') => {
                    if let Some(ch) = self.read_escaped_char(true)? {
                        text.push(ch);
                    }
                }
                Some('\r') => {
                    // Normalize \r and \r\n to \n
                    self.buffer.try_consume("\n")?;
                    text.push('\n');
                }
                Some(ch) => text.push(ch),
                None => {
                    return syntax_error(
                        "the stream ended inside a long string",
                        self.buffer.offset(),
                    );
                }
            }
        }
    }

    /// Reads the character following a backslash. Returns `None` for escaped line breaks
    /// (line continuations), which produce no character.
    fn read_escaped_char(&mut self, in_long_string: bool) -> IonResult<Option<char>> {
        let offset = self.buffer.offset();
        let ch = match self.buffer.next()? {
            Some(ch) => ch,
            None => return syntax_error("the stream ended inside an escape sequence", offset),
        };
        let escaped = match ch {
            'a' => '\u{07}',
            'b' => '\u{08}',
            't' => '\t',
            'n' => '\n',
            'f' => '\u{0C}',
            'r' => '\r',
            'v' => '\u{0B}',
            '0' => '\0',
            '?' => '?',
            '\'' => '\'',
            '"' => '"',
            '\\' => '\\',
            '/' => '/',
            '\n' => return Ok(None),
            '\r' => {
                // An escaped \r\n is also a line continuation
                self.buffer.try_consume("\n")?;
                return Ok(None);
            }
            'x' => {
                let code = self.scan_hex_escape_digits(2)?;
                return Ok(Some(char::from(code as u8)));
            }
            'u' => {
                let code = self.scan_hex_escape_digits(4)?;
                return Ok(Some(self.char_from_escape(code, in_long_string)?));
            }
            'U' => {
                let code = self.scan_hex_escape_digits(8)?;
                return Ok(Some(self.char_from_escape(code, in_long_string)?));
            }
            other => {
                return syntax_error(format!("invalid escape sequence '\\{other}'"), offset);
            }
        };
        Ok(Some(escaped))
    }

    fn char_from_escape(&mut self, code: u32, in_long_string: bool) -> IonResult<char> {
        // High surrogates must be followed by an escaped low surrogate; together they
        // encode a single character above the BMP.
        if (0xD800..=0xDBFF).contains(&code) {
            let offset = self.buffer.offset();
            let low = match (self.buffer.next()?, self.buffer.next()?) {
                (Some('\\'), Some('u')) => self.scan_hex_escape_digits(4)?,
                _ => {
                    return syntax_error(
                        "a high surrogate escape must be followed by a low surrogate escape",
                        offset,
                    );
                }
            };
            if !(0xDC00..=0xDFFF).contains(&low) {
                return syntax_error("invalid low surrogate escape", offset);
            }
            let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
            return char::from_u32(combined).ok_or_else(|| {
                syntax_error_raw("invalid surrogate pair", self.buffer.offset())
            });
        }
        let _ = in_long_string;
        char::from_u32(code).ok_or_else(|| {
            syntax_error_raw(
                format!("escape sequence U+{code:06X} is not a valid character"),
                self.buffer.offset(),
            )
        })
    }

    fn scan_hex_escape_digits(&mut self, count: usize) -> IonResult<u32> {
        let mut value: u32 = 0;
        for _ in 0..count {
            match self.buffer.next()? {
                Some(ch) if ch.is_ascii_hexdigit() => {
                    value = (value << 4) | ch.to_digit(16).unwrap_or(0);
                }
                _ => {
                    return syntax_error(
                        format!("expected {count} hex digits in escape sequence"),
                        self.buffer.offset(),
                    );
                }
            }
        }
        Ok(value)
    }

    // === blobs and clobs ===

    fn scan_lob(&mut self) -> IonResult<Token> {
        self.skip_lob_whitespace()?;
        match self.buffer.peek()? {
            Some('"') => {
                self.buffer.next()?;
                let bytes = self.scan_clob_short()?;
                self.expect_lob_close()?;
                Ok(Token::Clob(bytes))
            }
            Some('\'') => {
                let mut bytes = Vec::new();
                loop {
                    if !self.buffer.try_consume("'''")? {
                        break;
                    }
                    self.scan_clob_long_segment(&mut bytes)?;
                    self.skip_lob_whitespace()?;
                }
                if bytes.is_empty() && !matches!(self.buffer.peek()?, Some('}')) {
                    return syntax_error(
                        "expected a clob body after '{{'",
                        self.buffer.offset(),
                    );
                }
                self.expect_lob_close()?;
                Ok(Token::Clob(bytes))
            }
            _ => self.scan_blob(),
        }
    }

    fn skip_lob_whitespace(&mut self) -> IonResult<()> {
        while let Some(ch) = self.buffer.next()? {
            if !ch.is_whitespace() {
                self.buffer.unread(ch);
                break;
            }
        }
        Ok(())
    }

    fn expect_lob_close(&mut self) -> IonResult<()> {
        self.skip_lob_whitespace()?;
        if self.buffer.try_consume("}}")? {
            return Ok(());
        }
        syntax_error("expected '}}' to close the lob", self.buffer.offset())
    }

    fn scan_clob_short(&mut self) -> IonResult<Vec<u8>> {
        let mut bytes = Vec::new();
        loop {
            match self.buffer.next()? {
                Some('"') => return Ok(bytes),
                Some('\\') => self.read_clob_escape(&mut bytes)?,
                Some('\n') | Some('\r') => {
                    return syntax_error(
                        "short clobs cannot contain unescaped newlines",
                        self.buffer.offset(),
                    );
                }
                Some(ch) if (' '..='\u{7e}').contains(&ch) => bytes.push(ch as u8),
                Some(_) => {
                    return syntax_error(
                        "clobs may only contain printable ASCII characters and escapes",
                        self.buffer.offset(),
                    );
                }
                None => {
                    return syntax_error("the stream ended inside a clob", self.buffer.offset());
                }
            }
        }
    }

    fn scan_clob_long_segment(&mut self, bytes: &mut Vec<u8>) -> IonResult<()> {
        loop {
            match self.buffer.next()? {
                Some('\'') => {
                    if self.buffer.try_consume("''")? {
                        return Ok(());
                    }
                    bytes.push(b'\'');
                }
                Some('\\') => self.read_clob_escape(bytes)?,
                Some('\r') => {
                    self.buffer.try_consume("\n")?;
                    bytes.push(b'\n');
                }
                Some('\n') => bytes.push(b'\n'),
                Some(ch) if (' '..='\u{7e}').contains(&ch) || ch == '\t' => bytes.push(ch as u8),
                Some(_) => {
                    return syntax_error(
                        "clobs may only contain printable ASCII characters and escapes",
                        self.buffer.offset(),
                    );
                }
                None => {
                    return syntax_error("the stream ended inside a clob", self.buffer.offset());
                }
            }
        }
    }

    /// Clob escapes produce bytes rather than characters; `\u` and `\U` are not legal.
    fn read_clob_escape(&mut self, bytes: &mut Vec<u8>) -> IonResult<()> {
        let offset = self.buffer.offset();
        let ch = match self.buffer.next()? {
            Some(ch) => ch,
            None => return syntax_error("the stream ended inside an escape sequence", offset),
        };
        let byte: u8 = match ch {
            'a' => 0x07,
            'b' => 0x08,
            't' => b'\t',
            'n' => b'\n',
            'f' => 0x0C,
            'r' => b'\r',
            'v' => 0x0B,
            '0' => 0x00,
            '?' => b'?',
            '\'' => b'\'',
            '"' => b'"',
            '\\' => b'\\',
            '/' => b'/',
            '\n' => return Ok(()),
            '\r' => {
                self.buffer.try_consume("\n")?;
                return Ok(());
            }
            'x' => self.scan_hex_escape_digits(2)? as u8,
            'u' | 'U' => {
                return syntax_error(
                    "Unicode escape sequences are not legal in clobs",
                    offset,
                );
            }
            other => {
                return syntax_error(format!("invalid escape sequence '\\{other}'"), offset);
            }
        };
        bytes.push(byte);
        Ok(())
    }

    fn scan_blob(&mut self) -> IonResult<Token> {
        let offset = self.buffer.offset();
        let mut base64_text = String::new();
        loop {
            match self.buffer.next()? {
                Some(ch) if ch.is_whitespace() => continue,
                Some('}') => {
                    if self.buffer.try_consume("}")? {
                        break;
                    }
                    return syntax_error(
                        "expected '}}' to close the blob",
                        self.buffer.offset(),
                    );
                }
                Some(ch)
                    if ch.is_ascii_alphanumeric() || ch == '+' || ch == '/' || ch == '=' =>
                {
                    base64_text.push(ch);
                }
                Some(ch) => {
                    return syntax_error(
                        format!("'{ch}' is not a valid base64 character"),
                        self.buffer.offset(),
                    );
                }
                None => {
                    return syntax_error("the stream ended inside a blob", self.buffer.offset());
                }
            }
        }
        let bytes = base64::decode(&base64_text)
            .map_err(|e| syntax_error_raw(format!("invalid base64 in blob: {e}"), offset))?;
        Ok(Token::Blob(bytes))
    }
}

/// Parses a run of decimal digits (no sign, no underscores) into an [Int].
fn parse_decimal_int(digits: &str, is_negative: bool) -> Option<Int> {
    if let Ok(magnitude) = digits.parse::<u64>() {
        return Some(Int::from_sign_and_magnitude(
            is_negative,
            UInt::U64(magnitude),
        ));
    }
    let magnitude = BigUint::parse_bytes(digits.as_bytes(), 10)?;
    Some(Int::from_sign_and_magnitude(
        is_negative,
        UInt::from(magnitude),
    ))
}

/// Parses a run of decimal digits into an unsigned magnitude.
fn parse_magnitude(digits: &str) -> Option<UInt> {
    if let Ok(magnitude) = digits.parse::<u64>() {
        return Some(UInt::U64(magnitude));
    }
    BigUint::parse_bytes(digits.as_bytes(), 10).map(UInt::from)
}
