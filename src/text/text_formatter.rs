use std::io::Write;

use crate::result::IonResult;
use crate::text::tokenizer::is_identifier;
use crate::types::decimal::Decimal;
use crate::types::integer::Int;
use crate::types::timestamp::Timestamp;
use crate::types::IonType;

/// Renders scalar values in the text Ion syntax. The formatter owns the quoting and
/// escaping rules; the writer that drives it owns layout (separators, indentation, field
/// names, and annotations).
pub(crate) struct IonValueFormatter<'a, W: Write> {
    pub(crate) output: &'a mut W,
}

/// Returns `true` if the provided text needs to be enclosed in single quotes to be a legal
/// symbol: anything that is not an identifier, that matches a keyword, that could be
/// mistaken for a symbol ID literal like `$7`, or that a reader would mistake for a
/// version marker like `$ion_1_0`.
pub(crate) fn symbol_needs_quotes(text: &str) -> bool {
    if matches!(text, "null" | "true" | "false" | "nan") {
        return true;
    }
    if text.len() > 1
        && text.starts_with('$')
        && text[1..].bytes().all(|b| b.is_ascii_digit())
    {
        return true;
    }
    if let Some(versions) = text.strip_prefix("$ion_") {
        if let Some((major, minor)) = versions.split_once('_') {
            if !major.is_empty()
                && !minor.is_empty()
                && major.bytes().all(|b| b.is_ascii_digit())
                && minor.bytes().all(|b| b.is_ascii_digit())
            {
                return true;
            }
        }
    }
    !is_identifier(text)
}

impl<'a, W: Write> IonValueFormatter<'a, W> {
    pub fn new(output: &'a mut W) -> IonValueFormatter<'a, W> {
        IonValueFormatter { output }
    }

    pub fn format_null(&mut self, ion_type: IonType) -> IonResult<()> {
        if ion_type == IonType::Null {
            write!(self.output, "null")?;
        } else {
            write!(self.output, "null.{ion_type}")?;
        }
        Ok(())
    }

    pub fn format_bool(&mut self, value: bool) -> IonResult<()> {
        write!(self.output, "{}", if value { "true" } else { "false" })?;
        Ok(())
    }

    pub fn format_int(&mut self, value: &Int) -> IonResult<()> {
        write!(self.output, "{value}")?;
        Ok(())
    }

    pub fn format_float(&mut self, value: f64) -> IonResult<()> {
        if value.is_nan() {
            write!(self.output, "nan")?;
            return Ok(());
        }
        if value.is_infinite() {
            if value.is_sign_positive() {
                write!(self.output, "+inf")?;
            } else {
                write!(self.output, "-inf")?;
            }
            return Ok(());
        }
        // The {:e} formatting always produces a mantissa and an exponent, which keeps the
        // value from reading back as an int or a decimal
        write!(self.output, "{value:e}")?;
        Ok(())
    }

    pub fn format_decimal(&mut self, value: &Decimal) -> IonResult<()> {
        write!(self.output, "{value}")?;
        Ok(())
    }

    pub fn format_timestamp(&mut self, value: &Timestamp) -> IonResult<()> {
        write!(self.output, "{value}")?;
        Ok(())
    }

    /// Writes the provided symbol text, quoting and escaping it if required. Symbols with
    /// no text are written as `$0`.
    pub fn format_symbol(&mut self, text: Option<&str>) -> IonResult<()> {
        let text = match text {
            Some(text) => text,
            None => {
                write!(self.output, "$0")?;
                return Ok(());
            }
        };
        if symbol_needs_quotes(text) {
            write!(self.output, "'")?;
            self.write_escaped_text(text, '\'')?;
            write!(self.output, "'")?;
        } else {
            write!(self.output, "{text}")?;
        }
        Ok(())
    }

    pub fn format_string(&mut self, text: &str) -> IonResult<()> {
        write!(self.output, "\"")?;
        self.write_escaped_text(text, '"')?;
        write!(self.output, "\"")?;
        Ok(())
    }

    pub fn format_blob(&mut self, bytes: &[u8]) -> IonResult<()> {
        write!(self.output, "{{{{{}}}}}", base64::encode(bytes))?;
        Ok(())
    }

    pub fn format_clob(&mut self, bytes: &[u8]) -> IonResult<()> {
        write!(self.output, "{{{{\"")?;
        for byte in bytes {
            match byte {
                b'\n' => write!(self.output, r"\n")?,
                b'\r' => write!(self.output, r"\r")?,
                b'\t' => write!(self.output, r"\t")?,
                b'"' => write!(self.output, "\\\"")?,
                b'\\' => write!(self.output, r"\\")?,
                0x20..=0x7E => write!(self.output, "{}", *byte as char)?,
                _ => write!(self.output, "\\x{byte:02x}")?,
            }
        }
        write!(self.output, "\"}}}}")?;
        Ok(())
    }

    fn write_escaped_text(&mut self, value: &str, quote: char) -> IonResult<()> {
        for ch in value.chars() {
            match ch {
                '\n' => write!(self.output, r"\n")?,
                '\r' => write!(self.output, r"\r")?,
                '\t' => write!(self.output, r"\t")?,
                '\\' => write!(self.output, r"\\")?,
                ch if ch == quote => write!(self.output, "\\{quote}")?,
                // Control characters below 0x20 are always escaped
                ch if (ch as u32) < 0x20 => write!(self.output, "\\x{:02x}", ch as u32)?,
                ch => write!(self.output, "{ch}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod text_formatter_tests {
    use super::*;
    use rstest::*;

    fn formatted<F>(format_fn: F) -> String
    where
        F: FnOnce(&mut IonValueFormatter<Vec<u8>>) -> IonResult<()>,
    {
        let mut buffer = Vec::new();
        let mut formatter = IonValueFormatter::new(&mut buffer);
        format_fn(&mut formatter).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[rstest]
    #[case("foo", false)]
    #[case("_private", false)]
    #[case("$ion", false)]
    #[case("null", true)]
    #[case("nan", true)]
    #[case("$7", true)]
    #[case("$7a", false)]
    #[case("$ion_1_0", true)]
    #[case("$ion_symbol_table", false)]
    #[case("two words", true)]
    #[case("7leading", true)]
    #[case("", true)]
    #[case("with'quote", true)]
    fn quoting_rules(#[case] text: &str, #[case] needs_quotes: bool) {
        assert_eq!(symbol_needs_quotes(text), needs_quotes, "for {text:?}");
    }

    #[test]
    fn symbols_quote_and_escape() {
        assert_eq!(formatted(|f| f.format_symbol(Some("foo"))), "foo");
        assert_eq!(formatted(|f| f.format_symbol(Some("null"))), "'null'");
        assert_eq!(
            formatted(|f| f.format_symbol(Some("it's"))),
            r"'it\'s'"
        );
        assert_eq!(formatted(|f| f.format_symbol(None)), "$0");
    }

    #[test]
    fn strings_escape_controls() {
        assert_eq!(
            formatted(|f| f.format_string("a\nb\t\"c\"\\")),
            r#""a\nb\t\"c\"\\""#
        );
        assert_eq!(formatted(|f| f.format_string("\u{01}")), r#""\x01""#);
        // Non-ASCII text passes through unescaped
        assert_eq!(formatted(|f| f.format_string("héllo")), "\"héllo\"");
    }

    #[rstest]
    #[case(0.0, "0e0")]
    #[case(2.5, "2.5e0")]
    #[case(-2.5, "-2.5e0")]
    #[case(f64::NAN, "nan")]
    #[case(f64::INFINITY, "+inf")]
    #[case(f64::NEG_INFINITY, "-inf")]
    fn floats_always_carry_exponents(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(formatted(|f| f.format_float(value)), expected);
    }

    #[test]
    fn negative_zero_float_round_trips() {
        let rendered = formatted(|f| f.format_float(-0.0));
        assert_eq!(rendered, "-0e0");
        let parsed: f64 = rendered.replace('e', "E").parse().unwrap();
        assert!(parsed.is_sign_negative());
    }

    #[test]
    fn nulls() {
        assert_eq!(formatted(|f| f.format_null(IonType::Null)), "null");
        assert_eq!(formatted(|f| f.format_null(IonType::Struct)), "null.struct");
    }

    #[test]
    fn blobs_and_clobs() {
        assert_eq!(
            formatted(|f| f.format_blob(b"encoded")),
            "{{ZW5jb2RlZA==}}"
        );
        assert_eq!(formatted(|f| f.format_clob(b"hi\x7f")), "{{\"hi\\x7f\"}}");
    }
}
