use std::io::Write;

use crate::raw_symbol_token::RawSymbolToken;
use crate::raw_symbol_token_ref::AsRawSymbolTokenRef;
use crate::result::{illegal_operation, IonError, IonResult};
use crate::text::text_formatter::IonValueFormatter;
use crate::types::decimal::Decimal;
use crate::types::integer::Int;
use crate::types::timestamp::Timestamp;
use crate::types::IonType;
use crate::writer::IonWriter;

/// The whitespace that a [TextWriter] inserts around the structure of the document.
struct WhitespaceConfig {
    // Between two top-level values
    space_between_top_level_values: &'static str,
    // After the opening delimiter of a container, before each child, and before the
    // closing delimiter
    indentation: &'static str,
    // After a list/struct separator or a struct field's colon
    space_after_separator: &'static str,
    space_after_field_name: &'static str,
}

static COMPACT_WHITESPACE_CONFIG: WhitespaceConfig = WhitespaceConfig {
    space_between_top_level_values: "\n",
    indentation: "",
    space_after_separator: " ",
    space_after_field_name: " ",
};

static PRETTY_WHITESPACE_CONFIG: WhitespaceConfig = WhitespaceConfig {
    space_between_top_level_values: "\n\n",
    indentation: "  ",
    space_after_separator: "\n",
    space_after_field_name: " ",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextStyle {
    Compact,
    Pretty,
}

/// Configures and constructs new instances of [TextWriter].
pub struct TextWriterBuilder {
    style: TextStyle,
}

impl TextWriterBuilder {
    /// A writer that emits a compact single-line-per-value rendering.
    pub fn new() -> TextWriterBuilder {
        TextWriterBuilder {
            style: TextStyle::Compact,
        }
    }

    /// A writer that emits an indented, human-friendly rendering.
    pub fn pretty() -> TextWriterBuilder {
        TextWriterBuilder {
            style: TextStyle::Pretty,
        }
    }

    pub fn build<W: Write>(self, sink: W) -> IonResult<TextWriter<W>> {
        let whitespace_config = match self.style {
            TextStyle::Compact => &COMPACT_WHITESPACE_CONFIG,
            TextStyle::Pretty => &PRETTY_WHITESPACE_CONFIG,
        };
        Ok(TextWriter {
            output: sink,
            annotations: Vec::new(),
            field_name: None,
            containers: Vec::new(),
            top_level_value_count: 0,
            whitespace_config,
            is_finished: false,
            fatal_error: None,
        })
    }
}

impl Default for TextWriterBuilder {
    fn default() -> Self {
        TextWriterBuilder::new()
    }
}

/// One open container: its type and the number of child values written so far.
#[derive(Debug)]
struct ContainerContext {
    ion_type: IonType,
    child_count: usize,
}

/// A text Ion writer. Symbol tokens with text are written as (possibly quoted) symbols;
/// tokens that only carry a symbol ID are written in bare `$id` form, preserving their
/// identity as unresolved references.
pub struct TextWriter<W: Write> {
    output: W,
    annotations: Vec<RawSymbolToken>,
    field_name: Option<RawSymbolToken>,
    containers: Vec<ContainerContext>,
    top_level_value_count: usize,
    whitespace_config: &'static WhitespaceConfig,
    is_finished: bool,
    // IO failures are sticky; once one is recorded every operation returns it
    fatal_error: Option<IonError>,
}

impl<W: Write> TextWriter<W> {
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

    fn write_symbol_token(&mut self, token: &RawSymbolToken) -> IonResult<()> {
        match token {
            RawSymbolToken::Text(text) => {
                let mut formatter = IonValueFormatter::new(&mut self.output);
                formatter.format_symbol(Some(text))
            }
            // A bare $id is a symbol reference, not text; it is never quoted
            RawSymbolToken::SymbolId(sid) => {
                write!(self.output, "${sid}")?;
                Ok(())
            }
        }
    }

    fn write_indentation(&mut self, depth: usize) -> IonResult<()> {
        let indentation = self.whitespace_config.indentation;
        if !indentation.is_empty() {
            for _ in 0..depth {
                write!(self.output, "{indentation}")?;
            }
        }
        Ok(())
    }

    /// Writes the separators, layout whitespace, field name, and annotations that precede
    /// a value in the current context.
    fn write_value_prefix(&mut self) -> IonResult<()> {
        self.check_failed()?;
        if self.is_finished {
            return illegal_operation("cannot write to a writer after calling finish()");
        }
        let is_pretty = !self.whitespace_config.indentation.is_empty();
        match self.containers.last() {
            None => {
                if self.top_level_value_count > 0 {
                    let separator = self.whitespace_config.space_between_top_level_values;
                    write!(self.output, "{separator}")?;
                }
                if self.field_name.take().is_some() {
                    return illegal_operation("field names are only legal inside a struct");
                }
            }
            Some(container) => {
                let child_count = container.child_count;
                let ion_type = container.ion_type;
                match ion_type {
                    IonType::List | IonType::Struct => {
                        if child_count > 0 {
                            write!(self.output, ",")?;
                            let spacing = self.whitespace_config.space_after_separator;
                            write!(self.output, "{spacing}")?;
                        } else if is_pretty {
                            writeln!(self.output)?;
                        }
                    }
                    IonType::SExp => {
                        if child_count > 0 {
                            write!(self.output, " ")?;
                        } else if is_pretty {
                            writeln!(self.output)?;
                        }
                    }
                    other => unreachable!("the container stack held a scalar: {other}"),
                }
                if is_pretty {
                    self.write_indentation(self.containers.len())?;
                }
                let in_struct = ion_type == IonType::Struct;
                match (in_struct, self.field_name.take()) {
                    (true, Some(name)) => {
                        self.write_symbol_token(&name)?;
                        write!(self.output, ":")?;
                        let spacing = self.whitespace_config.space_after_field_name;
                        write!(self.output, "{spacing}")?;
                    }
                    (true, None) => {
                        return illegal_operation(
                            "values inside a struct must have a field name",
                        );
                    }
                    (false, Some(_)) => {
                        return illegal_operation("field names are only legal inside a struct");
                    }
                    (false, None) => {}
                }
            }
        }

        let annotations = std::mem::take(&mut self.annotations);
        for annotation in &annotations {
            self.write_symbol_token(annotation)?;
            write!(self.output, "::")?;
        }
        Ok(())
    }

    /// Records that a value was written at the current depth.
    fn mark_value_written(&mut self) {
        match self.containers.last_mut() {
            Some(container) => container.child_count += 1,
            None => self.top_level_value_count += 1,
        }
    }

    fn write_scalar<F>(&mut self, format_fn: F) -> IonResult<()>
    where
        F: FnOnce(&mut IonValueFormatter<'_, W>) -> IonResult<()>,
    {
        self.write_value_prefix()?;
        let result = {
            let mut formatter = IonValueFormatter::new(&mut self.output);
            format_fn(&mut formatter)
        };
        self.record_failure(result)?;
        self.mark_value_written();
        Ok(())
    }
}

impl<W: Write> IonWriter for TextWriter<W> {
    type Output = W;

    fn ion_version(&self) -> (u8, u8) {
        (1, 0)
    }

    fn write_ion_version_marker(&mut self, major: u8, minor: u8) -> IonResult<()> {
        if self.depth() > 0 {
            return illegal_operation("can only write an IVM at the top level");
        }
        if (major, minor) != (1, 0) {
            return illegal_operation(format!(
                "cannot write an IVM for unsupported Ion version {major}.{minor}"
            ));
        }
        self.write_value_prefix()?;
        write!(self.output, "$ion_1_0")?;
        self.mark_value_written();
        Ok(())
    }

    fn supports_text_symbol_tokens(&self) -> bool {
        true
    }

    fn set_annotations<I, A>(&mut self, annotations: I)
    where
        A: AsRawSymbolTokenRef,
        I: IntoIterator<Item = A>,
    {
        self.annotations.clear();
        for annotation in annotations {
            self.annotations
                .push(annotation.as_raw_symbol_token_ref().to_owned());
        }
    }

    fn write_null(&mut self, ion_type: IonType) -> IonResult<()> {
        self.write_scalar(|formatter| formatter.format_null(ion_type))
    }

    fn write_bool(&mut self, value: bool) -> IonResult<()> {
        self.write_scalar(|formatter| formatter.format_bool(value))
    }

    fn write_i64(&mut self, value: i64) -> IonResult<()> {
        self.write_int(&Int::I64(value))
    }

    fn write_int(&mut self, value: &Int) -> IonResult<()> {
        self.write_scalar(|formatter| formatter.format_int(value))
    }

    fn write_f32(&mut self, value: f32) -> IonResult<()> {
        self.write_f64(value as f64)
    }

    fn write_f64(&mut self, value: f64) -> IonResult<()> {
        self.write_scalar(|formatter| formatter.format_float(value))
    }

    fn write_decimal(&mut self, value: &Decimal) -> IonResult<()> {
        self.write_scalar(|formatter| formatter.format_decimal(value))
    }

    fn write_timestamp(&mut self, value: &Timestamp) -> IonResult<()> {
        self.write_scalar(|formatter| formatter.format_timestamp(value))
    }

    fn write_symbol<A: AsRawSymbolTokenRef>(&mut self, value: A) -> IonResult<()> {
        let token = value.as_raw_symbol_token_ref().to_owned();
        self.write_value_prefix()?;
        let result = self.write_symbol_token(&token);
        self.record_failure(result)?;
        self.mark_value_written();
        Ok(())
    }

    fn write_string<A: AsRef<str>>(&mut self, value: A) -> IonResult<()> {
        let text = value.as_ref();
        self.write_scalar(|formatter| formatter.format_string(text))
    }

    fn write_clob<A: AsRef<[u8]>>(&mut self, value: A) -> IonResult<()> {
        let bytes = value.as_ref();
        self.write_scalar(|formatter| formatter.format_clob(bytes))
    }

    fn write_blob<A: AsRef<[u8]>>(&mut self, value: A) -> IonResult<()> {
        let bytes = value.as_ref();
        self.write_scalar(|formatter| formatter.format_blob(bytes))
    }

    fn step_in(&mut self, container_type: IonType) -> IonResult<()> {
        let delimiter = match container_type {
            IonType::List => "[",
            IonType::SExp => "(",
            IonType::Struct => "{",
            other => return illegal_operation(format!("cannot step into a(n) {other}")),
        };
        self.write_value_prefix()?;
        let result = write!(self.output, "{delimiter}").map_err(IonError::from);
        self.record_failure(result)?;
        self.containers.push(ContainerContext {
            ion_type: container_type,
            child_count: 0,
        });
        Ok(())
    }

    fn set_field_name<A: AsRawSymbolTokenRef>(&mut self, name: A) {
        self.field_name = Some(name.as_raw_symbol_token_ref().to_owned());
    }

    fn parent_type(&self) -> Option<IonType> {
        self.containers.last().map(|container| container.ion_type)
    }

    fn depth(&self) -> usize {
        self.containers.len()
    }

    fn step_out(&mut self) -> IonResult<()> {
        self.check_failed()?;
        let container = match self.containers.pop() {
            Some(container) => container,
            None => {
                return illegal_operation("cannot step out when the writer is at the top level");
            }
        };
        let is_pretty = !self.whitespace_config.indentation.is_empty();
        let result = (|| -> IonResult<()> {
            if is_pretty && container.child_count > 0 {
                writeln!(self.output)?;
                self.write_indentation(self.containers.len())?;
            }
            let delimiter = match container.ion_type {
                IonType::List => "]",
                IonType::SExp => ")",
                IonType::Struct => "}",
                other => unreachable!("the container stack held a scalar: {other}"),
            };
            write!(self.output, "{delimiter}")?;
            Ok(())
        })();
        self.record_failure(result)?;
        self.mark_value_written();
        Ok(())
    }

    fn flush(&mut self) -> IonResult<()> {
        self.check_failed()?;
        if self.depth() > 0 {
            return illegal_operation("cannot flush while a container is still open");
        }
        let result = self.output.flush().map_err(IonError::from);
        self.record_failure(result)
    }

    fn finish(&mut self) -> IonResult<()> {
        if self.depth() > 0 {
            return illegal_operation("cannot finish while a container is still open");
        }
        if !self.is_finished && self.top_level_value_count > 0 {
            writeln!(self.output)?;
        }
        self.flush()?;
        self.is_finished = true;
        Ok(())
    }

    fn output(&self) -> &W {
        &self.output
    }

    fn output_mut(&mut self) -> &mut W {
        &mut self.output
    }
}

#[cfg(test)]
mod text_writer_tests {
    use super::*;
    use crate::types::timestamp::Timestamp;

    fn compact_output<F>(write_fn: F) -> String
    where
        F: FnOnce(&mut TextWriter<Vec<u8>>),
    {
        let mut writer = TextWriterBuilder::new().build(Vec::new()).unwrap();
        write_fn(&mut writer);
        writer.finish().unwrap();
        String::from_utf8(writer.output().clone()).unwrap()
    }

    fn pretty_output<F>(write_fn: F) -> String
    where
        F: FnOnce(&mut TextWriter<Vec<u8>>),
    {
        let mut writer = TextWriterBuilder::pretty().build(Vec::new()).unwrap();
        write_fn(&mut writer);
        writer.finish().unwrap();
        String::from_utf8(writer.output().clone()).unwrap()
    }

    #[test]
    fn scalars_on_separate_lines() {
        let text = compact_output(|writer| {
            writer.write_i64(5).unwrap();
            writer.write_bool(true).unwrap();
            writer.write_string("hi").unwrap();
        });
        assert_eq!(text, "5\ntrue\n\"hi\"\n");
    }

    #[test]
    fn lists_and_sexps_in_compact_style() {
        let text = compact_output(|writer| {
            writer.step_in(IonType::List).unwrap();
            writer.write_i64(1).unwrap();
            writer.write_i64(2).unwrap();
            writer.step_out().unwrap();
            writer.step_in(IonType::SExp).unwrap();
            writer.write_symbol("+").unwrap();
            writer.write_i64(3).unwrap();
            writer.step_out().unwrap();
        });
        assert_eq!(text, "[1, 2]\n('+' 3)\n");
    }

    #[test]
    fn structs_write_field_names() {
        let text = compact_output(|writer| {
            writer.step_in(IonType::Struct).unwrap();
            writer.set_field_name("foo");
            writer.write_i64(1).unwrap();
            writer.set_field_name("needs quoting");
            writer.write_i64(2).unwrap();
            writer.set_field_name("");
            writer.write_i64(3).unwrap();
            writer.step_out().unwrap();
        });
        assert_eq!(text, "{foo: 1, 'needs quoting': 2, '': 3}\n");
    }

    #[test]
    fn annotations_precede_values() {
        let text = compact_output(|writer| {
            writer.set_annotations(["alpha", "beta words"]);
            writer.write_i64(1).unwrap();
            writer.set_annotations([0usize, 99usize]);
            writer.write_symbol("x").unwrap();
        });
        assert_eq!(text, "alpha::'beta words'::1\n$0::$99::x\n");
    }

    #[test]
    fn symbols_quote_when_necessary() {
        let text = compact_output(|writer| {
            writer.write_symbol("foo").unwrap();
            writer.write_symbol("null").unwrap();
            writer.write_symbol("$7").unwrap();
            writer.write_symbol(0usize).unwrap();
        });
        assert_eq!(text, "foo\n'null'\n'$7'\n$0\n");
    }

    #[test]
    fn timestamps_and_decimals_preserve_detail() {
        let timestamp = Timestamp::with_ymd_hms(2021, 2, 8, 11, 30, 2)
            .with_milliseconds(45)
            .build_at_offset(-300)
            .unwrap();
        let text = compact_output(|writer| {
            writer.write_timestamp(&timestamp).unwrap();
            writer.write_decimal(&Decimal::new(25, -1)).unwrap();
            writer.write_decimal(&Decimal::negative_zero()).unwrap();
        });
        assert_eq!(text, "2021-02-08T11:30:02.045-05:00\n2.5\n-0.\n");
    }

    #[test]
    fn pretty_style_indents_containers() {
        let text = pretty_output(|writer| {
            writer.step_in(IonType::Struct).unwrap();
            writer.set_field_name("a");
            writer.step_in(IonType::List).unwrap();
            writer.write_i64(1).unwrap();
            writer.write_i64(2).unwrap();
            writer.step_out().unwrap();
            writer.step_out().unwrap();
        });
        assert_eq!(text, "{\n  a: [\n    1,\n    2\n  ]\n}\n");
    }

    #[test]
    fn empty_containers_stay_closed_up() {
        let compact = compact_output(|writer| {
            writer.step_in(IonType::List).unwrap();
            writer.step_out().unwrap();
        });
        assert_eq!(compact, "[]\n");
        let pretty = pretty_output(|writer| {
            writer.step_in(IonType::Struct).unwrap();
            writer.step_out().unwrap();
        });
        assert_eq!(pretty, "{}\n");
    }

    #[test]
    fn field_names_required_in_structs() {
        let mut writer = TextWriterBuilder::new().build(Vec::new()).unwrap();
        writer.step_in(IonType::Struct).unwrap();
        assert!(writer.write_i64(1).is_err());
        // Recoverable
        writer.set_field_name("a");
        assert!(writer.write_i64(1).is_ok());
    }

    #[test]
    fn field_names_rejected_at_top_level() {
        let mut writer = TextWriterBuilder::new().build(Vec::new()).unwrap();
        writer.set_field_name("a");
        assert!(writer.write_i64(1).is_err());
    }

    #[test]
    fn finish_with_open_container_is_rejected() {
        let mut writer = TextWriterBuilder::new().build(Vec::new()).unwrap();
        writer.step_in(IonType::List).unwrap();
        assert!(writer.finish().is_err());
        writer.step_out().unwrap();
        assert!(writer.finish().is_ok());
        assert!(writer.write_i64(1).is_err());
    }

    #[test]
    fn version_markers_are_written_as_symbols() {
        let text = compact_output(|writer| {
            writer.write_ion_version_marker(1, 0).unwrap();
            writer.write_i64(5).unwrap();
        });
        assert_eq!(text, "$ion_1_0\n5\n");
    }
}
