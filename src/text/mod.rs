//! This module provides the text Ion 1.0 encoding layer: a buffered character source, a
//! tokenizer for the full text grammar, and the raw reader and writer built on top of them.

pub(crate) mod raw_text_reader;
pub(crate) mod raw_text_writer;
pub(crate) mod text_buffer;
pub(crate) mod text_formatter;
pub(crate) mod tokenizer;

pub use raw_text_reader::RawTextReader;
pub use raw_text_writer::{TextWriter, TextWriterBuilder};
