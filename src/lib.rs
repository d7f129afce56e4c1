#![allow(dead_code)]
//! # ion-stream
//!
//! A streaming implementation of the [Amazon Ion](https://amazon-ion.github.io/ion-docs/)
//! data format, supporting both its binary and human-readable text encodings.
//!
//! The crate is organized around a symmetric pair of cursor-style APIs:
//!
//! * [`Reader`] decodes a stream of Ion values from bytes, automatically detecting the
//!   encoding and resolving symbols through the stream's symbol tables.
//! * [`IonWriter`] implementations ([`BinaryWriter`], [`TextWriter`]) serialize values in
//!   either encoding, managing symbol interning and container lengths internally.
//!
//! ```
//! use ion_stream::{IonReader, ReaderBuilder, StreamItem, IonType};
//!
//! # fn main() -> ion_stream::IonResult<()> {
//! let mut reader = ReaderBuilder::new().build("{greeting: \"hello\"}")?;
//! assert_eq!(reader.next()?, StreamItem::Value(IonType::Struct));
//! reader.step_in()?;
//! reader.next()?;
//! assert_eq!(reader.field_name()?.text(), Some("greeting"));
//! assert_eq!(reader.read_string()?, "hello");
//! # Ok(())
//! # }
//! ```

pub mod binary;
pub mod catalog;
pub(crate) mod constants;
pub mod data_source;
pub mod raw_reader;
pub mod raw_symbol_token;
pub mod raw_symbol_token_ref;
pub mod reader;
pub mod result;
pub mod stream_reader;
pub mod symbol;
pub mod symbol_table;
pub mod system_reader;
pub mod text;
pub mod types;
pub mod writer;

pub use binary::binary_writer::{BinaryWriter, BinaryWriterBuilder};
pub use binary::raw_binary_reader::RawBinaryReader;
pub use binary::raw_binary_writer::RawBinaryWriter;
pub use catalog::{Catalog, MapCatalog};
pub use data_source::{IonDataSource, ToIonDataSource};
pub use raw_reader::{RawReader, RawStreamItem};
pub use raw_symbol_token::RawSymbolToken;
pub use raw_symbol_token_ref::{AsRawSymbolTokenRef, RawSymbolTokenRef};
pub use reader::{Reader, ReaderBuilder, StreamItem, UserReader};
pub use result::{IonError, IonResult};
pub use stream_reader::IonReader;
pub use symbol::{ImportSource, Symbol};
pub use symbol_table::{SharedSymbolTable, SymbolTable};
pub use system_reader::{SystemReader, SystemStreamItem};
pub use text::raw_text_reader::RawTextReader;
pub use text::raw_text_writer::{TextWriter, TextWriterBuilder};
pub use types::coefficient::{Coefficient, Sign};
pub use types::decimal::Decimal;
pub use types::integer::{Int, UInt};
pub use types::timestamp::{Mantissa, Precision, Timestamp, TimestampBuilder};
pub use types::{IonType, SymbolId};
pub use writer::IonWriter;
