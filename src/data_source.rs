use std::io;
use std::io::{BufRead, BufReader, Read};

use crate::result::IonResult;

/// Optimized read operations for parsing Ion from a byte stream.
///
/// Readers pull bytes through this trait rather than through [io::Read] directly; the default
/// methods below work on any [BufRead], taking advantage of the internal buffer to avoid
/// intermediate copies wherever the requested bytes happen to be contiguous.
pub trait IonDataSource: BufRead {
    /// Returns the next byte in the stream, or `None` if the stream is exhausted.
    fn next_byte(&mut self) -> IonResult<Option<u8>> {
        let byte = match self.fill_buf()? {
            [] => return Ok(None),
            [first, ..] => *first,
        };
        self.consume(1);
        Ok(Some(byte))
    }

    /// Discards the specified number of bytes from the stream. Returns an error if the stream
    /// ends before all of the requested bytes could be skipped.
    fn skip_bytes(&mut self, number_of_bytes: usize) -> IonResult<()> {
        let mut remaining = number_of_bytes;
        while remaining > 0 {
            let buffered = self.fill_buf()?;
            if buffered.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "unexpected end of stream while skipping {number_of_bytes} bytes ({remaining} left)"
                    ),
                )
                .into());
            }
            let bytes_to_consume = remaining.min(buffered.len());
            self.consume(bytes_to_consume);
            remaining -= bytes_to_consume;
        }
        Ok(())
    }

    /// Feeds bytes to the provided `byte_processor` one at a time until the processor returns
    /// `false` or the stream is exhausted, returning the number of bytes that were consumed.
    /// This is the access pattern used to read variable-length encoding primitives.
    fn read_next_byte_while<F>(&mut self, byte_processor: &mut F) -> IonResult<usize>
    where
        F: FnMut(u8) -> bool,
    {
        let mut number_of_bytes_read: usize = 0;
        loop {
            let buffered = self.fill_buf()?;
            if buffered.is_empty() {
                // The stream ended mid-primitive; the caller decides whether that's an error.
                return Ok(number_of_bytes_read);
            }
            for (index, byte) in buffered.iter().enumerate() {
                number_of_bytes_read += 1;
                if !byte_processor(*byte) {
                    self.consume(index + 1);
                    return Ok(number_of_bytes_read);
                }
            }
            let bytes_scanned = buffered.len();
            self.consume(bytes_scanned);
        }
    }

    /// Makes `length_in_bytes` bytes available as a single slice and passes them to the
    /// provided `slice_processor`. If the source's internal buffer already holds the requested
    /// bytes contiguously they are borrowed in place; otherwise they are accumulated in
    /// `fallback_buffer` first.
    fn read_slice<T, F>(
        &mut self,
        length_in_bytes: usize,
        fallback_buffer: &mut Vec<u8>,
        slice_processor: F,
    ) -> IonResult<T>
    where
        F: FnOnce(&[u8]) -> IonResult<T>,
    {
        let buffered = self.fill_buf()?;
        if buffered.len() >= length_in_bytes {
            let result = slice_processor(&buffered[..length_in_bytes]);
            self.consume(length_in_bytes);
            return result;
        }

        // The requested bytes span more than one fill of the internal buffer. Copy them into
        // the caller-provided scratch space so they can be processed contiguously.
        fallback_buffer.clear();
        fallback_buffer.resize(length_in_bytes, 0);
        self.read_exact(fallback_buffer.as_mut_slice())?;
        slice_processor(fallback_buffer.as_slice())
    }
}

// Every BufRead is an IonDataSource.
impl<T: BufRead> IonDataSource for T {}

/// Types that can be converted into an [IonDataSource] for use by a reader.
///
/// This allows the various reader constructors to accept strings, slices, vectors, and
/// arbitrary [io::Read] implementations uniformly.
pub trait ToIonDataSource {
    type DataSource: IonDataSource;
    fn to_ion_data_source(self) -> Self::DataSource;
}

impl ToIonDataSource for String {
    type DataSource = io::Cursor<Vec<u8>>;

    fn to_ion_data_source(self) -> Self::DataSource {
        io::Cursor::new(self.into_bytes())
    }
}

impl<'a> ToIonDataSource for &'a str {
    type DataSource = io::Cursor<&'a [u8]>;

    fn to_ion_data_source(self) -> Self::DataSource {
        io::Cursor::new(self.as_bytes())
    }
}

impl<'a> ToIonDataSource for &'a [u8] {
    type DataSource = io::Cursor<&'a [u8]>;

    fn to_ion_data_source(self) -> Self::DataSource {
        io::Cursor::new(self)
    }
}

impl<'a, const N: usize> ToIonDataSource for &'a [u8; N] {
    type DataSource = io::Cursor<&'a [u8]>;

    fn to_ion_data_source(self) -> Self::DataSource {
        io::Cursor::new(self)
    }
}

impl ToIonDataSource for Vec<u8> {
    type DataSource = io::Cursor<Vec<u8>>;

    fn to_ion_data_source(self) -> Self::DataSource {
        io::Cursor::new(self)
    }
}

impl<'a> ToIonDataSource for &'a Vec<u8> {
    type DataSource = io::Cursor<&'a [u8]>;

    fn to_ion_data_source(self) -> Self::DataSource {
        io::Cursor::new(self.as_slice())
    }
}

impl<T: AsRef<[u8]>> ToIonDataSource for io::Cursor<T> {
    type DataSource = Self;

    fn to_ion_data_source(self) -> Self::DataSource {
        self
    }
}

impl<T: Read> ToIonDataSource for BufReader<T> {
    type DataSource = Self;

    fn to_ion_data_source(self) -> Self::DataSource {
        self
    }
}

impl<T: BufRead, U: BufRead> ToIonDataSource for io::Chain<T, U> {
    type DataSource = Self;

    fn to_ion_data_source(self) -> Self::DataSource {
        self
    }
}
