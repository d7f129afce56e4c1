use std::io::Write;

use crate::data_source::IonDataSource;
use crate::result::{invalid_encoding_error, IonResult};

const BITS_PER_ENCODED_BYTE: usize = 7;
const LOWER_7_BITMASK: u8 = 0b0111_1111;
const END_FLAG: u8 = 0b1000_0000;

// The largest encoding of a usize-sized magnitude: 64 payload bits spread across bytes that
// each contribute 7.
const MAX_ENCODED_SIZE_IN_BYTES: usize =
    (usize::BITS as usize + BITS_PER_ENCODED_BYTE - 1) / BITS_PER_ENCODED_BYTE;

/// Represents a variable-length unsigned integer. See the
/// [VarUInt and VarInt Fields](https://amazon-ion.github.io/ion-docs/docs/binary.html#varuint-and-varint-fields)
/// section of the binary Ion spec for more details.
#[derive(Debug)]
pub struct VarUInt {
    value: usize,
    size_in_bytes: usize,
}

impl VarUInt {
    /// Reads a VarUInt from the provided data source. Returns an `InvalidEncoding` error if
    /// the stream ends mid-value or the encoded magnitude overflows a `usize`.
    pub fn read<R: IonDataSource>(data_source: &mut R) -> IonResult<VarUInt> {
        let mut magnitude: usize = 0;
        let mut size_in_bytes: usize = 0;
        loop {
            let byte = match data_source.next_byte()? {
                Some(byte) => byte,
                None => {
                    return invalid_encoding_error(
                        "the stream ended in the middle of a VarUInt",
                        0,
                    );
                }
            };
            size_in_bytes += 1;
            if size_in_bytes > MAX_ENCODED_SIZE_IN_BYTES {
                return invalid_encoding_error(
                    format!(
                        "found a VarUInt longer than the maximum supported size of {MAX_ENCODED_SIZE_IN_BYTES} bytes"
                    ),
                    0,
                );
            }
            // Magnitude bits about to be shifted off the high end mean the encoded value
            // does not fit in a usize
            if magnitude >> (usize::BITS as usize - BITS_PER_ENCODED_BYTE) != 0 {
                return invalid_encoding_error(
                    "found a VarUInt that was too large to fit in a usize",
                    0,
                );
            }
            magnitude = (magnitude << BITS_PER_ENCODED_BYTE) | (byte & LOWER_7_BITMASK) as usize;
            if byte & END_FLAG != 0 {
                break;
            }
        }
        Ok(VarUInt {
            value: magnitude,
            size_in_bytes,
        })
    }

    /// Encodes the given unsigned value as a VarUInt and writes it to the sink, returning
    /// the number of bytes written.
    pub fn write_u64<W: Write>(sink: &mut W, magnitude: u64) -> IonResult<usize> {
        // 64 bits at 7 bits per byte requires at most 10 bytes
        let mut buffer = [0u8; 10];
        let mut remaining = magnitude;
        // Fill the buffer back to front, seven bits at a time
        let mut first_occupied = buffer.len();
        loop {
            first_occupied -= 1;
            buffer[first_occupied] = (remaining as u8) & LOWER_7_BITMASK;
            remaining >>= BITS_PER_ENCODED_BYTE;
            if remaining == 0 {
                break;
            }
        }
        // The last byte carries the end flag
        buffer[buffer.len() - 1] |= END_FLAG;
        let encoded = &buffer[first_occupied..];
        sink.write_all(encoded)?;
        Ok(encoded.len())
    }

    /// The number of bytes that the given magnitude would occupy as a VarUInt, without
    /// encoding it. Writers use this to compute container lengths.
    pub fn encoded_size_of(magnitude: u64) -> usize {
        if magnitude == 0 {
            return 1;
        }
        let payload_bits = 64 - magnitude.leading_zeros() as usize;
        (payload_bits + BITS_PER_ENCODED_BYTE - 1) / BITS_PER_ENCODED_BYTE
    }

    /// Returns the magnitude of the unsigned integer.
    #[inline(always)]
    pub fn value(&self) -> usize {
        self.value
    }

    /// Returns the number of bytes that were read from the data source to construct this
    /// unsigned integer.
    #[inline(always)]
    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }
}
