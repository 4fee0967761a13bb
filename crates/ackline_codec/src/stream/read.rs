//! Read backend: fields come out of a [`BitReader`].

use super::{Direction, Stream};
use crate::bitpacker::BitReader;
use crate::error::CodecResult;

/// Stream that decodes fields from a received buffer.
#[derive(Debug)]
pub struct ReadStream<'a> {
    reader: BitReader<'a>,
}

impl<'a> ReadStream<'a> {
    /// Creates a read stream over `buffer`.
    #[must_use]
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            reader: BitReader::new(buffer),
        }
    }

    /// Buffer capacity in bits.
    #[inline]
    #[must_use]
    pub const fn total_bits(&self) -> usize {
        self.reader.total_bits()
    }
}

impl Stream for ReadStream<'_> {
    const DIRECTION: Direction = Direction::Read;

    #[inline]
    fn serialize_bits(&mut self, value: &mut u32, bits: u32) -> CodecResult<()> {
        *value = self.reader.read_bits(bits)?;
        Ok(())
    }

    #[inline]
    fn serialize_align(&mut self) -> CodecResult<()> {
        self.reader.read_align()
    }

    #[inline]
    fn serialize_bytes(&mut self, data: &mut [u8]) -> CodecResult<()> {
        self.reader.read_bytes(data)
    }

    #[inline]
    fn bits_processed(&self) -> usize {
        self.reader.bits_read()
    }

    #[inline]
    fn bits_remaining(&self) -> usize {
        self.reader.bits_remaining()
    }
}
