//! Write backend: fields go into a [`BitWriter`].

use super::{Direction, Stream};
use crate::bitpacker::BitWriter;
use crate::error::CodecResult;

/// Stream that encodes fields into a caller-supplied buffer.
#[derive(Debug)]
pub struct WriteStream<'a> {
    writer: BitWriter<'a>,
}

impl<'a> WriteStream<'a> {
    /// Creates a write stream over `buffer`.
    #[must_use]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            writer: BitWriter::new(buffer),
        }
    }

    /// Commits buffered bits and returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// [`crate::CodecError::BufferOverflow`] if the last partial word does
    /// not fit.
    pub fn flush(&mut self) -> CodecResult<usize> {
        self.writer.flush()?;
        Ok(self.writer.bytes_written())
    }

    /// Buffer capacity in bytes.
    #[inline]
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.writer.total_bytes()
    }

    /// Bytes committed so far (see [`BitWriter::bytes_written`]).
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.writer.data()
    }
}

impl Stream for WriteStream<'_> {
    const DIRECTION: Direction = Direction::Write;

    #[inline]
    fn serialize_bits(&mut self, value: &mut u32, bits: u32) -> CodecResult<()> {
        self.writer.write_bits(*value, bits)
    }

    #[inline]
    fn serialize_align(&mut self) -> CodecResult<()> {
        self.writer.write_align()
    }

    #[inline]
    fn serialize_bytes(&mut self, data: &mut [u8]) -> CodecResult<()> {
        self.writer.write_bytes(data)
    }

    #[inline]
    fn bits_processed(&self) -> usize {
        self.writer.bits_written()
    }

    #[inline]
    fn bits_remaining(&self) -> usize {
        self.writer.bits_available()
    }
}
