//! # Bit Packer
//!
//! Packs fixed-width unsigned fields (1-32 bits) into a caller-supplied
//! byte buffer, and unpacks them again.
//!
//! ## Wire Layout
//!
//! ```text
//!  write_bits(a, 3); write_bits(b, 7); ...
//!
//!  scratch (u64):  ...ccccccc bbbbbbb aaa      <- low bits first
//!                  └──── 32 bits ────┘
//!                           │ commit
//!                           v
//!  buffer:         [w0 b0][w0 b1][w0 b2][w0 b3][w1 b0]...   little-endian words
//! ```
//!
//! Fields accumulate from the least significant bit of a 64-bit scratch
//! register. Every time the scratch holds 32 or more bits, the low 32 bits
//! are committed as one little-endian word. Because of that ordering, a run
//! of byte-aligned 8-bit fields lands in the buffer in the order it was
//! written, which is what lets [`BitWriter::write_bytes`] copy whole words.
//!
//! Buffers do not need to be a multiple of four bytes. A trailing partial
//! word is committed by [`BitWriter::flush`] as just the bytes it covers.

use crate::error::{CodecError, CodecResult};

const WORD_BITS: u32 = 32;
const WORD_BYTES: usize = 4;

/// Rejects field widths outside `1..=32`.
#[inline]
pub(crate) fn check_width(bits: u32) -> CodecResult<()> {
    if bits == 0 || bits > WORD_BITS {
        return Err(CodecError::InvalidBitWidth(bits));
    }
    Ok(())
}

/// Largest value representable in `bits` bits (`bits <= 32`).
#[inline]
#[must_use]
pub const fn max_value(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

/// Writes bit fields into a borrowed byte buffer.
///
/// The writer never allocates and never grows the buffer. Call
/// [`flush`](Self::flush) once all fields are written to commit the last
/// partial word.
#[derive(Debug)]
pub struct BitWriter<'a> {
    buffer: &'a mut [u8],
    scratch: u64,
    scratch_bits: u32,
    word_index: usize,
    bits_written: usize,
    bytes_written: usize,
    num_bits: usize,
}

impl<'a> BitWriter<'a> {
    /// Creates a writer over `buffer`. The whole slice is usable capacity.
    #[must_use]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        let num_bits = buffer.len() * 8;
        Self {
            buffer,
            scratch: 0,
            scratch_bits: 0,
            word_index: 0,
            bits_written: 0,
            bytes_written: 0,
            num_bits,
        }
    }

    /// Writes the low `bits` bits of `value`.
    ///
    /// # Errors
    ///
    /// - [`CodecError::InvalidBitWidth`] if `bits` is not in `1..=32`
    /// - [`CodecError::RangeViolation`] if `value >= 2^bits`
    /// - [`CodecError::BufferOverflow`] if the field does not fit
    pub fn write_bits(&mut self, value: u32, bits: u32) -> CodecResult<()> {
        check_width(bits)?;

        let max = max_value(bits);
        if u64::from(value) > max {
            return Err(CodecError::RangeViolation {
                value: i64::from(value),
                min: 0,
                max: max as i64,
            });
        }

        let available = self.bits_available();
        if bits as usize > available {
            return Err(CodecError::BufferOverflow {
                requested: bits as usize,
                available,
            });
        }

        self.scratch |= u64::from(value) << self.scratch_bits;
        self.scratch_bits += bits;
        if self.scratch_bits >= WORD_BITS {
            self.commit_word();
        }
        self.bits_written += bits as usize;

        Ok(())
    }

    /// Pads with zero bits up to the next byte boundary.
    ///
    /// # Errors
    ///
    /// [`CodecError::BufferOverflow`] if the padding does not fit.
    pub fn write_align(&mut self) -> CodecResult<()> {
        let pad = self.align_bits();
        if pad != 0 {
            self.write_bits(0, pad)?;
        }
        Ok(())
    }

    /// Aligns to a byte boundary, then writes `data` verbatim.
    ///
    /// Whole words are copied directly once the scratch register is empty.
    ///
    /// # Errors
    ///
    /// [`CodecError::BufferOverflow`] if padding plus data does not fit.
    /// Nothing is written in that case.
    pub fn write_bytes(&mut self, data: &[u8]) -> CodecResult<()> {
        let requested = self.align_bits() as usize + data.len() * 8;
        let available = self.bits_available();
        if requested > available {
            return Err(CodecError::BufferOverflow { requested, available });
        }

        self.write_align()?;

        // head: finish the partially filled word
        let mut index = 0;
        while self.scratch_bits != 0 && index < data.len() {
            self.write_bits(u32::from(data[index]), 8)?;
            index += 1;
        }

        // body: whole words
        let words = (data.len() - index) / WORD_BYTES;
        if words > 0 {
            let start = self.word_index * WORD_BYTES;
            let len = words * WORD_BYTES;
            self.buffer[start..start + len].copy_from_slice(&data[index..index + len]);
            self.word_index += words;
            self.bits_written += len * 8;
            self.bytes_written = self.word_index * WORD_BYTES;
            index += len;
        }

        // tail
        for &byte in &data[index..] {
            self.write_bits(u32::from(byte), 8)?;
        }

        Ok(())
    }

    /// Commits any bits still held in scratch, zero-padded to a byte
    /// boundary.
    ///
    /// The scratch register is left intact, so writing may continue and
    /// `flush` may be called again later.
    ///
    /// # Errors
    ///
    /// [`CodecError::BufferOverflow`] if the partial word does not fit.
    pub fn flush(&mut self) -> CodecResult<()> {
        if self.scratch_bits == 0 {
            return Ok(());
        }

        let tail = self.scratch_bits.div_ceil(8) as usize;
        let start = self.word_index * WORD_BYTES;
        let room = self.buffer.len().saturating_sub(start);
        if tail > room {
            return Err(CodecError::BufferOverflow {
                requested: tail * 8,
                available: room * 8,
            });
        }

        let bytes = (self.scratch as u32).to_le_bytes();
        self.buffer[start..start + tail].copy_from_slice(&bytes[..tail]);
        self.bytes_written = start + tail;

        Ok(())
    }

    fn commit_word(&mut self) {
        let start = self.word_index * WORD_BYTES;
        let word = self.scratch as u32;
        self.buffer[start..start + WORD_BYTES].copy_from_slice(&word.to_le_bytes());
        self.scratch >>= WORD_BITS;
        self.scratch_bits -= WORD_BITS;
        self.word_index += 1;
        self.bytes_written = self.word_index * WORD_BYTES;
    }

    /// Zero bits needed to reach the next byte boundary.
    #[inline]
    #[must_use]
    pub const fn align_bits(&self) -> u32 {
        ((8 - self.bits_written % 8) % 8) as u32
    }

    /// Total bits written so far.
    #[inline]
    #[must_use]
    pub const fn bits_written(&self) -> usize {
        self.bits_written
    }

    /// Bytes committed to the buffer. Only includes the trailing partial
    /// word after a [`flush`](Self::flush).
    #[inline]
    #[must_use]
    pub const fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Bits still free in the buffer.
    #[inline]
    #[must_use]
    pub const fn bits_available(&self) -> usize {
        self.num_bits - self.bits_written
    }

    /// Buffer capacity in bytes.
    #[inline]
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// The committed bytes.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.buffer[..self.bytes_written]
    }
}

/// Reads bit fields back out of a byte buffer written by [`BitWriter`].
#[derive(Debug)]
pub struct BitReader<'a> {
    buffer: &'a [u8],
    scratch: u64,
    scratch_bits: u32,
    byte_index: usize,
    bits_read: usize,
    num_bits: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a reader over `buffer`. Every byte of the slice is readable.
    #[must_use]
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            scratch: 0,
            scratch_bits: 0,
            byte_index: 0,
            bits_read: 0,
            num_bits: buffer.len() * 8,
        }
    }

    /// Reads a `bits`-wide unsigned field.
    ///
    /// # Errors
    ///
    /// - [`CodecError::InvalidBitWidth`] if `bits` is not in `1..=32`
    /// - [`CodecError::BufferUnderflow`] if fewer than `bits` bits remain
    pub fn read_bits(&mut self, bits: u32) -> CodecResult<u32> {
        check_width(bits)?;

        let available = self.bits_remaining();
        if bits as usize > available {
            return Err(CodecError::BufferUnderflow {
                requested: bits as usize,
                available,
            });
        }

        if self.scratch_bits < bits {
            self.load_word();
        }

        let value = (self.scratch & max_value(bits)) as u32;
        self.scratch >>= bits;
        self.scratch_bits -= bits;
        self.bits_read += bits as usize;

        Ok(value)
    }

    /// Skips padding up to the next byte boundary.
    ///
    /// # Errors
    ///
    /// - [`CodecError::BufferUnderflow`] if the padding is truncated
    /// - [`CodecError::InvalidPadding`] if any padding bit is set
    ///
    /// Nothing is consumed on error.
    pub fn read_align(&mut self) -> CodecResult<()> {
        let pad = self.align_bits();
        if pad == 0 {
            return Ok(());
        }
        // A partly read byte is always loaded, so its padding sits in scratch.
        if self.scratch_bits >= pad && self.scratch & max_value(pad) != 0 {
            return Err(CodecError::InvalidPadding);
        }
        self.read_bits(pad)?;
        Ok(())
    }

    /// Aligns to a byte boundary, then fills `out` with raw bytes.
    ///
    /// # Errors
    ///
    /// [`CodecError::BufferUnderflow`] if padding plus `out.len()` bytes are
    /// not available. Nothing is consumed in that case.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> CodecResult<()> {
        let requested = self.align_bits() as usize + out.len() * 8;
        let available = self.bits_remaining();
        if requested > available {
            return Err(CodecError::BufferUnderflow { requested, available });
        }

        self.read_align()?;

        let mut index = 0;
        while self.scratch_bits != 0 && index < out.len() {
            out[index] = self.read_bits(8)? as u8;
            index += 1;
        }

        let words = (out.len() - index) / WORD_BYTES;
        if words > 0 {
            let len = words * WORD_BYTES;
            let start = self.byte_index;
            out[index..index + len].copy_from_slice(&self.buffer[start..start + len]);
            self.byte_index += len;
            self.bits_read += len * 8;
            index += len;
        }

        for byte in &mut out[index..] {
            *byte = self.read_bits(8)? as u8;
        }

        Ok(())
    }

    fn load_word(&mut self) {
        let start = self.byte_index;
        let end = (start + WORD_BYTES).min(self.buffer.len());
        let mut word = [0u8; WORD_BYTES];
        word[..end - start].copy_from_slice(&self.buffer[start..end]);

        // Bytes past the end of a short final word read as zero. The
        // remaining-bits check keeps them from ever being returned.
        self.scratch |= u64::from(u32::from_le_bytes(word)) << self.scratch_bits;
        self.scratch_bits += WORD_BITS;
        self.byte_index = end;
    }

    /// Padding bits before the next byte boundary.
    #[inline]
    #[must_use]
    pub const fn align_bits(&self) -> u32 {
        ((8 - self.bits_read % 8) % 8) as u32
    }

    /// Total bits consumed so far.
    #[inline]
    #[must_use]
    pub const fn bits_read(&self) -> usize {
        self.bits_read
    }

    /// Bytes touched so far, rounded up.
    #[inline]
    #[must_use]
    pub const fn bytes_read(&self) -> usize {
        self.bits_read.div_ceil(8)
    }

    /// Bits left before the end of the buffer.
    #[inline]
    #[must_use]
    pub const fn bits_remaining(&self) -> usize {
        self.num_bits - self.bits_read
    }

    /// Buffer capacity in bits.
    #[inline]
    #[must_use]
    pub const fn total_bits(&self) -> usize {
        self.num_bits
    }
}
