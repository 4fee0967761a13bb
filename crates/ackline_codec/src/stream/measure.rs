//! Measure backend: fields are costed, nothing is written.

use super::{Direction, Stream};
use crate::bitpacker::{check_width, max_value};
use crate::error::{CodecError, CodecResult};

/// Stream that counts the bits a write pass would commit.
///
/// Alignment is exact for a pass that starts at bit 0 of its buffer, which
/// is how [`crate::encode`] runs. A measure pass has no capacity and never
/// overflows; use [`fits`](Self::fits) to compare against a buffer size.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeasureStream {
    bits: usize,
}

impl MeasureStream {
    /// Creates an empty measure stream.
    #[must_use]
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    /// Returns true if everything measured so far fits in `bytes` bytes.
    #[inline]
    #[must_use]
    pub const fn fits(&self, bytes: usize) -> bool {
        self.bits <= bytes * 8
    }

    #[inline]
    const fn align_bits(&self) -> usize {
        (8 - self.bits % 8) % 8
    }
}

impl Stream for MeasureStream {
    const DIRECTION: Direction = Direction::Measure;

    fn serialize_bits(&mut self, value: &mut u32, bits: u32) -> CodecResult<()> {
        check_width(bits)?;
        let max = max_value(bits);
        if u64::from(*value) > max {
            return Err(CodecError::RangeViolation {
                value: i64::from(*value),
                min: 0,
                max: max as i64,
            });
        }
        self.bits += bits as usize;
        Ok(())
    }

    fn serialize_align(&mut self) -> CodecResult<()> {
        self.bits += self.align_bits();
        Ok(())
    }

    fn serialize_bytes(&mut self, data: &mut [u8]) -> CodecResult<()> {
        self.bits += self.align_bits() + data.len() * 8;
        Ok(())
    }

    #[inline]
    fn bits_processed(&self) -> usize {
        self.bits
    }
}
