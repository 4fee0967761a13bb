//! # Serialization Streams
//!
//! One serialize routine per message type, executed under three directions.
//!
//! ```text
//!                      ┌──────────────┐
//!                      │ Serializable │   fields declared once
//!                      └──────┬───────┘
//!          ┌──────────────────┼───────────────────┐
//!          v                  v                   v
//!   ┌─────────────┐    ┌────────────┐    ┌───────────────┐
//!   │ WriteStream │    │ ReadStream │    │ MeasureStream │
//!   │  BitWriter  │    │ BitReader  │    │  bit counter  │
//!   └─────────────┘    └────────────┘    └───────────────┘
//! ```
//!
//! Field order and field count live in exactly one place, so the read and
//! write paths cannot drift apart, and a measure pass costs exactly what a
//! write pass would commit.
//!
//! Values are passed as `&mut`: write and measure passes read them, read
//! passes overwrite them.

mod measure;
mod read;
mod write;

#[cfg(any(test, feature = "validation"))]
pub mod recording;

pub use measure::MeasureStream;
pub use read::ReadStream;
pub use write::WriteStream;

use crate::bitpacker::max_value;
use crate::error::{CodecError, CodecResult};
use crate::range::{IntegerRange, RangedInt};

/// Which way a pass moves data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Values flow from the message into a buffer.
    Write,
    /// Values flow from a buffer into the message.
    Read,
    /// Values are costed in bits; no buffer is touched.
    Measure,
}

impl Direction {
    /// Returns true if the pass fills in field values.
    #[inline]
    #[must_use]
    pub const fn is_reading(self) -> bool {
        matches!(self, Self::Read)
    }

    /// Returns true if the pass consumes field values (write or measure).
    #[inline]
    #[must_use]
    pub const fn is_writing(self) -> bool {
        !self.is_reading()
    }
}

/// The serialization capability every message is written against.
pub trait Stream {
    /// Direction of this backend.
    const DIRECTION: Direction;

    /// Serializes a raw unsigned field of `bits` bits (1-32).
    ///
    /// # Errors
    ///
    /// Width, range and capacity failures of the backend.
    fn serialize_bits(&mut self, value: &mut u32, bits: u32) -> CodecResult<()>;

    /// Moves to the next byte boundary.
    ///
    /// # Errors
    ///
    /// Capacity failures, or non-zero padding on read.
    fn serialize_align(&mut self) -> CodecResult<()>;

    /// Aligns, then serializes `data` as raw bytes.
    ///
    /// # Errors
    ///
    /// Capacity failures of the backend.
    fn serialize_bytes(&mut self, data: &mut [u8]) -> CodecResult<()>;

    /// Bits processed by this pass so far.
    fn bits_processed(&self) -> usize;

    /// Upper bound on the bits this pass can still process. Unbounded for
    /// passes without a buffer.
    fn bits_remaining(&self) -> usize {
        usize::MAX
    }

    /// Bytes processed so far, rounded up.
    fn bytes_processed(&self) -> usize {
        self.bits_processed().div_ceil(8)
    }

    /// Serializes a single bit.
    ///
    /// # Errors
    ///
    /// Capacity failures of the backend.
    fn serialize_bool(&mut self, value: &mut bool) -> CodecResult<()> {
        let mut bit = u32::from(*value);
        self.serialize_bits(&mut bit, 1)?;
        if Self::DIRECTION.is_reading() {
            *value = bit != 0;
        }
        Ok(())
    }

    /// Serializes `value` as an offset from `min`, in the minimum number of
    /// bits that spans `[min, max]`. A constant range (`min == max`) costs
    /// nothing.
    ///
    /// # Errors
    ///
    /// - [`CodecError::InvalidRange`] if `min > max`
    /// - [`CodecError::RangeViolation`] if a written value, or a decoded
    ///   one, is outside `[min, max]`
    /// - capacity failures of the backend
    fn serialize_int<T: RangedInt>(&mut self, value: &mut T, min: T, max: T) -> CodecResult<()> {
        let range = IntegerRange::new(min.to_i64(), max.to_i64())?;

        let mut offset = if Self::DIRECTION.is_reading() {
            0
        } else {
            range.offset_of(value.to_i64())?
        };

        self.serialize_wide(&mut offset, range.bits_required())?;

        if Self::DIRECTION.is_reading() {
            let decoded = range.value_at(offset)?;
            *value = T::from_i64(decoded).ok_or(CodecError::RangeViolation {
                value: decoded,
                min: range.min(),
                max: range.max(),
            })?;
        }

        Ok(())
    }

    /// Serializes an unsigned field of 0-64 bits. Fields wider than 32 bits
    /// go out as two fields, low word first.
    ///
    /// # Errors
    ///
    /// - [`CodecError::InvalidBitWidth`] if `bits > 64`
    /// - [`CodecError::RangeViolation`] if a written value needs more bits
    /// - capacity failures of the backend
    fn serialize_wide(&mut self, value: &mut u64, bits: u32) -> CodecResult<()> {
        if bits > 64 {
            return Err(CodecError::InvalidBitWidth(bits));
        }
        if bits == 0 {
            if Self::DIRECTION.is_reading() {
                *value = 0;
            }
            return Ok(());
        }
        if Self::DIRECTION.is_writing() && bits < 64 && *value >> bits != 0 {
            return Err(CodecError::RangeViolation {
                value: *value as i64,
                min: 0,
                max: max_value(bits) as i64,
            });
        }

        let low_bits = bits.min(32);
        let mut low = (*value & max_value(low_bits)) as u32;
        self.serialize_bits(&mut low, low_bits)?;

        let mut high = 0u32;
        if bits > 32 {
            high = (*value >> 32) as u32;
            self.serialize_bits(&mut high, bits - 32)?;
        }

        if Self::DIRECTION.is_reading() {
            *value = u64::from(low) | (u64::from(high) << 32);
        }

        Ok(())
    }

    /// Aligns, then serializes a 32-bit magic number. Reading back anything
    /// else fails.
    ///
    /// # Errors
    ///
    /// [`CodecError::CheckMismatch`] on read mismatch, plus capacity failures.
    fn serialize_check(&mut self, magic: u32) -> CodecResult<()> {
        self.serialize_align()?;
        let mut value = magic;
        self.serialize_bits(&mut value, 32)?;
        if Self::DIRECTION.is_reading() && value != magic {
            return Err(CodecError::CheckMismatch {
                expected: magic,
                found: value,
            });
        }
        Ok(())
    }

    /// Serializes a nested object.
    ///
    /// # Errors
    ///
    /// Whatever the object's serialize routine returns.
    fn serialize_object<T: Serializable>(&mut self, object: &mut T) -> CodecResult<()>
    where
        Self: Sized,
    {
        object.serialize(self)
    }
}

/// A type with a single serialize routine shared by every [`Stream`].
pub trait Serializable {
    /// Serializes every field, in wire order.
    ///
    /// # Errors
    ///
    /// Any [`CodecError`] raised by the stream.
    fn serialize<S: Stream>(&mut self, stream: &mut S) -> CodecResult<()>;
}

/// Encodes `message` into `buffer`, returning the number of bytes used.
///
/// # Errors
///
/// Any [`CodecError`] raised while writing. The buffer contents are
/// unspecified afterwards and the message must be discarded.
pub fn encode<T: Serializable>(message: &mut T, buffer: &mut [u8]) -> CodecResult<usize> {
    let mut stream = WriteStream::new(buffer);
    if let Err(err) = message.serialize(&mut stream) {
        tracing::trace!(error = %err, bits = stream.bits_processed(), "encode aborted");
        return Err(err);
    }
    stream.flush()
}

/// Decodes a `T` from `buffer`.
///
/// # Errors
///
/// Any [`CodecError`] raised while reading; truncated or corrupt input
/// typically surfaces as [`CodecError::BufferUnderflow`] or
/// [`CodecError::RangeViolation`].
pub fn decode<T: Serializable + Default>(buffer: &[u8]) -> CodecResult<T> {
    let mut stream = ReadStream::new(buffer);
    let mut message = T::default();
    if let Err(err) = message.serialize(&mut stream) {
        tracing::trace!(error = %err, bits = stream.bits_processed(), "decode aborted");
        return Err(err);
    }
    Ok(message)
}

/// Measures the encoded size of `message` in bits without writing it.
///
/// # Errors
///
/// Range violations only; a measure pass has no capacity.
pub fn measure<T: Serializable>(message: &mut T) -> CodecResult<usize> {
    let mut stream = MeasureStream::new();
    message.serialize(&mut stream)?;
    Ok(stream.bits_processed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::serialize_u64;

    const MAX_ITEMS: usize = 16;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct TestObject {
        a: i32,
        b: i32,
        c: i32,
        d: u32,
        e: u32,
        f: u32,
        g: bool,
        big: u64,
        wide: i64,
        num_items: u8,
        items: [u32; MAX_ITEMS],
    }

    impl TestObject {
        fn sample() -> Self {
            let mut items = [0u32; MAX_ITEMS];
            for (i, item) in items.iter_mut().enumerate().take(MAX_ITEMS / 2) {
                *item = i as u32 + 10;
            }
            Self {
                a: 1,
                b: -2,
                c: 150,
                d: 55,
                e: 255,
                f: 127,
                g: true,
                big: 0xDEAD_BEEF_CAFE_F00D,
                wide: -(1 << 40),
                num_items: (MAX_ITEMS / 2) as u8,
                items,
            }
        }
    }

    impl Serializable for TestObject {
        fn serialize<S: Stream>(&mut self, stream: &mut S) -> CodecResult<()> {
            stream.serialize_int(&mut self.a, 0, 10)?;
            stream.serialize_int(&mut self.b, -5, 5)?;
            stream.serialize_int(&mut self.c, -100, 10000)?;

            stream.serialize_bits(&mut self.d, 6)?;
            stream.serialize_bits(&mut self.e, 8)?;
            stream.serialize_bits(&mut self.f, 7)?;

            stream.serialize_bool(&mut self.g)?;

            serialize_u64(stream, &mut self.big)?;
            stream.serialize_int(&mut self.wide, -(1i64 << 50), 1i64 << 50)?;

            stream.serialize_int(&mut self.num_items, 0, (MAX_ITEMS - 1) as u8)?;
            for item in &mut self.items[..usize::from(self.num_items)] {
                stream.serialize_bits(item, 8)?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_stream_round_trip() {
        let mut buffer = [0u8; 256];
        let mut written = TestObject::sample();

        let bytes = encode(&mut written, &mut buffer).unwrap();
        let read: TestObject = decode(&buffer[..bytes]).unwrap();

        assert_eq!(read, written);
    }

    #[test]
    fn test_measure_matches_write() {
        let mut buffer = [0u8; 256];
        let mut object = TestObject::sample();

        let measured = measure(&mut object).unwrap();

        let mut stream = WriteStream::new(&mut buffer);
        object.serialize(&mut stream).unwrap();
        assert_eq!(stream.bits_processed(), measured);

        let expected = 4 + 4 + 14 + 6 + 8 + 7 + 1 + 64 + 52 + 4 + 8 * MAX_ITEMS / 2;
        assert_eq!(measured, expected);
    }

    #[test]
    fn test_constant_range_costs_nothing() {
        let mut stream = MeasureStream::new();
        let mut value = 7i32;
        stream.serialize_int(&mut value, 7, 7).unwrap();
        assert_eq!(stream.bits_processed(), 0);

        let buffer = [0u8; 0];
        let mut reader = ReadStream::new(&buffer);
        let mut read = 0i32;
        reader.serialize_int(&mut read, 7, 7).unwrap();
        assert_eq!(read, 7);
    }

    #[test]
    fn test_range_violation_in_write_and_measure() {
        let expected = CodecError::RangeViolation { value: 11, min: 0, max: 10 };

        let mut buffer = [0u8; 16];
        let mut writer = WriteStream::new(&mut buffer);
        let mut value = 11i32;
        assert_eq!(writer.serialize_int(&mut value, 0, 10), Err(expected.clone()));
        assert_eq!(writer.bits_processed(), 0);

        let mut measurer = MeasureStream::new();
        assert_eq!(measurer.serialize_int(&mut value, 0, 10), Err(expected));
        assert_eq!(measurer.bits_processed(), 0);
    }

    #[test]
    fn test_decoded_value_past_max_is_rejected() {
        // [0, 10] takes 4 bits; 0b1111 decodes to 15
        let buffer = [0x0Fu8];
        let mut reader = ReadStream::new(&buffer);
        let mut value = 0i32;
        assert_eq!(
            reader.serialize_int(&mut value, 0, 10),
            Err(CodecError::RangeViolation { value: 15, min: 0, max: 10 })
        );
    }

    #[test]
    fn test_truncated_input_underflows() {
        let mut buffer = [0u8; 256];
        let mut written = TestObject::sample();
        let bytes = encode(&mut written, &mut buffer).unwrap();

        let result: CodecResult<TestObject> = decode(&buffer[..bytes - 2]);
        assert!(matches!(result, Err(CodecError::BufferUnderflow { .. })));
    }

    #[test]
    fn test_small_buffer_overflows() {
        let mut buffer = [0u8; 8];
        let mut written = TestObject::sample();
        assert!(matches!(
            encode(&mut written, &mut buffer),
            Err(CodecError::BufferOverflow { .. })
        ));
    }

    #[test]
    fn test_check_mismatch() {
        let mut buffer = [0u8; 8];
        let bytes = {
            let mut writer = WriteStream::new(&mut buffer);
            let mut flag = true;
            writer.serialize_bool(&mut flag).unwrap();
            writer.serialize_check(0x1234_5678).unwrap();
            writer.flush().unwrap()
        };
        assert_eq!(bytes, 5);

        let mut reader = ReadStream::new(&buffer[..bytes]);
        let mut flag = false;
        reader.serialize_bool(&mut flag).unwrap();
        assert!(flag);
        assert_eq!(
            reader.serialize_check(0x8765_4321),
            Err(CodecError::CheckMismatch { expected: 0x8765_4321, found: 0x1234_5678 })
        );
    }

    #[test]
    fn test_wide_field_rejects_oversized_value() {
        let mut stream = MeasureStream::new();
        let mut value = 1u64 << 40;
        assert!(matches!(
            stream.serialize_wide(&mut value, 40),
            Err(CodecError::RangeViolation { .. })
        ));
        assert_eq!(stream.serialize_wide(&mut value, 65), Err(CodecError::InvalidBitWidth(65)));
        stream.serialize_wide(&mut value, 41).unwrap();
        assert_eq!(stream.bits_processed(), 41);
    }

    #[test]
    fn test_wide_field_63_bits() {
        let mut stream = MeasureStream::new();
        let mut value = 1u64 << 63;
        assert_eq!(
            stream.serialize_wide(&mut value, 63),
            Err(CodecError::RangeViolation { value: i64::MIN, min: 0, max: i64::MAX })
        );
        assert_eq!(stream.bits_processed(), 0);

        let mut value = u64::MAX >> 1;
        stream.serialize_wide(&mut value, 63).unwrap();
        assert_eq!(stream.bits_processed(), 63);

        let mut buffer = [0u8; 8];
        let mut writer = WriteStream::new(&mut buffer);
        let mut value = (1u64 << 63) - 5;
        writer.serialize_wide(&mut value, 63).unwrap();
        writer.flush().unwrap();

        let mut reader = ReadStream::new(&buffer);
        let mut read = 0u64;
        reader.serialize_wide(&mut read, 63).unwrap();
        assert_eq!(read, (1u64 << 63) - 5);
    }
}
