//! # Validation Streams
//!
//! Debug harness over the [`Stream`] contract. A [`RecordingStream`] captures
//! every field as a `(value, min, max)` triple on a write pass; a
//! [`ReplayStream`] feeds those triples back to a read pass and fails the
//! moment the reader asks for a field with a different range. That pins down
//! read/write asymmetry in a serialize routine without going through the bit
//! packer at all.

use super::{Direction, Serializable, Stream};
use crate::bitpacker::{check_width, max_value};
use crate::error::{CodecError, CodecResult};
use crate::range::{IntegerRange, RangedInt};

/// One recorded field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordedValue {
    /// Field value.
    pub value: i64,
    /// Declared minimum.
    pub min: i64,
    /// Declared maximum.
    pub max: i64,
}

/// Write-direction stream that records fields instead of encoding them.
#[derive(Clone, Debug, Default)]
pub struct RecordingStream {
    values: Vec<RecordedValue>,
    bits: usize,
}

impl RecordingStream {
    /// Creates an empty recording.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded fields, in order.
    #[must_use]
    pub fn values(&self) -> &[RecordedValue] {
        &self.values
    }

    /// Consumes the stream, returning the recorded fields.
    #[must_use]
    pub fn into_values(self) -> Vec<RecordedValue> {
        self.values
    }

    fn record(&mut self, value: i64, min: i64, max: i64, bits: u32) {
        self.values.push(RecordedValue { value, min, max });
        self.bits += bits as usize;
    }
}

impl Stream for RecordingStream {
    const DIRECTION: Direction = Direction::Write;

    fn serialize_bits(&mut self, value: &mut u32, bits: u32) -> CodecResult<()> {
        check_width(bits)?;
        let max = max_value(bits) as i64;
        let value = i64::from(*value);
        if value > max {
            return Err(CodecError::RangeViolation { value, min: 0, max });
        }
        self.record(value, 0, max, bits);
        Ok(())
    }

    fn serialize_int<T: RangedInt>(&mut self, value: &mut T, min: T, max: T) -> CodecResult<()> {
        let range = IntegerRange::new(min.to_i64(), max.to_i64())?;
        let value = value.to_i64();
        range.offset_of(value)?;
        self.record(value, range.min(), range.max(), range.bits_required());
        Ok(())
    }

    fn serialize_align(&mut self) -> CodecResult<()> {
        Ok(())
    }

    fn serialize_bytes(&mut self, data: &mut [u8]) -> CodecResult<()> {
        for &byte in data.iter() {
            self.record(i64::from(byte), 0, 255, 8);
        }
        Ok(())
    }

    fn bits_processed(&self) -> usize {
        self.bits
    }
}

/// Read-direction stream that replays a recording.
#[derive(Clone, Debug)]
pub struct ReplayStream<'a> {
    values: &'a [RecordedValue],
    index: usize,
    bits: usize,
}

impl<'a> ReplayStream<'a> {
    /// Creates a replay over recorded fields.
    #[must_use]
    pub const fn new(values: &'a [RecordedValue]) -> Self {
        Self {
            values,
            index: 0,
            bits: 0,
        }
    }

    /// Checks that every recorded field was consumed.
    ///
    /// # Errors
    ///
    /// [`CodecError::StreamDesync`] if the reader stopped early.
    pub fn finish(&self) -> CodecResult<()> {
        if self.index != self.values.len() {
            return Err(CodecError::StreamDesync("reader consumed fewer values than written"));
        }
        Ok(())
    }

    fn next(&mut self, min: i64, max: i64, bits: u32) -> CodecResult<i64> {
        let recorded = self
            .values
            .get(self.index)
            .copied()
            .ok_or(CodecError::StreamDesync("read past end of stream"))?;

        if recorded.min != min || recorded.max != max {
            return Err(CodecError::StreamDesync("min/max desync between read and write"));
        }
        if recorded.value < min || recorded.value > max {
            return Err(CodecError::RangeViolation {
                value: recorded.value,
                min,
                max,
            });
        }

        self.index += 1;
        self.bits += bits as usize;
        Ok(recorded.value)
    }
}

impl Stream for ReplayStream<'_> {
    const DIRECTION: Direction = Direction::Read;

    fn serialize_bits(&mut self, value: &mut u32, bits: u32) -> CodecResult<()> {
        check_width(bits)?;
        *value = self.next(0, max_value(bits) as i64, bits)? as u32;
        Ok(())
    }

    fn serialize_int<T: RangedInt>(&mut self, value: &mut T, min: T, max: T) -> CodecResult<()> {
        let range = IntegerRange::new(min.to_i64(), max.to_i64())?;
        let replayed = self.next(range.min(), range.max(), range.bits_required())?;
        *value = T::from_i64(replayed).ok_or(CodecError::RangeViolation {
            value: replayed,
            min: range.min(),
            max: range.max(),
        })?;
        Ok(())
    }

    fn serialize_align(&mut self) -> CodecResult<()> {
        Ok(())
    }

    fn serialize_bytes(&mut self, data: &mut [u8]) -> CodecResult<()> {
        for byte in data.iter_mut() {
            *byte = self.next(0, 255, 8)? as u8;
        }
        Ok(())
    }

    fn bits_processed(&self) -> usize {
        self.bits
    }

    // Each field left is at most one byte of a byte run.
    fn bits_remaining(&self) -> usize {
        (self.values.len() - self.index) * 8
    }
}

/// Records `message`, replays the recording into a fresh `T`, and returns
/// it.
///
/// # Errors
///
/// [`CodecError::StreamDesync`] if the read path asks for different fields
/// than the write path produced, or any range violation on either side.
pub fn validate_round_trip<T: Serializable + Default>(message: &mut T) -> CodecResult<T> {
    let mut recording = RecordingStream::new();
    message.serialize(&mut recording)?;

    let mut replay = ReplayStream::new(recording.values());
    let mut copy = T::default();
    copy.serialize(&mut replay)?;
    replay.finish()?;

    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Pair {
        a: i32,
        b: u16,
        flag: bool,
    }

    impl Serializable for Pair {
        fn serialize<S: Stream>(&mut self, stream: &mut S) -> CodecResult<()> {
            stream.serialize_int(&mut self.a, -10, 10)?;
            stream.serialize_int(&mut self.b, 0, 1000)?;
            stream.serialize_bool(&mut self.flag)
        }
    }

    /// Reads `b` with a different range than it was written with.
    #[derive(Debug, Default)]
    struct Skewed {
        a: i32,
        b: u16,
    }

    impl Serializable for Skewed {
        fn serialize<S: Stream>(&mut self, stream: &mut S) -> CodecResult<()> {
            stream.serialize_int(&mut self.a, -10, 10)?;
            if S::DIRECTION.is_reading() {
                stream.serialize_int(&mut self.b, 0, 999)
            } else {
                stream.serialize_int(&mut self.b, 0, 1000)
            }
        }
    }

    #[test]
    fn test_serialize_object() {
        let mut written = Pair { a: -3, b: 777, flag: true };
        let read = validate_round_trip(&mut written).unwrap();
        assert_eq!(read, written);
    }

    #[test]
    fn test_records_triples() {
        let mut pair = Pair { a: 4, b: 12, flag: false };
        let mut recording = RecordingStream::new();
        pair.serialize(&mut recording).unwrap();

        assert_eq!(
            recording.values(),
            &[
                RecordedValue { value: 4, min: -10, max: 10 },
                RecordedValue { value: 12, min: 0, max: 1000 },
                RecordedValue { value: 0, min: 0, max: 1 },
            ]
        );
        assert_eq!(recording.bits_processed(), 5 + 10 + 1);
    }

    #[test]
    fn test_range_desync_is_detected() {
        let mut skewed = Skewed { a: 1, b: 2 };
        assert_eq!(
            validate_round_trip(&mut skewed).unwrap_err(),
            CodecError::StreamDesync("min/max desync between read and write")
        );
    }

    #[test]
    fn test_read_past_end() {
        let mut replay = ReplayStream::new(&[]);
        let mut value = 0u32;
        assert_eq!(
            replay.serialize_bits(&mut value, 4),
            Err(CodecError::StreamDesync("read past end of stream"))
        );
    }

    #[test]
    fn test_unread_values_are_reported() {
        let values = [RecordedValue { value: 1, min: 0, max: 1 }];
        let replay = ReplayStream::new(&values);
        assert!(replay.finish().is_err());
    }
}
