//! # Codec Error Types
//!
//! All errors that can abort a serialization pass.

use thiserror::Error;

/// Errors that can occur while writing, reading or measuring a stream.
///
/// Any of these aborts the pass in progress. The cursor that reported the
/// error is left exactly as it was before the failing call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A value fell outside its declared `[min, max]` or bit width.
    #[error("value {value} outside range [{min}, {max}]")]
    RangeViolation {
        /// The offending value.
        value: i64,
        /// Declared minimum.
        min: i64,
        /// Declared maximum.
        max: i64,
    },

    /// A range was declared with `min > max`.
    #[error("invalid range: min {min} is greater than max {max}")]
    InvalidRange {
        /// Declared minimum.
        min: i64,
        /// Declared maximum.
        max: i64,
    },

    /// A bit field width outside `[1, 32]`.
    #[error("invalid bit width {0} (expected 1..=32)")]
    InvalidBitWidth(u32),

    /// Writing would exceed the buffer capacity.
    #[error("buffer overflow: {requested} bits requested, {available} available")]
    BufferOverflow {
        /// Bits the failing call needed.
        requested: usize,
        /// Bits left in the buffer.
        available: usize,
    },

    /// Reading would consume bits beyond the buffer capacity.
    #[error("buffer underflow: {requested} bits requested, {available} remaining")]
    BufferUnderflow {
        /// Bits the failing call needed.
        requested: usize,
        /// Bits left in the buffer.
        available: usize,
    },

    /// Alignment padding read back as non-zero.
    #[error("non-zero alignment padding")]
    InvalidPadding,

    /// A magic number check read back the wrong value.
    #[error("check mismatch: expected {expected:#010x}, found {found:#010x}")]
    CheckMismatch {
        /// Magic the reader expected.
        expected: u32,
        /// Value actually read.
        found: u32,
    },

    /// A quantized float declared with an unusable range or resolution.
    #[error("invalid quantization: {0}")]
    InvalidQuantization(&'static str),

    /// A string field did not decode as UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// A type tag with no matching message type.
    #[error("unknown packet type {0}")]
    UnknownPacketType(i64),

    /// Replay of a recorded stream diverged from the recording.
    #[error("stream desync: {0}")]
    StreamDesync(&'static str),
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
