//! # Serialization Helpers
//!
//! Field types built on the [`Stream`] primitives. Each helper is written once
//! and runs under every direction.
//!
//! | helper                       | wire cost                         |
//! |------------------------------|-----------------------------------|
//! | [`serialize_u16`]            | 16 bits                           |
//! | [`serialize_u32`]            | 32 bits                           |
//! | [`serialize_u64`] / `i64`    | 64 bits, low word first           |
//! | [`serialize_f32`] / `f64`    | raw IEEE-754 bit pattern          |
//! | [`serialize_compressed_f32`] | `bits_required(0, steps)`         |
//! | [`serialize_string`]         | align + 32-bit length + bytes     |
//! | [`serialize_int_relative`]   | 1 to 38 bits depending on delta   |

use crate::bitpacker::max_value;
use crate::error::{CodecError, CodecResult};
use crate::range::bits_required;
use crate::stream::Stream;

/// Delta buckets for [`serialize_int_relative`], tried in order after the
/// single-bit `+1` case.
const RELATIVE_BUCKETS: [u32; 5] = [4, 16, 256, 4096, 65536];

/// Serializes a full 16-bit value.
///
/// # Errors
///
/// Capacity failures of the stream.
pub fn serialize_u16<S: Stream>(stream: &mut S, value: &mut u16) -> CodecResult<()> {
    let mut bits = u32::from(*value);
    stream.serialize_bits(&mut bits, 16)?;
    if S::DIRECTION.is_reading() {
        *value = bits as u16;
    }
    Ok(())
}

/// Serializes a full 32-bit value.
///
/// # Errors
///
/// Capacity failures of the stream.
pub fn serialize_u32<S: Stream>(stream: &mut S, value: &mut u32) -> CodecResult<()> {
    stream.serialize_bits(value, 32)
}

/// Serializes a full 64-bit value as two 32-bit fields, low word first.
///
/// # Errors
///
/// Capacity failures of the stream.
pub fn serialize_u64<S: Stream>(stream: &mut S, value: &mut u64) -> CodecResult<()> {
    stream.serialize_wide(value, 64)
}

/// Serializes a signed 64-bit value by its two's complement bit pattern.
///
/// # Errors
///
/// Capacity failures of the stream.
pub fn serialize_i64<S: Stream>(stream: &mut S, value: &mut i64) -> CodecResult<()> {
    let mut bits = *value as u64;
    stream.serialize_wide(&mut bits, 64)?;
    if S::DIRECTION.is_reading() {
        *value = bits as i64;
    }
    Ok(())
}

/// Serializes an `f32` by its bit pattern. NaN payloads survive.
///
/// # Errors
///
/// Capacity failures of the stream.
pub fn serialize_f32<S: Stream>(stream: &mut S, value: &mut f32) -> CodecResult<()> {
    let mut bits = value.to_bits();
    stream.serialize_bits(&mut bits, 32)?;
    if S::DIRECTION.is_reading() {
        *value = f32::from_bits(bits);
    }
    Ok(())
}

/// Serializes an `f64` by its bit pattern.
///
/// # Errors
///
/// Capacity failures of the stream.
pub fn serialize_f64<S: Stream>(stream: &mut S, value: &mut f64) -> CodecResult<()> {
    let mut bits = value.to_bits();
    stream.serialize_wide(&mut bits, 64)?;
    if S::DIRECTION.is_reading() {
        *value = f64::from_bits(bits);
    }
    Ok(())
}

/// Serializes an `f32` quantized to `resolution` steps over `[min, max]`.
///
/// Written values are clamped into the range and rounded to the nearest
/// step, so a decoded value is within `resolution / 2` of the clamped
/// original.
///
/// # Errors
///
/// - [`CodecError::InvalidQuantization`] if `min >= max`, the resolution is
///   not positive, or the range needs more than 32 bits of steps
/// - capacity failures of the stream
pub fn serialize_compressed_f32<S: Stream>(
    stream: &mut S,
    value: &mut f32,
    min: f32,
    max: f32,
    resolution: f32,
) -> CodecResult<()> {
    if !min.is_finite() || !max.is_finite() || min >= max {
        return Err(CodecError::InvalidQuantization("range must satisfy min < max"));
    }
    if resolution.is_nan() || resolution <= 0.0 {
        return Err(CodecError::InvalidQuantization("resolution must be positive"));
    }

    let delta = max - min;
    let steps = f64::from(delta / resolution).ceil();
    if steps > f64::from(u32::MAX) {
        return Err(CodecError::InvalidQuantization("more than 2^32 steps"));
    }
    let max_step = steps as u32;
    let bits = bits_required(0, i64::from(max_step));

    let mut step = 0u32;
    if S::DIRECTION.is_writing() {
        let normalized = ((*value - min) / delta).clamp(0.0, 1.0);
        step = (f64::from(normalized) * f64::from(max_step) + 0.5).floor() as u32;
    }

    if bits > 0 {
        stream.serialize_bits(&mut step, bits)?;
    }

    if S::DIRECTION.is_reading() {
        let normalized = if max_step == 0 {
            0.0
        } else {
            step.min(max_step) as f32 / max_step as f32
        };
        *value = normalized * delta + min;
    }
    Ok(())
}

/// Serializes a UTF-8 string of at most `max_len` bytes.
///
/// Wire form: alignment, a 32-bit byte length, then the raw bytes.
///
/// # Errors
///
/// - [`CodecError::RangeViolation`] if the length exceeds `max_len`
/// - [`CodecError::BufferUnderflow`] if a read length runs past the end of
///   the stream; nothing is allocated for it
/// - [`CodecError::InvalidUtf8`] if decoded bytes are not UTF-8
/// - capacity failures of the stream
pub fn serialize_string<S: Stream>(
    stream: &mut S,
    value: &mut String,
    max_len: usize,
) -> CodecResult<()> {
    let limit = u32::try_from(max_len).unwrap_or(u32::MAX);
    let mut length = u32::try_from(value.len()).unwrap_or(u32::MAX);

    stream.serialize_align()?;
    if S::DIRECTION.is_writing() && length > limit {
        return Err(length_violation(length, limit));
    }
    stream.serialize_bits(&mut length, 32)?;
    if length > limit {
        return Err(length_violation(length, limit));
    }
    if S::DIRECTION.is_reading() {
        let requested = length as usize * 8;
        let available = stream.bits_remaining();
        if requested > available {
            return Err(CodecError::BufferUnderflow { requested, available });
        }
    }

    let mut bytes = std::mem::take(value).into_bytes();
    if S::DIRECTION.is_reading() {
        bytes.clear();
        bytes.resize(length as usize, 0);
    }
    let result = stream.serialize_bytes(&mut bytes);
    *value = String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
    result
}

const fn length_violation(length: u32, limit: u32) -> CodecError {
    CodecError::RangeViolation {
        value: length as i64,
        min: 0,
        max: limit as i64,
    }
}

/// Serializes `current` relative to a strictly smaller `previous`.
///
/// Small forward deltas are cheap: `+1` costs a single bit, then the
/// buckets `1..=4`, `1..=16`, `1..=256`, `1..=4096` and `1..=65536` each
/// cost one flag bit per bucket tried plus the bucket's range. Anything past the last bucket is sent as a raw
/// 32-bit value.
///
/// # Errors
///
/// - [`CodecError::RangeViolation`] if `current <= previous` on write, or a
///   decoded delta overflows `u32`
/// - capacity failures of the stream
pub fn serialize_int_relative<S: Stream>(
    stream: &mut S,
    previous: u32,
    current: &mut u32,
) -> CodecResult<()> {
    let mut difference = 0u32;
    if S::DIRECTION.is_writing() {
        if *current <= previous {
            return Err(CodecError::RangeViolation {
                value: i64::from(*current),
                min: i64::from(previous) + 1,
                max: max_value(32) as i64,
            });
        }
        difference = *current - previous;
    }

    let mut one = difference == 1;
    stream.serialize_bool(&mut one)?;
    if one {
        if S::DIRECTION.is_reading() {
            *current = apply_delta(previous, 1)?;
        }
        return Ok(());
    }

    for bound in RELATIVE_BUCKETS {
        let mut in_bucket = difference <= bound;
        stream.serialize_bool(&mut in_bucket)?;
        if in_bucket {
            stream.serialize_int(&mut difference, 1, bound)?;
            if S::DIRECTION.is_reading() {
                *current = apply_delta(previous, difference)?;
            }
            return Ok(());
        }
    }

    stream.serialize_bits(current, 32)
}

fn apply_delta(previous: u32, difference: u32) -> CodecResult<u32> {
    previous
        .checked_add(difference)
        .ok_or(CodecError::RangeViolation {
            value: i64::from(previous) + i64::from(difference),
            min: 0,
            max: max_value(32) as i64,
        })
}
