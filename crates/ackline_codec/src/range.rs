//! # Integer Ranges
//!
//! Range-compressed integers are sent as an unsigned offset from `min`,
//! using only the bits needed to span `[min, max]`.
//!
//! | range          | bits |
//! |----------------|------|
//! | `[5, 5]`       | 0    |
//! | `[0, 1]`       | 1    |
//! | `[-5, 5]`      | 4    |
//! | `[0, 255]`     | 8    |
//! | `[100, 10000]` | 14   |
//! | `[i64::MIN, i64::MAX]` | 64 |

use crate::error::{CodecError, CodecResult};

/// Bits needed to encode any value of `[min, max]`: `ceil(log2(max - min + 1))`.
///
/// Returns 0 when `min == max` (the value is a constant and never sent) or
/// when the range is inverted.
#[inline]
#[must_use]
pub const fn bits_required(min: i64, max: i64) -> u32 {
    if min >= max {
        return 0;
    }
    let span = max.wrapping_sub(min) as u64;
    u64::BITS - span.leading_zeros()
}

/// A validated `[min, max]` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntegerRange {
    min: i64,
    max: i64,
    bits: u32,
}

impl IntegerRange {
    /// Creates a range.
    ///
    /// # Errors
    ///
    /// [`CodecError::InvalidRange`] if `min > max`.
    pub const fn new(min: i64, max: i64) -> CodecResult<Self> {
        if min > max {
            return Err(CodecError::InvalidRange { min, max });
        }
        Ok(Self {
            min,
            max,
            bits: bits_required(min, max),
        })
    }

    /// Lower bound.
    #[inline]
    #[must_use]
    pub const fn min(&self) -> i64 {
        self.min
    }

    /// Upper bound.
    #[inline]
    #[must_use]
    pub const fn max(&self) -> i64 {
        self.max
    }

    /// Wire width of a value in this range.
    #[inline]
    #[must_use]
    pub const fn bits_required(&self) -> u32 {
        self.bits
    }

    /// Returns true if `value` lies within the range.
    #[inline]
    #[must_use]
    pub const fn contains(&self, value: i64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Offset of `value` from `min`, as sent on the wire.
    ///
    /// # Errors
    ///
    /// [`CodecError::RangeViolation`] if `value` is outside the range.
    pub const fn offset_of(&self, value: i64) -> CodecResult<u64> {
        if !self.contains(value) {
            return Err(self.violation(value));
        }
        Ok(value.wrapping_sub(self.min) as u64)
    }

    /// Value for a decoded wire offset.
    ///
    /// # Errors
    ///
    /// [`CodecError::RangeViolation`] if the offset lands past `max`, which
    /// only happens on corrupt input.
    pub const fn value_at(&self, offset: u64) -> CodecResult<i64> {
        if offset > self.max.wrapping_sub(self.min) as u64 {
            return Err(self.violation(self.min.wrapping_add(offset as i64)));
        }
        Ok(self.min.wrapping_add(offset as i64))
    }

    const fn violation(&self, value: i64) -> CodecError {
        CodecError::RangeViolation {
            value,
            min: self.min,
            max: self.max,
        }
    }
}

/// Integer types that can be sent as range-compressed fields.
pub trait RangedInt: Copy {
    /// Widens to `i64`.
    fn to_i64(self) -> i64;

    /// Narrows from `i64`, or `None` if the value does not fit.
    fn from_i64(value: i64) -> Option<Self>;
}

macro_rules! impl_ranged_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl RangedInt for $ty {
                #[inline]
                fn to_i64(self) -> i64 {
                    i64::from(self)
                }

                #[inline]
                fn from_i64(value: i64) -> Option<Self> {
                    <$ty>::try_from(value).ok()
                }
            }
        )*
    };
}

impl_ranged_int!(i8, i16, i32, i64, u8, u16, u32);
