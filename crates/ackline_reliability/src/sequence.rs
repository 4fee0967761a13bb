//! # Sequence Arithmetic
//!
//! Ordering over 16-bit sequence numbers that wrap at 65536.
//!
//! ```text
//!        b                     b + 32768
//!   ─────┼─────────────────────────┼──────────────────────▶ (mod 65536)
//!        │◀── greater_than(a, b) ─▶│◀── less_than(a, b) ──▶│
//! ```
//!
//! `a` is newer than `b` when it lies within half the sequence space ahead
//! of `b`. This is correct across the wrap as long as no more than 32768
//! sequence numbers are in flight at once.

/// Packet sequence number.
pub type SequenceNumber = u16;

/// Acknowledgment bitfield: bit `i` covers sequence `ack - i`.
pub type AckBitfield = u32;

/// Half of the sequence space.
pub const HALF_RANGE: u16 = 32768;

/// Returns true if `a` is logically newer than `b`.
///
/// Equal values are never greater.
#[inline]
#[must_use]
pub const fn greater_than(a: SequenceNumber, b: SequenceNumber) -> bool {
    (a > b && a - b <= HALF_RANGE) || (a < b && b - a > HALF_RANGE)
}

/// Returns true if `a` is logically older than `b`.
#[inline]
#[must_use]
pub const fn less_than(a: SequenceNumber, b: SequenceNumber) -> bool {
    greater_than(b, a)
}

/// Signed distance from `b` to `a`, taking the shorter way around.
///
/// Positive exactly when `a` is newer, so the sign always agrees with
/// [`greater_than`]. A distance of exactly half the space is positive only
/// when `a > b` numerically.
#[inline]
#[must_use]
pub const fn sequence_difference(a: SequenceNumber, b: SequenceNumber) -> i32 {
    let forward = a.wrapping_sub(b);
    if forward < HALF_RANGE || (forward == HALF_RANGE && a > b) {
        forward as i32
    } else {
        forward as i32 - 65536
    }
}
