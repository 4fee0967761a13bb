//! # Sliding Window
//!
//! Fixed-capacity ring of the most recent `N` sequence-indexed entries.
//!
//! ## Design
//!
//! ```text
//!  capacity N = 8, current_sequence = 13
//!
//!  slot:      0    1    2    3    4    5    6    7
//!  sequence: [8 ][9 ][10][11][12][13][ 6][ 7]
//!                                     ^    ^
//!                                     stale: older than 13 - 8, never
//!                                     returned by find()
//! ```
//!
//! - Slot for a sequence is `sequence mod N`
//! - Inserts overwrite their slot unconditionally; nothing is swept when
//!   the window advances
//! - `find` compares the stored sequence, so stale slots miss naturally
//! - Anything not newer than `current_sequence - N` is rejected
//! - A sequence at most `32767 - N` ahead of `current_sequence` is always
//!   accepted; larger jumps can be rejected because they are no longer
//!   unambiguously newer than the oldest slot

use crate::error::{ProtocolError, ProtocolResult};
use crate::sequence::{greater_than, SequenceNumber, HALF_RANGE};

/// One occupied slot.
#[derive(Clone, Debug)]
struct Entry<T> {
    sequence: SequenceNumber,
    payload: T,
}

/// Sequence-indexed ring buffer.
#[derive(Clone, Debug)]
pub struct SlidingWindow<T> {
    current_sequence: SequenceNumber,
    entries: Vec<Option<Entry<T>>>,
}

impl<T> SlidingWindow<T> {
    /// Largest supported capacity.
    ///
    /// The oldest accepted sequence is `current_sequence - N`, and the next
    /// sequence after `current_sequence` must still be strictly less than
    /// half the sequence space ahead of it.
    pub const MAX_CAPACITY: usize = HALF_RANGE as usize - 2;

    /// Creates an empty window holding `capacity` entries.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidWindowCapacity`] unless
    /// `1 <= capacity <= 32766`.
    pub fn new(capacity: usize) -> ProtocolResult<Self> {
        if capacity == 0 || capacity > Self::MAX_CAPACITY {
            return Err(ProtocolError::InvalidWindowCapacity(capacity));
        }
        let mut entries = Vec::with_capacity(capacity);
        entries.resize_with(capacity, || None);
        Ok(Self {
            current_sequence: 0,
            entries,
        })
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Highest sequence successfully inserted, or 0 after creation/reset.
    #[inline]
    #[must_use]
    pub const fn get_sequence(&self) -> SequenceNumber {
        self.current_sequence
    }

    /// Stores `payload` under `sequence`.
    ///
    /// Returns `false` if `sequence` is too old to fit in the window.
    pub fn insert(&mut self, sequence: SequenceNumber, payload: T) -> bool {
        let oldest = self.current_sequence.wrapping_sub(self.capacity() as SequenceNumber);
        if !greater_than(sequence, oldest) {
            return false;
        }

        let index = self.index(sequence);
        self.entries[index] = Some(Entry { sequence, payload });

        if greater_than(sequence, self.current_sequence) {
            self.current_sequence = sequence;
        }
        true
    }

    /// Returns the payload stored under `sequence`, if it is still in the
    /// window.
    #[must_use]
    pub fn find(&self, sequence: SequenceNumber) -> Option<&T> {
        match &self.entries[self.index(sequence)] {
            Some(entry) if entry.sequence == sequence => Some(&entry.payload),
            _ => None,
        }
    }

    /// Mutable variant of [`find`](Self::find).
    #[must_use]
    pub fn find_mut(&mut self, sequence: SequenceNumber) -> Option<&mut T> {
        let index = self.index(sequence);
        match &mut self.entries[index] {
            Some(entry) if entry.sequence == sequence => Some(&mut entry.payload),
            _ => None,
        }
    }

    /// Returns true if `sequence` is stored in the window.
    #[inline]
    #[must_use]
    pub fn contains(&self, sequence: SequenceNumber) -> bool {
        self.find(sequence).is_some()
    }

    /// Invalidates every slot and resets the current sequence to 0.
    pub fn reset(&mut self) {
        self.current_sequence = 0;
        for entry in &mut self.entries {
            *entry = None;
        }
    }

    #[inline]
    fn index(&self, sequence: SequenceNumber) -> usize {
        usize::from(sequence) % self.entries.len()
    }
}
