//! # Acknowledgment Generation
//!
//! Summarizes a received-packet window as the most recent sequence plus a
//! 32-bit history.
//!
//! ```text
//!  ack = 11
//!  bit:       10         6       2   0
//!  ack_bits:  1 0 0 0 1 0 0 0 1 0 1
//!  sequence:  1         5       9   11
//! ```
//!
//! Bit `i` stands for sequence `ack - i` (mod 65536). Bit 0 is the ack
//! packet itself.

use crate::sequence::{AckBitfield, SequenceNumber};
use crate::sliding_window::SlidingWindow;

/// Number of sequences covered by one summary.
pub const ACK_BITS: u16 = AckBitfield::BITS as u16;

/// Latest received sequence plus which of the 32 sequences ending at it
/// arrived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AckSummary {
    /// Most recent received sequence.
    pub ack: SequenceNumber,
    /// Bit `i` set iff `ack - i` was received.
    pub ack_bits: AckBitfield,
}

impl AckSummary {
    /// Creates a summary from its raw parts.
    #[inline]
    #[must_use]
    pub const fn new(ack: SequenceNumber, ack_bits: AckBitfield) -> Self {
        Self { ack, ack_bits }
    }

    /// Returns true if the summary reports `sequence` as received.
    #[inline]
    #[must_use]
    pub const fn is_acked(&self, sequence: SequenceNumber) -> bool {
        let offset = self.ack.wrapping_sub(sequence);
        offset < ACK_BITS && self.ack_bits & (1 << offset) != 0
    }

    /// Sequences reported as received, newest first.
    pub fn acked_sequences(&self) -> impl Iterator<Item = SequenceNumber> + '_ {
        (0..ACK_BITS)
            .filter(|&bit| self.ack_bits & (1 << bit) != 0)
            .map(|bit| self.ack.wrapping_sub(bit))
    }
}

/// Builds the ack summary for everything `window` has received.
///
/// A window that never received anything yields `(0, 0)`.
#[must_use]
pub fn generate_ack_summary<T>(window: &SlidingWindow<T>) -> AckSummary {
    let ack = window.get_sequence();
    let ack_bits = (0..ACK_BITS)
        .filter(|&bit| window.contains(ack.wrapping_sub(bit)))
        .fold(0, |bits, bit| bits | (1 << bit));
    AckSummary { ack, ack_bits }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: u16 = 256;

    fn window_with(sequences: &[u16]) -> SlidingWindow<()> {
        let mut window = SlidingWindow::new(usize::from(SIZE)).unwrap();
        for &sequence in sequences {
            assert!(window.insert(sequence, ()));
        }
        window
    }

    #[test]
    fn test_empty_window() {
        let window = window_with(&[]);
        assert_eq!(generate_ack_summary(&window), AckSummary::new(0, 0));
    }

    #[test]
    fn test_contiguous() {
        let sequences: Vec<u16> = (0..=SIZE).collect();
        let window = window_with(&sequences);
        assert_eq!(
            generate_ack_summary(&window),
            AckSummary::new(SIZE, 0xFFFF_FFFF)
        );
    }

    #[test]
    fn test_sparse() {
        let window = window_with(&[1, 5, 9, 11]);
        let summary = generate_ack_summary(&window);
        assert_eq!(summary.ack, 11);
        assert_eq!(
            summary.ack_bits,
            1 | (1 << (11 - 9)) | (1 << (11 - 5)) | (1 << (11 - 1))
        );
        assert_eq!(summary.acked_sequences().collect::<Vec<_>>(), vec![11, 9, 5, 1]);
        assert!(summary.is_acked(5));
        assert!(!summary.is_acked(6));
        assert!(!summary.is_acked(12));
    }

    #[test]
    fn test_summary_across_wraparound() {
        let window = window_with(&[65534, 65535, 1]);
        let summary = generate_ack_summary(&window);
        assert_eq!(summary.ack, 1);
        assert_eq!(summary.ack_bits, 0b1101);
        assert!(summary.is_acked(65534));
        assert!(!summary.is_acked(0));
    }

    #[test]
    fn test_only_last_32_are_reported() {
        let sequences: Vec<u16> = (100..=200).collect();
        let summary = generate_ack_summary(&window_with(&sequences));
        assert_eq!(summary.acked_sequences().count(), 32);
        assert!(summary.is_acked(169));
        assert!(!summary.is_acked(168));
    }
}
