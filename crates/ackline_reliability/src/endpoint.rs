//! # Ack Endpoint
//!
//! Per-connection delivery tracking. Stamps outgoing headers with a fresh
//! sequence and the current ack summary, and turns incoming headers into
//! "packet N was delivered" notifications.
//!
//! ## Flow
//!
//! ```text
//!  LOCAL                                          REMOTE
//!    | write_header()                               |
//!    |   sequence = next, record as un-acked        |
//!    |   ack, ack_bits = summary(received)          |
//!    |--------------- header + body --------------->|
//!    |                                              | read_header()
//!    |                                              |   process acks
//!    |                                              |   insert sequence
//!    |<-------------- header + body ----------------|
//!    | read_header()                                |
//!    |   each newly acked sent packet -> acks queue |
//! ```
//!
//! A sent packet is reported acked at most once. Packets that fall out of
//! the sent window before an ack arrives are never reported.

use std::vec::Drain;

use crate::ack::{generate_ack_summary, AckSummary, ACK_BITS};
use crate::config::ProtocolConfig;
use crate::error::ProtocolResult;
use crate::packets::PacketHeader;
use crate::sequence::SequenceNumber;
use crate::sliding_window::SlidingWindow;

/// Bookkeeping for one sent packet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct SentPacket {
    acked: bool,
}

/// Endpoint statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EndpointCounters {
    /// Headers written.
    pub packets_written: u64,
    /// Headers read.
    pub packets_read: u64,
    /// Sent packets confirmed delivered.
    pub packets_acked: u64,
    /// Received packets too old for the received window.
    pub packets_discarded: u64,
}

/// Sequence and acknowledgment state for one side of a connection.
#[derive(Clone, Debug)]
pub struct AckEndpoint {
    next_sequence: SequenceNumber,
    sent: SlidingWindow<SentPacket>,
    received: SlidingWindow<()>,
    acks: Vec<SequenceNumber>,
    counters: EndpointCounters,
}

impl AckEndpoint {
    /// Creates an endpoint whose windows hold `config.sliding_window_size`
    /// packets.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidWindowCapacity`](crate::ProtocolError::InvalidWindowCapacity)
    /// if the window size is out of range.
    pub fn new(config: &ProtocolConfig) -> ProtocolResult<Self> {
        Self::with_window_size(config.sliding_window_size)
    }

    /// Creates an endpoint with explicit window capacity.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidWindowCapacity`](crate::ProtocolError::InvalidWindowCapacity)
    /// unless `1 <= window_size <= 32766`.
    pub fn with_window_size(window_size: usize) -> ProtocolResult<Self> {
        Ok(Self {
            next_sequence: 0,
            sent: SlidingWindow::new(window_size)?,
            received: SlidingWindow::new(window_size)?,
            acks: Vec::with_capacity(usize::from(ACK_BITS)),
            counters: EndpointCounters::default(),
        })
    }

    /// Sequence the next written header will carry.
    #[inline]
    #[must_use]
    pub const fn next_sequence(&self) -> SequenceNumber {
        self.next_sequence
    }

    /// Ack summary of everything received so far.
    #[must_use]
    pub fn ack_summary(&self) -> AckSummary {
        generate_ack_summary(&self.received)
    }

    /// Statistics.
    #[inline]
    #[must_use]
    pub const fn counters(&self) -> &EndpointCounters {
        &self.counters
    }

    /// Returns true if the sent packet `sequence` has been acked and is
    /// still in the sent window.
    #[must_use]
    pub fn is_acked(&self, sequence: SequenceNumber) -> bool {
        self.sent.find(sequence).is_some_and(|packet| packet.acked)
    }

    /// Builds the header for the next outgoing packet.
    pub fn write_header(&mut self) -> PacketHeader {
        let sequence = self.next_sequence;
        self.next_sequence = sequence.wrapping_add(1);
        self.sent.insert(sequence, SentPacket::default());

        let summary = self.ack_summary();
        self.counters.packets_written += 1;

        tracing::trace!(
            sequence,
            ack = summary.ack,
            ack_bits = summary.ack_bits,
            "header written"
        );

        PacketHeader::new(sequence, summary.ack, summary.ack_bits)
    }

    /// Processes an incoming header.
    ///
    /// The header's acks are always applied. Returns `false` if the packet
    /// itself is too old for the received window; the caller should then
    /// drop its body.
    pub fn read_header(&mut self, header: &PacketHeader) -> bool {
        self.process_acks(header.ack_summary());
        self.counters.packets_read += 1;

        if !self.received.insert(header.sequence, ()) {
            self.counters.packets_discarded += 1;
            tracing::debug!(
                sequence = header.sequence,
                latest = self.received.get_sequence(),
                "discarding stale packet"
            );
            return false;
        }
        true
    }

    /// Takes the sequences acked since the last call, in the order they
    /// were confirmed.
    pub fn drain_acks(&mut self) -> Drain<'_, SequenceNumber> {
        self.acks.drain(..)
    }

    /// Returns to the freshly constructed state.
    pub fn reset(&mut self) {
        self.next_sequence = 0;
        self.sent.reset();
        self.received.reset();
        self.acks.clear();
        self.counters = EndpointCounters::default();
        tracing::debug!("endpoint reset");
    }

    fn process_acks(&mut self, summary: AckSummary) {
        for sequence in summary.acked_sequences() {
            if let Some(packet) = self.sent.find_mut(sequence) {
                if !packet.acked {
                    packet.acked = true;
                    self.acks.push(sequence);
                    self.counters.packets_acked += 1;
                    tracing::trace!(sequence, "packet acked");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> AckEndpoint {
        AckEndpoint::new(&ProtocolConfig::default()).unwrap()
    }

    #[test]
    fn test_sequences_increment() {
        let mut endpoint = endpoint();
        assert_eq!(endpoint.write_header().sequence, 0);
        assert_eq!(endpoint.write_header().sequence, 1);
        assert_eq!(endpoint.next_sequence(), 2);
        assert_eq!(endpoint.counters().packets_written, 2);
    }

    #[test]
    fn test_acks_reported_once() {
        let mut sender = endpoint();
        let mut receiver = endpoint();

        for _ in 0..3 {
            let header = sender.write_header();
            assert!(receiver.read_header(&header));
        }

        let reply = receiver.write_header();
        assert_eq!((reply.ack, reply.ack_bits), (2, 0b111));

        assert!(sender.read_header(&reply));
        let mut acked: Vec<_> = sender.drain_acks().collect();
        acked.sort_unstable();
        assert_eq!(acked, vec![0, 1, 2]);
        assert_eq!(sender.counters().packets_acked, 3);
        assert!(sender.is_acked(1));

        // the same acks again are not new
        let again = receiver.write_header();
        sender.read_header(&again);
        assert_eq!(sender.drain_acks().count(), 0);
        assert_eq!(sender.counters().packets_acked, 3);
    }

    #[test]
    fn test_lost_packet_is_never_acked() {
        let mut sender = endpoint();
        let mut receiver = endpoint();

        for sequence in 0..5u16 {
            let header = sender.write_header();
            if sequence != 3 {
                receiver.read_header(&header);
            }
        }

        sender.read_header(&receiver.write_header());
        let acked: Vec<_> = sender.drain_acks().collect();
        assert_eq!(acked.len(), 4);
        assert!(!acked.contains(&3));
        assert!(!sender.is_acked(3));
    }

    #[test]
    fn test_unknown_acks_are_ignored() {
        let mut endpoint = endpoint();
        endpoint.read_header(&PacketHeader::new(0, 40, 0xFFFF_FFFF));
        assert_eq!(endpoint.drain_acks().count(), 0);
        assert_eq!(endpoint.counters().packets_acked, 0);
    }

    #[test]
    fn test_stale_packet_is_discarded() {
        let mut endpoint = AckEndpoint::with_window_size(32).unwrap();
        assert!(endpoint.read_header(&PacketHeader::new(100, 0, 0)));
        assert!(!endpoint.read_header(&PacketHeader::new(60, 0, 0)));
        assert_eq!(endpoint.counters().packets_read, 2);
        assert_eq!(endpoint.counters().packets_discarded, 1);
        assert_eq!(endpoint.ack_summary(), AckSummary::new(100, 1));
    }

    #[test]
    fn test_acks_from_discarded_packet_still_count() {
        let mut endpoint = AckEndpoint::with_window_size(32).unwrap();
        endpoint.write_header();
        assert!(endpoint.read_header(&PacketHeader::new(100, 0, 0)));
        assert!(!endpoint.read_header(&PacketHeader::new(10, 0, 1)));
        assert_eq!(endpoint.drain_acks().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_reset() {
        let mut endpoint = endpoint();
        endpoint.write_header();
        endpoint.read_header(&PacketHeader::new(7, 0, 1));
        endpoint.reset();

        assert_eq!(endpoint.next_sequence(), 0);
        assert_eq!(*endpoint.counters(), EndpointCounters::default());
        assert_eq!(endpoint.ack_summary(), AckSummary::default());
        assert_eq!(endpoint.drain_acks().count(), 0);
        assert!(!endpoint.is_acked(0));
    }
}
