//! # ACKLINE Reliability - Delivery Tracking over UDP
//!
//! Knows which packets arrived, on top of an unreliable datagram transport.
//!
//! ## Architecture
//!
//! - **Sequence arithmetic**: 16-bit sequence ordering that survives
//!   wraparound
//! - **Sliding window**: fixed-capacity ring of recent sequence-indexed
//!   entries
//! - **Ack generation**: latest received sequence plus a 32-bit history,
//!   stamped on every outgoing header
//! - **Endpoint**: per-connection sequence assignment and ack processing
//! - **Packets**: bit-packed header and bodies via `ackline_codec`
//! - **Simulation**: seeded lossy links and a soak harness
//!
//! ## Flow
//!
//! ```text
//!  write_header() ──▶ PacketCodec::write ──▶ [ wire ] ──▶ PacketCodec::read
//!                                                               │
//!  drain_acks() ◀── process acks ◀────────── read_header() ◀────┘
//! ```
//!
//! Retransmission, congestion control and channels are left to the layer
//! that consumes the acks.
//!
//! ## Example
//!
//! ```rust
//! use ackline_reliability::{AckEndpoint, Packet, PacketCodec, ProtocolConfig};
//!
//! let config = ProtocolConfig::default();
//! let mut client = AckEndpoint::new(&config).unwrap();
//! let mut server = AckEndpoint::new(&config).unwrap();
//! let mut codec = PacketCodec::new(&config);
//!
//! let header = client.write_header();
//! let datagram = codec.write(header, Packet::Update { timestamp: 100 }).unwrap().to_vec();
//!
//! let (header, packet) = codec.read(&datagram).unwrap();
//! assert!(server.read_header(&header));
//! assert_eq!(packet, Packet::Update { timestamp: 100 });
//!
//! client.read_header(&server.write_header());
//! assert_eq!(client.drain_acks().collect::<Vec<_>>(), vec![0]);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod ack;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod packets;
pub mod sequence;
pub mod simulation;
pub mod sliding_window;

// Re-exports for convenience
pub use ack::{generate_ack_summary, AckSummary};
pub use config::ProtocolConfig;
pub use endpoint::{AckEndpoint, EndpointCounters};
pub use error::{ProtocolError, ProtocolResult};
pub use packets::{Packet, PacketCodec, PacketHeader, PacketType};
pub use sequence::{greater_than, less_than, sequence_difference, AckBitfield, SequenceNumber};
pub use simulation::{LinkStats, LossyLink, NetworkConditions, SoakConfig, SoakHarness, SoakReport};
pub use sliding_window::SlidingWindow;
