//! # Packet Definitions
//!
//! Every datagram carries a fixed header followed by one packet body.
//!
//! ## Wire Layout
//!
//! ```text
//!  ┌─────────────┬──────────┬─────┬──────────┬─────┬───────────────┐
//!  │ protocol id │ sequence │ ack │ ack_bits │ tag │ body          │
//!  │ 32 bits     │ 16       │ 16  │ 32       │ 2   │ per-type      │
//!  └─────────────┴──────────┴─────┴──────────┴─────┴───────────────┘
//! ```
//!
//! The protocol id is a magic check: a datagram from another protocol, or
//! another version of this one, fails to decode instead of being
//! misinterpreted. Bodies are range-compressed, so a `Connect` costs 15
//! bits and a `Connection` (ack-only) packet costs nothing past its tag.

use ackline_codec::serialize::{serialize_u16, serialize_u32};
use ackline_codec::{
    CodecError, CodecResult, MeasureStream, ReadStream, Serializable, Stream, WriteStream,
};

use crate::ack::AckSummary;
use crate::config::ProtocolConfig;
use crate::error::ProtocolResult;
use crate::sequence::{AckBitfield, SequenceNumber};

/// Packet header - present in every packet.
///
/// Total size: 64 bits
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PacketHeader {
    /// Sequence number of this packet.
    pub sequence: SequenceNumber,
    /// Most recent sequence received from the remote end.
    pub ack: SequenceNumber,
    /// Bit `i` set iff `ack - i` was received.
    pub ack_bits: AckBitfield,
}

impl PacketHeader {
    /// Size of the header in bits.
    pub const BITS: usize = 64;

    /// Creates a new packet header.
    #[inline]
    #[must_use]
    pub const fn new(sequence: SequenceNumber, ack: SequenceNumber, ack_bits: AckBitfield) -> Self {
        Self {
            sequence,
            ack,
            ack_bits,
        }
    }

    /// The ack fields of this header as a summary.
    #[inline]
    #[must_use]
    pub const fn ack_summary(&self) -> AckSummary {
        AckSummary::new(self.ack, self.ack_bits)
    }
}

impl Serializable for PacketHeader {
    fn serialize<S: Stream>(&mut self, stream: &mut S) -> CodecResult<()> {
        serialize_u16(stream, &mut self.sequence)?;
        serialize_u16(stream, &mut self.ack)?;
        serialize_u32(stream, &mut self.ack_bits)
    }
}

/// Types of packets in the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Header only; carries acks when there is nothing else to send.
    Connection = 0,
    /// Connection request.
    Connect = 1,
    /// Periodic state update.
    Update = 2,
    /// Disconnect notification.
    Disconnect = 3,
}

impl PacketType {
    /// Number of packet types; tags are `0..COUNT`.
    pub const COUNT: u8 = 4;

    /// Looks up a wire tag.
    ///
    /// # Errors
    ///
    /// [`CodecError::UnknownPacketType`] for a tag with no packet type.
    pub const fn from_tag(tag: u8) -> CodecResult<Self> {
        match tag {
            0 => Ok(Self::Connection),
            1 => Ok(Self::Connect),
            2 => Ok(Self::Update),
            3 => Ok(Self::Disconnect),
            other => Err(CodecError::UnknownPacketType(other as i64)),
        }
    }
}

/// A packet body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Packet {
    /// Header-only packet.
    #[default]
    Connection,
    /// Connection request. Each field is in `[-10, 10]`.
    Connect {
        /// First parameter.
        a: i32,
        /// Second parameter.
        b: i32,
        /// Third parameter.
        c: i32,
    },
    /// Periodic update.
    Update {
        /// Sender's 16-bit timestamp.
        timestamp: u16,
    },
    /// Disconnect notification. `x` is in `[-100, 100]`.
    Disconnect {
        /// Reason code.
        x: i32,
    },
}

impl Packet {
    /// The type tag of this packet.
    #[inline]
    #[must_use]
    pub const fn packet_type(&self) -> PacketType {
        match self {
            Self::Connection => PacketType::Connection,
            Self::Connect { .. } => PacketType::Connect,
            Self::Update { .. } => PacketType::Update,
            Self::Disconnect { .. } => PacketType::Disconnect,
        }
    }

    /// A zeroed packet of the given type, ready to be read into.
    #[must_use]
    pub const fn empty(packet_type: PacketType) -> Self {
        match packet_type {
            PacketType::Connection => Self::Connection,
            PacketType::Connect => Self::Connect { a: 0, b: 0, c: 0 },
            PacketType::Update => Self::Update { timestamp: 0 },
            PacketType::Disconnect => Self::Disconnect { x: 0 },
        }
    }
}

impl Serializable for Packet {
    fn serialize<S: Stream>(&mut self, stream: &mut S) -> CodecResult<()> {
        let mut tag = self.packet_type() as u8;
        stream.serialize_int(&mut tag, 0, PacketType::COUNT - 1)?;
        if S::DIRECTION.is_reading() {
            *self = Self::empty(PacketType::from_tag(tag)?);
        }

        match self {
            Self::Connection => {}
            Self::Connect { a, b, c } => {
                stream.serialize_int(a, -10, 10)?;
                stream.serialize_int(b, -10, 10)?;
                stream.serialize_int(c, -10, 10)?;
            }
            Self::Update { timestamp } => serialize_u16(stream, timestamp)?,
            Self::Disconnect { x } => stream.serialize_int(x, -100, 100)?,
        }
        Ok(())
    }
}

/// A full datagram: protocol id check, header, body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Datagram {
    protocol_id: u32,
    header: PacketHeader,
    packet: Packet,
}

impl Serializable for Datagram {
    fn serialize<S: Stream>(&mut self, stream: &mut S) -> CodecResult<()> {
        stream.serialize_check(self.protocol_id)?;
        stream.serialize_object(&mut self.header)?;
        stream.serialize_object(&mut self.packet)
    }
}

/// Encodes and decodes datagrams for one protocol id.
///
/// Owns a transmit buffer of `max_packet_size` bytes, reused for every
/// write.
#[derive(Clone, Debug)]
pub struct PacketCodec {
    protocol_id: u32,
    buffer: Vec<u8>,
}

impl PacketCodec {
    /// Creates a codec for `config`.
    #[must_use]
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            protocol_id: config.protocol_id,
            buffer: vec![0u8; config.max_packet_size],
        }
    }

    /// Protocol id written to and expected on every datagram.
    #[inline]
    #[must_use]
    pub const fn protocol_id(&self) -> u32 {
        self.protocol_id
    }

    /// Largest datagram this codec will produce.
    #[inline]
    #[must_use]
    pub fn max_packet_size(&self) -> usize {
        self.buffer.len()
    }

    /// Encoded size of a datagram in bits, without writing it.
    ///
    /// # Errors
    ///
    /// A range violation in the packet body.
    pub fn measure(&self, header: PacketHeader, packet: Packet) -> ProtocolResult<usize> {
        let mut datagram = self.datagram(header, packet);
        let mut stream = MeasureStream::new();
        datagram.serialize(&mut stream)?;
        Ok(stream.bits_processed())
    }

    /// Encodes a datagram into the transmit buffer and returns the bytes
    /// to send.
    ///
    /// # Errors
    ///
    /// A range violation in the packet body, or a datagram larger than
    /// `max_packet_size`.
    pub fn write(&mut self, header: PacketHeader, packet: Packet) -> ProtocolResult<&[u8]> {
        let mut datagram = self.datagram(header, packet);
        let mut stream = WriteStream::new(&mut self.buffer);
        datagram.serialize(&mut stream)?;
        let bytes = stream.flush()?;
        Ok(&self.buffer[..bytes])
    }

    /// Decodes a received datagram.
    ///
    /// # Errors
    ///
    /// [`CodecError::CheckMismatch`] for another protocol id, otherwise
    /// truncation or corruption errors from the codec.
    pub fn read(&self, data: &[u8]) -> ProtocolResult<(PacketHeader, Packet)> {
        let mut datagram = self.datagram(PacketHeader::default(), Packet::default());
        let mut stream = ReadStream::new(data);
        datagram.serialize(&mut stream)?;
        Ok((datagram.header, datagram.packet))
    }

    const fn datagram(&self, header: PacketHeader, packet: Packet) -> Datagram {
        Datagram {
            protocol_id: self.protocol_id,
            header,
            packet,
        }
    }
}
