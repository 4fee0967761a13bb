//! # ACKLINE Codec - Bit-Packed Serialization
//!
//! Compact binary serialization for real-time UDP protocols.
//!
//! ## Architecture
//!
//! - **Bit packer**: fixed-width fields (1-32 bits) packed into a borrowed
//!   byte buffer through a 64-bit scratch register
//! - **Range compression**: integers cost only the bits spanning their
//!   declared `[min, max]`
//! - **Streams**: one serialize routine per message, run as a write, read
//!   or measure pass
//! - **Helpers**: fixed-width integers, floats, quantized floats, strings
//!   and delta-encoded integers, all written against [`Stream`]
//!
//! ## Performance Guarantees
//!
//! - Zero heap allocations while writing, reading or measuring fixed fields
//! - No `unsafe`
//! - A measure pass reports exactly the bits a write pass commits
//!
//! ## Example
//!
//! ```rust
//! use ackline_codec::{decode, encode, measure, CodecResult, Serializable, Stream};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Move {
//!     x: i32,
//!     y: i32,
//!     running: bool,
//! }
//!
//! impl Serializable for Move {
//!     fn serialize<S: Stream>(&mut self, stream: &mut S) -> CodecResult<()> {
//!         stream.serialize_int(&mut self.x, -512, 511)?;
//!         stream.serialize_int(&mut self.y, -512, 511)?;
//!         stream.serialize_bool(&mut self.running)
//!     }
//! }
//!
//! let mut message = Move { x: -40, y: 300, running: true };
//! assert_eq!(measure(&mut message).unwrap(), 21);
//!
//! let mut buffer = [0u8; 16];
//! let bytes = encode(&mut message, &mut buffer).unwrap();
//! assert_eq!(bytes, 3);
//!
//! let read: Move = decode(&buffer[..bytes]).unwrap();
//! assert_eq!(read, message);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod bitpacker;
pub mod error;
pub mod range;
pub mod serialize;
pub mod stream;

// Re-exports for convenience
pub use bitpacker::{BitReader, BitWriter};
pub use error::{CodecError, CodecResult};
pub use range::{bits_required, IntegerRange, RangedInt};
pub use stream::{
    decode, encode, measure, Direction, MeasureStream, ReadStream, Serializable, Stream,
    WriteStream,
};

#[cfg(feature = "validation")]
pub use stream::recording::{validate_round_trip, RecordedValue, RecordingStream, ReplayStream};
