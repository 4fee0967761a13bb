//! # Reliability Error Types
//!
//! All errors that can occur above the codec: window construction,
//! configuration and packet encoding.
//!
//! A sequence that is too old for its window is not an error. It is the
//! `false` returned by [`SlidingWindow::insert`](crate::SlidingWindow::insert).

use ackline_codec::CodecError;
use thiserror::Error;

/// Errors that can occur in the reliability layer.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Encoding or decoding a packet failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A sliding window capacity outside `1..=32766`.
    #[error("invalid sliding window capacity {0} (expected 1..=32766)")]
    InvalidWindowCapacity(usize),

    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file is not valid TOML for [`ProtocolConfig`](crate::ProtocolConfig).
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Reading a configuration file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for reliability operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
