//! # Protocol Configuration
//!
//! Settings both ends of a connection must agree on, loaded from TOML.
//!
//! ```toml
//! protocol_id = 0x41434B4C
//! max_packet_size = 1200
//! sliding_window_size = 256
//! ```
//!
//! Missing keys fall back to their defaults. Unknown keys are rejected.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ack::ACK_BITS;
use crate::error::{ProtocolError, ProtocolResult};
use crate::sliding_window::SlidingWindow;

/// Protocol settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    /// Magic prefixed to every datagram. Packets with another id are
    /// rejected on read.
    pub protocol_id: u32,
    /// Largest datagram, in bytes.
    pub max_packet_size: usize,
    /// Capacity of the sent and received packet windows.
    pub sliding_window_size: usize,
}

impl ProtocolConfig {
    /// Default protocol id, ASCII `ACKL`.
    pub const DEFAULT_PROTOCOL_ID: u32 = 0x4143_4B4C;
    /// Default datagram limit, safely under a typical MTU.
    pub const DEFAULT_MAX_PACKET_SIZE: usize = 1200;
    /// Default window capacity.
    pub const DEFAULT_SLIDING_WINDOW_SIZE: usize = 256;

    /// Smallest datagram limit accepted.
    pub const MIN_PACKET_SIZE: usize = 16;
    /// Largest datagram limit accepted.
    pub const MAX_PACKET_SIZE: usize = 65536;

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::ConfigParse`] for malformed TOML or unknown keys,
    /// [`ProtocolError::InvalidConfig`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> ProtocolResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> ProtocolResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            protocol_id = config.protocol_id,
            window = config.sliding_window_size,
            "loaded protocol config"
        );
        Ok(config)
    }

    /// Checks every value against its accepted range.
    ///
    /// The window must hold at least a full ack bitfield's worth of
    /// sequences, or acks for packets still in flight would be lost.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> ProtocolResult<()> {
        if !(Self::MIN_PACKET_SIZE..=Self::MAX_PACKET_SIZE).contains(&self.max_packet_size) {
            return Err(ProtocolError::InvalidConfig(format!(
                "max_packet_size {} outside {}..={}",
                self.max_packet_size,
                Self::MIN_PACKET_SIZE,
                Self::MAX_PACKET_SIZE
            )));
        }

        let min_window = usize::from(ACK_BITS);
        let max_window = SlidingWindow::<()>::MAX_CAPACITY;
        if !(min_window..=max_window).contains(&self.sliding_window_size) {
            return Err(ProtocolError::InvalidConfig(format!(
                "sliding_window_size {} outside {min_window}..={max_window}",
                self.sliding_window_size
            )));
        }

        Ok(())
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            protocol_id: Self::DEFAULT_PROTOCOL_ID,
            max_packet_size: Self::DEFAULT_MAX_PACKET_SIZE,
            sliding_window_size: Self::DEFAULT_SLIDING_WINDOW_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProtocolConfig::default();
        assert_eq!(config.protocol_id, 0x4143_4B4C);
        assert_eq!(config.max_packet_size, 1200);
        assert_eq!(config.sliding_window_size, 256);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config = ProtocolConfig::from_toml_str("sliding_window_size = 1024\n").unwrap();
        assert_eq!(config.sliding_window_size, 1024);
        assert_eq!(config.max_packet_size, 1200);
        assert_eq!(config.protocol_id, ProtocolConfig::DEFAULT_PROTOCOL_ID);

        let empty = ProtocolConfig::from_toml_str("").unwrap();
        assert_eq!(empty, ProtocolConfig::default());
    }

    #[test]
    fn test_full_document() {
        let text = "protocol_id = 0x12345678\nmax_packet_size = 512\nsliding_window_size = 32\n";
        let config = ProtocolConfig::from_toml_str(text).unwrap();
        assert_eq!(
            config,
            ProtocolConfig {
                protocol_id: 0x1234_5678,
                max_packet_size: 512,
                sliding_window_size: 32,
            }
        );
    }

    #[test]
    fn test_out_of_range_values() {
        for text in [
            "sliding_window_size = 31",
            "sliding_window_size = 32767",
            "max_packet_size = 15",
            "max_packet_size = 65537",
        ] {
            assert!(
                matches!(
                    ProtocolConfig::from_toml_str(text),
                    Err(ProtocolError::InvalidConfig(_))
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn test_largest_window_is_usable() {
        let config = ProtocolConfig::from_toml_str("sliding_window_size = 32766\n").unwrap();
        let mut endpoint = crate::AckEndpoint::new(&config).unwrap();
        for sequence in 0..4u16 {
            assert!(endpoint.read_header(&crate::PacketHeader::new(sequence, 0, 0)));
        }
        assert_eq!(endpoint.ack_summary().ack, 3);
        assert_eq!(endpoint.ack_summary().ack_bits, 0b1111);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            ProtocolConfig::from_toml_str("window = 64"),
            Err(ProtocolError::ConfigParse(_))
        ));
        assert!(matches!(
            ProtocolConfig::from_toml_str("protocol_id = \"acks\""),
            Err(ProtocolError::ConfigParse(_))
        ));
        assert!(matches!(
            ProtocolConfig::from_toml_str("protocol_id = -1"),
            Err(ProtocolError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "ackline_config_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "max_packet_size = 256\n").unwrap();
        let config = ProtocolConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.max_packet_size, 256);

        assert!(matches!(
            ProtocolConfig::load(&path),
            Err(ProtocolError::Io(_))
        ));
    }
}
