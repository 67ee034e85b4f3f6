use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::encoder::{check_capacity, check_channels, check_eps};
use crate::error::{Error, Result};
use crate::kind::EncoderKind;
use crate::wire::{endian_tag, WIRE_VERSION};

/// IPv4 UDP payload that fits a 1500-byte Ethernet MTU.
pub const DEFAULT_CAPACITY: usize = 1472;

/// Per-stream encoding parameters
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    pub channels: u8,
    pub eps: f32,
    /// Datagram payload size in bytes.
    pub capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            eps: 1e-4,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl StreamConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        check_channels(self.channels)?;
        check_eps(self.eps)?;
        check_capacity(self.channels, self.capacity)
    }
}

/// Session handshake sent as JSON ahead of the packet stream
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Hello {
    pub v: u8,
    /// [`EncoderKind`] tag.
    pub encoder: u8,
    /// Wire byte order: "le" or "be".
    pub endian: String,
    pub config: StreamConfig,
    /// Columns the stream will carry.
    pub columns: u64,
}

impl Hello {
    pub fn new(encoder: EncoderKind, config: StreamConfig, columns: u64) -> Self {
        Self {
            v: WIRE_VERSION,
            encoder: encoder as u8,
            endian: endian_tag().to_string(),
            config,
            columns,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let hello: Self = serde_json::from_slice(data)?;
        hello.kind()?;
        hello.config.validate()?;
        Ok(hello)
    }

    pub fn kind(&self) -> Result<EncoderKind> {
        EncoderKind::from_u8(self.encoder).ok_or(Error::UnknownEncoder(self.encoder))
    }

    /// Whether packets from this peer can be read locally.
    pub fn compatible(&self) -> bool {
        self.v == WIRE_VERSION && self.endian == endian_tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = StreamConfig::from_json(r#"{"channels": 16}"#).unwrap();
        assert_eq!(config.channels, 16);
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.eps, StreamConfig::default().eps);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            StreamConfig::from_json(r#"{"channels": 0}"#),
            Err(Error::InvalidChannels(0))
        ));
        assert!(matches!(
            StreamConfig::from_json(r#"{"eps": -0.5}"#),
            Err(Error::InvalidEpsilon(_))
        ));
        assert!(matches!(
            StreamConfig::from_json(r#"{"channels": 9, "capacity": 6}"#),
            Err(Error::CapacityTooSmall { capacity: 6, needed: 8 })
        ));
        assert!(matches!(StreamConfig::from_json(r#"{"channels": 300}"#), Err(Error::Config(_))));
        assert!(matches!(StreamConfig::from_json("not json"), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(StreamConfig::load("/nonexistent/stream.json"), Err(Error::Io(_))));
    }

    #[test]
    fn test_hello_exchange() {
        let config = StreamConfig {
            channels: 8,
            eps: 0.01,
            capacity: 512,
        };
        let hello = Hello::new(EncoderKind::PrefixBitmask, config, 1000);
        let back = Hello::from_bytes(&hello.to_bytes().unwrap()).unwrap();
        assert_eq!(back, hello);
        assert!(back.compatible());
        assert_eq!(back.kind().unwrap(), EncoderKind::PrefixBitmask);

        let mut foreign = hello.clone();
        foreign.endian = if endian_tag() == "le" { "be" } else { "le" }.to_string();
        assert!(!foreign.compatible());

        let mut unknown = hello;
        unknown.encoder = 0x7f;
        assert!(matches!(
            Hello::from_bytes(&unknown.to_bytes().unwrap()),
            Err(Error::UnknownEncoder(0x7f))
        ));
    }
}
