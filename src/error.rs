use std::{io, path::PathBuf};
use thiserror::Error;

/// Reasons an inbound datagram is rejected by the codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("packet of {size} bytes is shorter than the header")]
    TooShort { size: usize },

    #[error("unexpected magic {0:#010x}")]
    BadMagic(u32),

    #[error("unsupported protocol version {0}")]
    BadVersion(u16),

    #[error("unknown payload type {0:#010x}")]
    UnknownType(u32),

    #[error("declared payload length {declared} does not match expected {expected}")]
    LengthMismatch { declared: u16, expected: u16 },

    #[error("packet of {size} bytes is shorter than the {expected} bytes its type requires")]
    Truncated { size: usize, expected: usize },

    #[error("checksum mismatch: declared {declared:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { declared: u32, computed: u32 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_error_messages() {
        let err = PacketError::TooShort { size: 3 };
        assert_eq!(err.to_string(), "packet of 3 bytes is shorter than the header");

        let err = PacketError::BadMagic(0x4355_5344);
        assert_eq!(err.to_string(), "unexpected magic 0x43555344");
    }
}
