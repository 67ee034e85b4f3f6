use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the encoder, the decoder and configuration loading.
///
/// Every configuration error is reported before the output buffer is touched.
#[derive(Error, Debug)]
pub enum Error {
    #[error("channel count must be in 1..=255, got {0}")]
    InvalidChannels(usize),

    #[error("eps must be a non-negative number, got {0}")]
    InvalidEpsilon(f32),

    #[error("sample buffer of {len} floats is not a whole number of {channels}-channel columns")]
    MisalignedSamples { len: usize, channels: usize },

    #[error("cursor {pos} is not a column boundary within {len} samples of {channels} channels")]
    InvalidCursor {
        pos: usize,
        len: usize,
        channels: usize,
    },

    #[error("capacity {capacity} cannot hold the {needed}-byte header and bitmask")]
    CapacityTooSmall { capacity: usize, needed: usize },

    #[error("output buffer holds {len} bytes but capacity is {capacity}")]
    BufferTooSmall { len: usize, capacity: usize },

    /// The column at `pos` has more active channels than a packet has float slots.
    #[error(
        "column at {pos} has {active} active channels but a packet fits {float_capacity} floats"
    )]
    ColumnTooWide {
        pos: usize,
        active: usize,
        float_capacity: usize,
    },

    #[error("packet truncated: {len} bytes, header needs {needed}")]
    Truncated { len: usize, needed: usize },

    #[error("packet bitmask sets bits for channels at or above {0}")]
    StrayMaskBits(usize),

    #[error("packet carries negative skip count {0}")]
    NegativeSkip(i16),

    #[error(
        "packet value region of {bytes} bytes is not a whole number of {stride}-byte columns"
    )]
    RaggedPayload { bytes: usize, stride: usize },

    #[error("unknown encoder kind {0:#04x}")]
    UnknownEncoder(u8),

    #[error("config: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
