//! Sparse multi-channel sample framing for fixed-size datagrams.
//!
//! A sample buffer is a row-major matrix of `channels` floats per column.
//! [`Encoder::encode`] turns the columns starting at a cursor into exactly one
//! packet no larger than the datagram capacity, skipping runs of near-zero
//! columns and sending only the channels active in the packed span. The caller
//! loops on the returned cursor ([`PacketStream`] does this) and the receiving
//! side rebuilds the matrix with [`StreamDecoder`].

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod kind;
pub mod mask;
pub mod stream;
pub mod wire;

pub use config::{Hello, StreamConfig};
pub use decoder::{decode_packet, Packet, StreamDecoder};
pub use encoder::PrefixBitmaskEncoder;
pub use error::{Error, Result};
pub use kind::EncoderKind;
pub use mask::ChannelMask;
pub use stream::PacketStream;

/// Outcome of one [`Encoder::encode`] call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Encoded {
    /// Flat index of the first column not yet covered; pass it back as `from_pos`.
    pub cursor: usize,
    /// Bytes written at the front of the output buffer.
    pub written: usize,
    /// All-zero columns skipped ahead of the packed span.
    pub skipped: usize,
    /// Columns packed into the payload.
    pub columns: usize,
}

/// A strategy that packs the samples at a cursor into one datagram payload.
pub trait Encoder {
    fn kind(&self) -> EncoderKind;

    /// Encode the columns starting at `from_pos` into `buf[..capacity]`.
    ///
    /// `samples` holds whole columns of `channels` floats and `from_pos` is a
    /// column boundary. A cell is active when `|x| > eps`. Arguments are
    /// validated before anything is written; on error `buf` is untouched.
    fn encode(
        &self,
        samples: &[f32],
        channels: u8,
        eps: f32,
        from_pos: usize,
        buf: &mut [u8],
        capacity: usize,
    ) -> Result<Encoded>;
}
