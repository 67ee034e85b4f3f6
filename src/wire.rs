//! Packet layout shared by the encoder and decoder.
//!
//! ```text
//! [2B skip_count]            # i16, all-zero columns skipped before the span
//! [ceil(C/8)B bitmask]       # bit c set = channel c active somewhere in the span
//! [cols * popcount * 4B]     # f32 values, column-major, channels ascending
//! ```
//!
//! Integers and floats are written in [`WireEndian`] order.

use byteorder::{ByteOrder, NativeEndian};

use crate::error::{Error, Result};
use crate::mask::{mask_len, ChannelMask};

/// Byte order of every multi-byte field on the wire (host order).
pub type WireEndian = NativeEndian;

/// Wire format revision announced in the session handshake.
pub const WIRE_VERSION: u8 = 1;

pub const SKIP_BYTES: usize = std::mem::size_of::<i16>();
pub const VALUE_BYTES: usize = std::mem::size_of::<f32>();

/// Longest zero run a single packet can skip.
pub const MAX_SKIP: usize = i16::MAX as usize;

/// Bytes taken by the skip counter plus the bitmask.
#[inline]
pub fn header_len(channels: usize) -> usize {
    SKIP_BYTES + mask_len(channels)
}

/// Total packet size for `cols` columns of `active` channels.
#[inline]
pub fn packet_len(channels: usize, cols: usize, active: usize) -> usize {
    header_len(channels) + cols * active * VALUE_BYTES
}

/// Tag naming the wire byte order, for the handshake.
pub fn endian_tag() -> &'static str {
    if cfg!(target_endian = "little") {
        "le"
    } else {
        "be"
    }
}

/// Write skip counter and bitmask. Returns bytes written.
pub fn write_header(buf: &mut [u8], skip_count: i16, mask: &ChannelMask) -> usize {
    WireEndian::write_i16(&mut buf[..SKIP_BYTES], skip_count);
    let bytes = mask.as_bytes();
    buf[SKIP_BYTES..SKIP_BYTES + bytes.len()].copy_from_slice(bytes);
    SKIP_BYTES + bytes.len()
}

/// Read skip counter and bitmask from the front of a packet.
pub fn read_header(packet: &[u8], channels: usize) -> Result<(i16, ChannelMask)> {
    let needed = header_len(channels);
    if packet.len() < needed {
        return Err(Error::Truncated {
            len: packet.len(),
            needed,
        });
    }
    let skip_count = WireEndian::read_i16(&packet[..SKIP_BYTES]);
    let mask = ChannelMask::from_bytes(&packet[SKIP_BYTES..needed]);
    Ok((skip_count, mask))
}
