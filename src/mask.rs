/// Largest bitmask in bytes: 255 channels round up to 32 bytes.
pub const MAX_MASK_BYTES: usize = 32;

/// Number of bitmask bytes needed for `channels` channels.
#[inline]
pub fn mask_len(channels: usize) -> usize {
    (channels + 7) / 8
}

/// Channel bitmask, one bit per channel.
///
/// Channel `c` lives in bit `c % 8` of byte `c / 8`. Storage is a fixed stack
/// array sized for the 255-channel maximum; only the first `len` bytes are on
/// the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelMask {
    bits: [u8; MAX_MASK_BYTES],
    len: usize,
}

impl ChannelMask {
    pub fn new(channels: usize) -> Self {
        Self {
            bits: [0; MAX_MASK_BYTES],
            len: mask_len(channels),
        }
    }

    /// Rebuild a mask from its wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut bits = [0; MAX_MASK_BYTES];
        let len = bytes.len().min(MAX_MASK_BYTES);
        bits[..len].copy_from_slice(&bytes[..len]);
        Self { bits, len }
    }

    #[inline]
    pub fn set(&mut self, channel: usize) {
        self.bits[channel / 8] |= 1 << (channel % 8);
    }

    #[inline]
    pub fn contains(&self, channel: usize) -> bool {
        self.bits[channel / 8] & (1 << (channel % 8)) != 0
    }

    pub fn union_with(&mut self, other: &ChannelMask) {
        for (dst, src) in self.bits.iter_mut().zip(other.bits.iter()) {
            *dst |= *src;
        }
    }

    pub fn count_ones(&self) -> usize {
        self.as_bytes().iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().iter().all(|&b| b == 0)
    }

    /// Whether every set bit names a channel below `channels`.
    pub fn within(&self, channels: usize) -> bool {
        self.iter(channels).count() == self.count_ones()
    }

    /// Set channels in ascending order, restricted to the first `channels`.
    pub fn iter(&self, channels: usize) -> impl Iterator<Item = usize> + '_ {
        (0..channels).filter(move |&c| self.contains(c))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits[..self.len]
    }
}
