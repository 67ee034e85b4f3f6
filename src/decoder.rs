//! Receiving side of the wire format.

use std::io::Cursor;

use byteorder::ReadBytesExt;

use crate::error::{Error, Result};
use crate::mask::ChannelMask;
use crate::wire::{header_len, read_header, WireEndian, VALUE_BYTES};

/// One decoded packet
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    pub skip_count: usize,
    pub mask: ChannelMask,
    pub channels: usize,
    /// Columns carried in `values`, inferred from the packet length.
    pub columns: usize,
    /// `columns * mask.count_ones()` floats, column-major.
    pub values: Vec<f32>,
}

impl Packet {
    pub fn active(&self) -> usize {
        self.mask.count_ones()
    }

    /// `(channel, value)` pairs of included column `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k >= self.columns`.
    pub fn column(&self, k: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let active = self.active();
        self.mask
            .iter(self.channels)
            .zip(self.values[k * active..(k + 1) * active].iter().copied())
    }

    /// Append the skipped columns and the included span to a row-major matrix.
    /// Channels outside the mask come back as zero.
    pub fn expand_into(&self, out: &mut Vec<f32>) {
        out.resize(out.len() + (self.skip_count + self.columns) * self.channels, 0.0);
        let span = out.len() - self.columns * self.channels;
        for k in 0..self.columns {
            let base = span + k * self.channels;
            for (channel, value) in self.column(k) {
                out[base + channel] = value;
            }
        }
    }
}

/// Parse a packet produced for `channels` channels.
pub fn decode_packet(packet: &[u8], channels: u8) -> Result<Packet> {
    let c = channels as usize;
    if c == 0 {
        return Err(Error::InvalidChannels(c));
    }

    let (skip, mask) = read_header(packet, c)?;
    if skip < 0 {
        return Err(Error::NegativeSkip(skip));
    }
    if !mask.within(c) {
        return Err(Error::StrayMaskBits(c));
    }

    let body = &packet[header_len(c)..];
    let active = mask.count_ones();
    let stride = active * VALUE_BYTES;
    let ragged = match stride {
        0 => !body.is_empty(),
        _ => body.len() % stride != 0,
    };
    if ragged {
        return Err(Error::RaggedPayload {
            bytes: body.len(),
            stride,
        });
    }
    let columns = body.len().checked_div(stride).unwrap_or(0);

    let mut cursor = Cursor::new(body);
    let mut values = Vec::with_capacity(columns * active);
    for _ in 0..columns * active {
        values.push(cursor.read_f32::<WireEndian>()?);
    }

    Ok(Packet {
        skip_count: skip as usize,
        mask,
        channels: c,
        columns,
        values,
    })
}

/// Rebuilds the sample matrix from packets fed in transmission order.
#[derive(Clone, Debug)]
pub struct StreamDecoder {
    channels: u8,
    samples: Vec<f32>,
}

impl StreamDecoder {
    pub fn new(channels: u8) -> Self {
        Self {
            channels,
            samples: Vec::new(),
        }
    }

    /// Decode and apply one packet, returning it for inspection.
    pub fn push(&mut self, packet: &[u8]) -> Result<Packet> {
        let packet = decode_packet(packet, self.channels)?;
        packet.expand_into(&mut self.samples);
        Ok(packet)
    }

    /// Columns reconstructed so far.
    pub fn columns(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Finish the stream as exactly `total_columns` columns, zero-padding the tail.
    pub fn finish(mut self, total_columns: usize) -> Vec<f32> {
        self.samples.resize(total_columns * self.channels as usize, 0.0);
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use crate::encoder::PrefixBitmaskEncoder;
    use crate::stream::PacketStream;
    use crate::wire::write_header;
    use byteorder::ByteOrder;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn roundtrip(samples: &[f32], config: StreamConfig) -> Vec<f32> {
        let mut decoder = StreamDecoder::new(config.channels);
        for packet in PacketStream::new(PrefixBitmaskEncoder, samples, config).unwrap() {
            decoder.push(&packet.unwrap()).unwrap();
        }
        decoder.finish(samples.len() / config.channels as usize)
    }

    #[test]
    fn test_decode_single_active_cell() {
        let config = StreamConfig {
            channels: 2,
            eps: 0.01,
            capacity: 64,
        };
        let samples = [0.0, 0.0, 0.5, 0.0, 0.0, 0.0];
        assert_eq!(roundtrip(&samples, config), samples.to_vec());
    }

    #[test]
    fn test_decode_packet_fields() {
        let mut mask = ChannelMask::new(3);
        mask.set(0);
        mask.set(2);
        let mut buf = [0u8; 21];
        let n = write_header(&mut buf, 4, &mask);
        for (i, v) in [1.0f32, 2.0, 3.0, 4.0].iter().enumerate() {
            WireEndian::write_f32(&mut buf[n + i * 4..n + i * 4 + 4], *v);
        }

        let packet = decode_packet(&buf[..n + 16], 3).unwrap();
        assert_eq!(packet.skip_count, 4);
        assert_eq!(packet.columns, 2);
        assert_eq!(packet.column(1).collect::<Vec<_>>(), vec![(0, 3.0), (2, 4.0)]);

        let mut out = Vec::new();
        packet.expand_into(&mut out);
        assert_eq!(out.len(), 6 * 3);
        assert!(out[..12].iter().all(|&x| x == 0.0));
        assert_eq!(&out[12..], &[1.0, 0.0, 2.0, 3.0, 0.0, 4.0]);
    }

    #[test]
    fn test_empty_mask_skip_packet() {
        let mut buf = [0u8; 3];
        write_header(&mut buf, 7, &ChannelMask::new(5));
        let packet = decode_packet(&buf, 5).unwrap();
        assert_eq!(packet.skip_count, 7);
        assert_eq!(packet.columns, 0);
        assert!(packet.values.is_empty());
    }

    #[test]
    fn test_malformed_packets() {
        let mut mask = ChannelMask::new(2);
        mask.set(0);
        mask.set(1);
        let mut buf = [0u8; 9];
        write_header(&mut buf, 0, &mask);
        assert!(matches!(
            decode_packet(&buf, 2),
            Err(Error::RaggedPayload { bytes: 6, stride: 8 })
        ));

        let mut buf = [0u8; 7];
        write_header(&mut buf, 0, &ChannelMask::new(2));
        assert!(matches!(
            decode_packet(&buf, 2),
            Err(Error::RaggedPayload { stride: 0, .. })
        ));

        // bit 3 set for a 3-channel stream, with one float of body
        let mut buf = [0u8; 7];
        buf[2] = 0b1000;
        buf[3..].copy_from_slice(&7.5f32.to_ne_bytes());
        assert!(matches!(decode_packet(&buf, 3), Err(Error::StrayMaskBits(3))));
        let mut decoder = StreamDecoder::new(3);
        assert!(decoder.push(&buf).is_err());
        assert_eq!(decoder.columns(), 0);

        let mut buf = [0u8; 3];
        write_header(&mut buf, -1, &ChannelMask::new(2));
        assert!(matches!(decode_packet(&buf, 2), Err(Error::NegativeSkip(-1))));

        assert!(matches!(decode_packet(&[0], 2), Err(Error::Truncated { .. })));
        assert!(matches!(decode_packet(&[0, 0, 0], 0), Err(Error::InvalidChannels(0))));
    }

    #[test]
    fn test_roundtrip_randomized() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let channels: u8 = rng.gen_range(1..=40);
            let c = channels as usize;
            let eps = 0.05;
            let cols = rng.gen_range(0..200);
            let mut samples = vec![0.0f32; c * cols];
            for x in samples.iter_mut() {
                if rng.gen_bool(0.15) {
                    *x = rng.gen_range(-2.0..2.0);
                }
            }
            let config = StreamConfig {
                channels,
                eps,
                capacity: header_len(c) + VALUE_BYTES * rng.gen_range(c..6 * c),
            };

            // masked cells of each span keep their exact bits, everything else is 0
            let mut expected = vec![0.0f32; samples.len()];
            let mut decoder = StreamDecoder::new(channels);
            let mut col = 0;
            for packet in PacketStream::new(PrefixBitmaskEncoder, &samples, config).unwrap() {
                let packet = decoder.push(&packet.unwrap()).unwrap();
                let span = col + packet.skip_count;
                assert!(samples[col * c..span * c].iter().all(|x| x.abs() <= eps));

                for k in 0..packet.columns {
                    let base = (span + k) * c;
                    for ch in 0..c {
                        if packet.mask.contains(ch) {
                            expected[base + ch] = samples[base + ch];
                        } else {
                            assert!(samples[base + ch].abs() <= eps);
                        }
                    }
                }
                col = span + packet.columns;
            }
            assert_eq!(col, cols);

            let decoded = decoder.finish(cols);
            assert_eq!(decoded.len(), samples.len());
            for (want, back) in expected.iter().zip(decoded.iter()) {
                assert_eq!(want.to_bits(), back.to_bits());
            }
        }
    }

    #[test]
    fn test_roundtrip_long_silence() {
        let config = StreamConfig {
            channels: 1,
            eps: 0.0,
            capacity: 64,
        };
        let mut samples = vec![0.0f32; 70_000];
        samples[40_000] = 0.25;
        samples[69_999] = -1.5;
        assert_eq!(roundtrip(&samples, config), samples);
    }
}
