//! Prefix-bitmask encoder.
//!
//! Each call skips a run of all-zero columns, greedily grows a span of
//! columns until the next one no longer fits, and writes the span as a
//! union bitmask followed by the values of every masked channel.

use byteorder::ByteOrder;
use log::{trace, warn};

use crate::error::{Error, Result};
use crate::kind::EncoderKind;
use crate::mask::ChannelMask;
use crate::wire::{header_len, write_header, WireEndian, MAX_SKIP, VALUE_BYTES};
use crate::{Encoded, Encoder};

#[inline]
fn is_active(x: f32, eps: f32) -> bool {
    x.abs() > eps
}

fn active_in(column: &[f32], eps: f32) -> usize {
    column.iter().filter(|&&x| is_active(x, eps)).count()
}

pub(crate) fn check_channels(channels: u8) -> Result<()> {
    if channels == 0 {
        return Err(Error::InvalidChannels(channels as usize));
    }
    Ok(())
}

pub(crate) fn check_eps(eps: f32) -> Result<()> {
    if eps.is_nan() || eps < 0.0 {
        return Err(Error::InvalidEpsilon(eps));
    }
    Ok(())
}

/// Capacity must hold the header, the bitmask and at least one float.
pub(crate) fn check_capacity(channels: u8, capacity: usize) -> Result<()> {
    let needed = header_len(channels as usize) + VALUE_BYTES;
    if capacity < needed {
        return Err(Error::CapacityTooSmall { capacity, needed });
    }
    Ok(())
}

/// Columns chosen for one packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Plan {
    /// Flat index just past the last included column.
    end: usize,
    cols: usize,
    active: usize,
    mask: ChannelMask,
}

impl Plan {
    fn empty(at: usize, channels: usize) -> Self {
        Self {
            end: at,
            cols: 0,
            active: 0,
            mask: ChannelMask::new(channels),
        }
    }
}

/// Stateless encoder; one instance can be shared freely between threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrefixBitmaskEncoder;

impl PrefixBitmaskEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Advance past all-zero columns, stopping at the first active column,
    /// at the end of the buffer, or once the skip counter would overflow.
    fn skip_prefix_zeros(
        samples: &[f32],
        channels: usize,
        eps: f32,
        from_pos: usize,
    ) -> (usize, usize) {
        let mut pos = from_pos;
        let mut zeros = 0;

        while pos < samples.len() && zeros < MAX_SKIP {
            if active_in(&samples[pos..pos + channels], eps) > 0 {
                break;
            }
            pos += channels;
            zeros += 1;
        }

        (pos, zeros)
    }

    /// Greedily admit columns from `start` while their floats fit.
    ///
    /// A channel first seen in column `k` costs one float in each of the `k`
    /// columns already admitted, plus one per column from then on.
    fn plan_span(
        samples: &[f32],
        channels: usize,
        eps: f32,
        start: usize,
        float_capacity: usize,
    ) -> Plan {
        let mut plan = Plan::empty(start, channels);
        let mut floats = 0;

        while plan.end < samples.len() {
            let column = &samples[plan.end..plan.end + channels];
            let mut added = ChannelMask::new(channels);
            let mut new_channels = 0;

            for (channel, &x) in column.iter().enumerate() {
                if is_active(x, eps) && !plan.mask.contains(channel) {
                    added.set(channel);
                    new_channels += 1;
                }
            }

            let retroactive = new_channels * plan.cols;
            let new_active = plan.active + new_channels;
            if floats + retroactive + new_active > float_capacity {
                break;
            }

            plan.mask.union_with(&added);
            plan.active = new_active;
            floats += retroactive + new_active;
            plan.cols += 1;
            plan.end += channels;
        }

        debug_assert_eq!(floats, plan.cols * plan.active);
        plan
    }

    /// Write the masked values of every planned column. Returns bytes written.
    fn write_values(
        samples: &[f32],
        channels: usize,
        start: usize,
        plan: &Plan,
        buf: &mut [u8],
    ) -> usize {
        let mut off = 0;

        for column in samples[start..plan.end].chunks_exact(channels) {
            for channel in plan.mask.iter(channels) {
                WireEndian::write_f32(&mut buf[off..off + VALUE_BYTES], column[channel]);
                off += VALUE_BYTES;
            }
        }

        off
    }

    fn validate(
        samples: &[f32],
        channels: u8,
        eps: f32,
        from_pos: usize,
        buf: &[u8],
        capacity: usize,
    ) -> Result<()> {
        check_channels(channels)?;
        check_eps(eps)?;

        let c = channels as usize;
        if samples.len() % c != 0 {
            return Err(Error::MisalignedSamples {
                len: samples.len(),
                channels: c,
            });
        }
        if from_pos % c != 0 || from_pos > samples.len() {
            return Err(Error::InvalidCursor {
                pos: from_pos,
                len: samples.len(),
                channels: c,
            });
        }

        check_capacity(channels, capacity)?;
        if buf.len() < capacity {
            return Err(Error::BufferTooSmall {
                len: buf.len(),
                capacity,
            });
        }
        Ok(())
    }
}

impl Encoder for PrefixBitmaskEncoder {
    fn kind(&self) -> EncoderKind {
        EncoderKind::PrefixBitmask
    }

    fn encode(
        &self,
        samples: &[f32],
        channels: u8,
        eps: f32,
        from_pos: usize,
        buf: &mut [u8],
        capacity: usize,
    ) -> Result<Encoded> {
        Self::validate(samples, channels, eps, from_pos, buf, capacity)?;

        let c = channels as usize;
        let header = header_len(c);
        let float_capacity = (capacity - header) / VALUE_BYTES;

        let (start, skipped) = Self::skip_prefix_zeros(samples, c, eps, from_pos);

        let plan = if skipped == MAX_SKIP {
            warn!("zero run at {} saturates the skip counter, splitting", from_pos);
            Plan::empty(start, c)
        } else {
            Self::plan_span(samples, c, eps, start, float_capacity)
        };

        if plan.cols == 0 && skipped == 0 && start < samples.len() {
            return Err(Error::ColumnTooWide {
                pos: start,
                active: active_in(&samples[start..start + c], eps),
                float_capacity,
            });
        }

        let mut written = write_header(buf, skipped as i16, &plan.mask);
        written += Self::write_values(samples, c, start, &plan, &mut buf[written..capacity]);
        debug_assert!(written <= capacity);

        trace!(
            "packet: skip={} cols={} active={} bytes={} cursor={}",
            skipped,
            plan.cols,
            plan.active,
            written,
            plan.end
        );

        Ok(Encoded {
            cursor: plan.end,
            written,
            skipped,
            columns: plan.cols,
        })
    }
}
