use log::debug;

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::Encoder;

/// Drives an [`Encoder`] over a whole sample buffer, one packet per item.
///
/// Iteration ends when the cursor reaches the end of the buffer. An encode
/// error is yielded once and ends the stream.
pub struct PacketStream<'a, E: Encoder> {
    encoder: E,
    samples: &'a [f32],
    config: StreamConfig,
    cursor: usize,
    buf: Vec<u8>,
    done: bool,
}

impl<'a, E: Encoder> PacketStream<'a, E> {
    pub fn new(encoder: E, samples: &'a [f32], config: StreamConfig) -> Result<Self> {
        config.validate()?;
        let channels = config.channels as usize;
        if samples.len() % channels != 0 {
            return Err(Error::MisalignedSamples {
                len: samples.len(),
                channels,
            });
        }

        debug!(
            "stream: {:?} {} columns x {} channels, capacity {}",
            encoder.kind(),
            samples.len() / channels,
            channels,
            config.capacity
        );

        Ok(Self {
            encoder,
            samples,
            config,
            cursor: 0,
            buf: vec![0; config.capacity],
            done: samples.is_empty(),
        })
    }

    /// Flat index of the next column to encode.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl<E: Encoder> Iterator for PacketStream<'_, E> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let encoded = match self.encoder.encode(
            self.samples,
            self.config.channels,
            self.config.eps,
            self.cursor,
            &mut self.buf,
            self.config.capacity,
        ) {
            Ok(encoded) => encoded,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        self.cursor = encoded.cursor;
        if self.cursor >= self.samples.len() {
            self.done = true;
            debug!("stream: finished at {}", self.cursor);
        }

        Some(Ok(self.buf[..encoded.written].to_vec()))
    }
}
