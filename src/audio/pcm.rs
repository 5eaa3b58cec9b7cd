//! Sample conversion and framing helpers
//!
//! Everything the detector sees is normalized mono `f32` in [-1, 1], cut into
//! frames of exactly `chunk_size` samples.

use tracing::trace;

/// Convert little-endian signed 16-bit PCM bytes to normalized samples.
///
/// A trailing odd byte is ignored.
pub fn i16_le_bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect()
}

/// Normalize an integer sample of the given bit depth
pub fn int_to_f32(sample: i32, bits_per_sample: u16) -> f32 {
    let scale = (1i64 << (bits_per_sample.clamp(1, 32) - 1)) as f32;
    sample as f32 / scale
}

/// Keep only the first channel of interleaved audio
pub fn first_channel(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved.chunks(channels).map(|frame| frame[0]).collect()
}

/// Regroups an arbitrary sample stream into fixed-size frames
#[derive(Debug)]
pub struct FrameAssembler {
    staging: Vec<f32>,
    chunk_size: usize,
}

impl FrameAssembler {
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            staging: Vec::with_capacity(chunk_size * 2),
            chunk_size,
        }
    }

    pub fn push(&mut self, samples: &[f32]) {
        self.staging.extend_from_slice(samples);
    }

    /// Take the next complete frame, if one is buffered
    pub fn next_frame(&mut self) -> Option<Vec<f32>> {
        if self.staging.len() < self.chunk_size {
            return None;
        }
        Some(self.staging.drain(..self.chunk_size).collect())
    }

    /// Drop an incomplete trailing frame
    pub fn discard_partial(&mut self) {
        if !self.staging.is_empty() {
            trace!("Discarding {} samples of partial frame", self.staging.len());
            self.staging.clear();
        }
    }
}
