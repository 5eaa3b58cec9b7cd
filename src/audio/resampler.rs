use anyhow::{Context, Result};
use rubato::{FftFixedIn, Resampler};
use tracing::debug;

/// Input chunk size handed to the FFT resampler
const INPUT_FRAMES: usize = 1024;

/// Converts mono audio from the device rate to the detector's frame rate
///
/// When both rates match, samples pass through untouched.
pub struct AudioResampler {
    inner: Option<FftFixedIn<f32>>,
    input_buffer: Vec<Vec<f32>>,
    output_buffer: Vec<Vec<f32>>,
    input_frames: usize,
}

impl AudioResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        if input_rate == output_rate {
            debug!("No resampling needed at {} Hz", input_rate);
            return Ok(Self {
                inner: None,
                input_buffer: Vec::new(),
                output_buffer: Vec::new(),
                input_frames: INPUT_FRAMES,
            });
        }

        debug!(
            "Creating resampler: {} Hz -> {} Hz (ratio: {:.4})",
            input_rate,
            output_rate,
            output_rate as f64 / input_rate as f64
        );

        let resampler = FftFixedIn::new(
            input_rate as usize,
            output_rate as usize,
            INPUT_FRAMES,
            2, // sub_chunks for quality
            1, // mono
        )
        .context("Failed to create resampler")?;

        let output_buffer = resampler.output_buffer_allocate(true);

        Ok(Self {
            inner: Some(resampler),
            input_buffer: vec![vec![0.0f32; INPUT_FRAMES]],
            output_buffer,
            input_frames: INPUT_FRAMES,
        })
    }

    /// Number of input samples expected by each `process` call
    pub fn input_frames_next(&self) -> usize {
        self.input_frames
    }

    pub fn is_passthrough(&self) -> bool {
        self.inner.is_none()
    }

    /// Resample exactly `input_frames_next()` samples
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.input_frames {
            anyhow::bail!(
                "Input length {} doesn't match expected {}",
                input.len(),
                self.input_frames
            );
        }

        let Some(resampler) = self.inner.as_mut() else {
            return Ok(input.to_vec());
        };

        self.input_buffer[0].copy_from_slice(input);
        let (_, output_frames) = resampler
            .process_into_buffer(&self.input_buffer, &mut self.output_buffer, None)
            .context("Resampling failed")?;

        Ok(self.output_buffer[0][..output_frames].to_vec())
    }

    /// Resample a whole buffer, zero-padding the final chunk
    pub fn process_all(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if self.is_passthrough() {
            return Ok(input.to_vec());
        }

        let mut output = Vec::with_capacity(input.len());
        let mut chunk = vec![0.0f32; self.input_frames];
        for block in input.chunks(self.input_frames) {
            chunk[..block.len()].copy_from_slice(block);
            chunk[block.len()..].iter_mut().for_each(|s| *s = 0.0);
            output.extend(self.process(&chunk)?);
        }
        Ok(output)
    }
}
