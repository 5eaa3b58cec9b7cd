use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Longest pitch window accepted, in frames
pub const MAX_PITCH_WINDOW_FRAMES: usize = 1000;

/// Invalid detector configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("frame_rate must be greater than zero")]
    ZeroFrameRate,
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,
    #[error("silence_threshold must be a finite, non-negative RMS value (got {0})")]
    InvalidSilenceThreshold(f64),
    #[error("pitch_shift_hz must be a finite, non-negative frequency (got {0})")]
    InvalidPitchShift(f64),
    #[error("pitch_window_ms spans {frames} frames, more than the {max} allowed")]
    PitchWindowTooLong { frames: usize, max: usize },
    #[error("pitch analysis window must be 2..=16384 samples (got {0})")]
    InvalidAnalysisWindow(usize),
    #[error("pitch range must satisfy 0 <= min_hz < max_hz (got {min_hz}..{max_hz})")]
    InvalidPitchRange { min_hz: f32, max_hz: f32 },
}

/// Backchannel detector parameters
///
/// Immutable once a detector has been built from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Input sample rate in Hz
    pub frame_rate: u32,
    /// Samples per frame
    pub chunk_size: usize,
    /// RMS amplitude at or below which a frame counts as silence
    pub silence_threshold: f64,
    /// Pause length required before a backchannel may fire
    pub pause_req_ms: u64,
    /// Minimum length of the utterance preceding the pause
    pub speech_req_ms: u64,
    /// Span of the trailing pitch window
    pub pitch_window_ms: u64,
    /// Minimum max-min pitch movement inside the window
    pub pitch_shift_hz: f64,
    /// Minimum time between two backchannels
    pub bc_cooldown_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            frame_rate: 16000,
            chunk_size: 160, // 10ms at 16kHz
            silence_threshold: 0.015,
            pause_req_ms: 400,
            speech_req_ms: 1000,
            pitch_window_ms: 100,
            pitch_shift_hz: 30.0,
            bc_cooldown_ms: 1400,
        }
    }
}

impl DetectorConfig {
    /// Check that the values describe a usable detector
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate == 0 {
            return Err(ConfigError::ZeroFrameRate);
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if !self.silence_threshold.is_finite() || self.silence_threshold < 0.0 {
            return Err(ConfigError::InvalidSilenceThreshold(self.silence_threshold));
        }
        if !self.pitch_shift_hz.is_finite() || self.pitch_shift_hz < 0.0 {
            return Err(ConfigError::InvalidPitchShift(self.pitch_shift_hz));
        }
        let frames = self.pitch_window_capacity();
        if frames > MAX_PITCH_WINDOW_FRAMES {
            return Err(ConfigError::PitchWindowTooLong {
                frames,
                max: MAX_PITCH_WINDOW_FRAMES,
            });
        }
        Ok(())
    }

    /// Wall-clock length of one frame
    pub fn frame_duration(&self) -> Duration {
        let nanos = self.chunk_size as u64 * 1_000_000_000 / u64::from(self.frame_rate.max(1));
        Duration::from_nanos(nanos)
    }

    pub fn frame_duration_ms(&self) -> f64 {
        self.chunk_size as f64 * 1000.0 / f64::from(self.frame_rate.max(1))
    }

    /// Number of frames the pitch window holds (at least one)
    pub fn pitch_window_capacity(&self) -> usize {
        let frames = (self.pitch_window_ms as f64 / self.frame_duration_ms()).round();
        if frames.is_finite() && frames >= 1.0 {
            frames as usize
        } else {
            1
        }
    }

    pub fn pause_required(&self) -> Duration {
        Duration::from_millis(self.pause_req_ms)
    }

    pub fn speech_required(&self) -> Duration {
        Duration::from_millis(self.speech_req_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.bc_cooldown_ms)
    }
}
