//! Pitch estimation seam
//!
//! The detector only needs "F0 in Hz, or 0 when unvoiced" per frame. The
//! estimator is injected so tests can script pitch contours and the host can
//! plug in the McLeod implementation below.

use pitch_detection::detector::mcleod::McLeodDetector;
use pitch_detection::detector::PitchDetector;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::config::ConfigError;

/// Largest accepted analysis window, in samples
pub const MAX_ANALYSIS_WINDOW: usize = 16384;

/// Per-frame fundamental frequency estimator
pub trait PitchEstimator {
    /// Estimate the pitch of the latest frame in Hz, returning 0 when unvoiced.
    ///
    /// Called exactly once per non-empty frame, in stream order.
    fn estimate(&mut self, samples: &[f32]) -> f64;
}

impl<E: PitchEstimator + ?Sized> PitchEstimator for Box<E> {
    fn estimate(&mut self, samples: &[f32]) -> f64 {
        (**self).estimate(samples)
    }
}

/// McLeod pitch estimator tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McLeodConfig {
    /// Analysis window in samples (~64ms at 16kHz)
    pub window_size: usize,
    /// Lowest accepted pitch in Hz (human vocal range)
    pub min_hz: f32,
    /// Highest accepted pitch in Hz (human vocal range)
    pub max_hz: f32,
    pub power_threshold: f32,
    pub clarity_threshold: f32,
}

impl Default for McLeodConfig {
    fn default() -> Self {
        Self {
            window_size: 1024,
            min_hz: 50.0,
            max_hz: 500.0,
            power_threshold: 0.8,
            clarity_threshold: 0.5,
        }
    }
}

impl McLeodConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size < 2 || self.window_size > MAX_ANALYSIS_WINDOW {
            return Err(ConfigError::InvalidAnalysisWindow(self.window_size));
        }
        let range_ok = self.min_hz.is_finite()
            && self.max_hz.is_finite()
            && self.min_hz >= 0.0
            && self.min_hz < self.max_hz;
        if !range_ok {
            return Err(ConfigError::InvalidPitchRange {
                min_hz: self.min_hz,
                max_hz: self.max_hz,
            });
        }
        Ok(())
    }
}

/// Streaming McLeod pitch estimator
///
/// Frames are much shorter than a usable analysis window, so the estimator
/// keeps the most recent `window_size` samples and re-analyses that history
/// on every frame. Until the history is full it reports unvoiced.
///
/// The underlying detector keeps `Rc` scratch buffers, so the estimator is
/// not `Send`: build it on the thread that feeds it frames.
pub struct McLeodPitchEstimator {
    detector: McLeodDetector<f32>,
    history: Vec<f32>,
    filled: usize,
    sample_rate: usize,
    config: McLeodConfig,
}

impl McLeodPitchEstimator {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_config(sample_rate, McLeodConfig::default())
    }

    pub fn with_config(sample_rate: u32, config: McLeodConfig) -> Self {
        let window_size = config.window_size.max(2);
        Self {
            detector: McLeodDetector::new(window_size, window_size / 2),
            history: vec![0.0; window_size],
            filled: 0,
            sample_rate: sample_rate as usize,
            config: McLeodConfig {
                window_size,
                ..config
            },
        }
    }

    /// Slide the new samples into the end of the history buffer
    fn push_history(&mut self, samples: &[f32]) {
        let window = self.history.len();
        if samples.len() >= window {
            self.history
                .copy_from_slice(&samples[samples.len() - window..]);
        } else {
            self.history.copy_within(samples.len().., 0);
            self.history[window - samples.len()..].copy_from_slice(samples);
        }
        self.filled = (self.filled + samples.len()).min(window);
    }

}

impl PitchEstimator for McLeodPitchEstimator {
    fn estimate(&mut self, samples: &[f32]) -> f64 {
        self.push_history(samples);
        if self.filled < self.history.len() {
            return 0.0;
        }

        let pitch = self.detector.get_pitch(
            &self.history,
            self.sample_rate,
            self.config.power_threshold,
            self.config.clarity_threshold,
        );

        match pitch {
            Some(p) if p.frequency >= self.config.min_hz && p.frequency <= self.config.max_hz => {
                trace!("Pitch {:.1} Hz (clarity {:.2})", p.frequency, p.clarity);
                f64::from(p.frequency)
            }
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    /// Generate a sine wave at a given frequency
    fn generate_sine(freq: f32, sample_rate: usize, num_samples: usize) -> Vec<f32> {
        (0..num_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * PI * freq * t).sin() * 0.5
            })
            .collect()
    }

    #[test]
    fn test_unvoiced_until_history_full() {
        let mut estimator = McLeodPitchEstimator::new(16000);
        let tone = generate_sine(200.0, 16000, 160);
        // 1024-sample window needs 7 frames of 160 samples
        for _ in 0..6 {
            assert_eq!(estimator.estimate(&tone), 0.0);
        }
    }

    #[test]
    fn test_detects_sine_pitch() {
        let mut estimator = McLeodPitchEstimator::new(16000);
        let tone = generate_sine(200.0, 16000, 1600);

        let mut last = 0.0;
        for frame in tone.chunks(160) {
            last = estimator.estimate(frame);
        }
        assert!((last - 200.0).abs() < 20.0, "Expected ~200 Hz, got {}", last);
    }

    #[test]
    fn test_silence_is_unvoiced() {
        let mut estimator = McLeodPitchEstimator::new(16000);
        let silence = vec![0.0f32; 160];
        for _ in 0..20 {
            assert_eq!(estimator.estimate(&silence), 0.0);
        }
    }

    #[test]
    fn test_oversized_frame_keeps_latest_samples() {
        let mut estimator = McLeodPitchEstimator::new(16000);
        let mut samples = vec![0.0f32; 1000];
        samples.extend(generate_sine(250.0, 16000, 1024));

        let pitch = estimator.estimate(&samples);
        assert!((pitch - 250.0).abs() < 25.0, "Expected ~250 Hz, got {}", pitch);
    }

    #[test]
    fn test_pitch_range_filter() {
        let config = McLeodConfig {
            min_hz: 50.0,
            max_hz: 150.0,
            ..Default::default()
        };
        let mut estimator = McLeodPitchEstimator::with_config(16000, config);
        let tone = generate_sine(200.0, 16000, 1024);
        assert_eq!(estimator.estimate(&tone), 0.0);
    }

    #[test]
    fn test_config_validation() {
        assert!(McLeodConfig::default().validate().is_ok());

        let config = McLeodConfig {
            window_size: 1,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidAnalysisWindow(1)));

        let config = McLeodConfig {
            window_size: MAX_ANALYSIS_WINDOW + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = McLeodConfig {
            min_hz: 400.0,
            max_hz: 100.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPitchRange { .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: McLeodConfig = serde_json::from_str(r#"{"max_hz": 400.0}"#).unwrap();
        assert_eq!(config.max_hz, 400.0);
        assert_eq!(config.window_size, 1024);
    }

    #[test]
    fn test_boxed_estimator_delegates() {
        let mut boxed: Box<dyn PitchEstimator> = Box::new(McLeodPitchEstimator::new(16000));
        assert_eq!(boxed.estimate(&[0.0; 160]), 0.0);
    }
}
