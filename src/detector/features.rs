use std::time::Instant;

use super::pitch::PitchEstimator;

/// Low-level measurements for a single frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameFeatures {
    /// Root-mean-square amplitude (not dB)
    pub rms: f64,
    /// Estimated F0 in Hz, 0 when unvoiced
    pub pitch_hz: f64,
    pub timestamp: Instant,
}

impl FrameFeatures {
    pub fn is_voiced(&self) -> bool {
        self.pitch_hz > 0.0
    }
}

/// Root-mean-square amplitude of a frame
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (energy / samples.len() as f64).sqrt()
}

/// Turns raw frames into [`FrameFeatures`] using an injected pitch estimator
pub struct FeatureExtractor<E> {
    estimator: E,
}

impl<E: PitchEstimator> FeatureExtractor<E> {
    pub fn new(estimator: E) -> Self {
        Self { estimator }
    }

    /// Measure one frame. Empty frames yield `None` and never reach the estimator.
    pub fn extract(&mut self, samples: &[f32], timestamp: Instant) -> Option<FrameFeatures> {
        if samples.is_empty() {
            return None;
        }

        let raw_pitch = self.estimator.estimate(samples);
        // Anything that is not a positive frequency counts as unvoiced
        let pitch_hz = if raw_pitch.is_finite() && raw_pitch > 0.0 {
            raw_pitch
        } else {
            0.0
        };

        Some(FrameFeatures {
            rms: rms(samples),
            pitch_hz,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f64);

    impl PitchEstimator for Constant {
        fn estimate(&mut self, _samples: &[f32]) -> f64 {
            self.0
        }
    }

    struct MustNotRun;

    impl PitchEstimator for MustNotRun {
        fn estimate(&mut self, _samples: &[f32]) -> f64 {
            panic!("estimator called for an empty frame");
        }
    }

    #[test]
    fn test_rms_of_constant_signal() {
        assert_eq!(rms(&[0.5; 160]), 0.5);
        assert_eq!(rms(&[-0.25; 4]), 0.25);
    }

    #[test]
    fn test_rms_of_empty_frame() {
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_rms_does_not_clamp() {
        assert_eq!(rms(&[2.0, -2.0]), 2.0);
    }

    #[test]
    fn test_empty_frame_skips_estimator() {
        let mut extractor = FeatureExtractor::new(MustNotRun);
        assert!(extractor.extract(&[], Instant::now()).is_none());
    }

    #[test]
    fn test_voiced_frame() {
        let mut extractor = FeatureExtractor::new(Constant(180.0));
        let now = Instant::now();
        let features = extractor.extract(&[0.1; 160], now).unwrap();
        assert_eq!(features.pitch_hz, 180.0);
        assert!(features.is_voiced());
        assert_eq!(features.timestamp, now);
        assert!((features.rms - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_non_positive_pitch_is_unvoiced() {
        for raw in [0.0, -12.0, f64::NAN] {
            let mut extractor = FeatureExtractor::new(Constant(raw));
            let features = extractor.extract(&[0.1; 160], Instant::now()).unwrap();
            assert_eq!(features.pitch_hz, 0.0);
            assert!(!features.is_voiced());
        }
    }
}
