use std::time::Instant;
use tracing::trace;

use super::config::{ConfigError, DetectorConfig};
use super::features::FeatureExtractor;
use super::pitch::PitchEstimator;
use super::trigger::{BackchannelEvent, TriggerEvaluator};
use super::turn::{Transition, TurnState, UtteranceEnd, VoiceActivity};
use super::window::PitchWindow;

/// Frame-driven backchannel detector for one audio stream
///
/// Each call runs feature extraction, the pitch window, the speech/silence
/// state machine and the trigger check, in that order. All cross-frame state
/// lives here, so independent streams just use independent detectors.
///
/// Not internally synchronized: frames must be fed from a single owner, in
/// arrival order, with non-decreasing instants.
pub struct BackchannelDetector<E> {
    config: DetectorConfig,
    extractor: FeatureExtractor<E>,
    window: PitchWindow,
    voice: VoiceActivity,
    trigger: TriggerEvaluator,
    frames_processed: u64,
}

impl<E: PitchEstimator> BackchannelDetector<E> {
    pub fn new(config: DetectorConfig, estimator: E) -> Result<Self, ConfigError> {
        config.validate()?;

        trace!(
            "Detector: {} Hz, {} samples/frame, pitch window {} frames",
            config.frame_rate,
            config.chunk_size,
            config.pitch_window_capacity()
        );

        Ok(Self {
            extractor: FeatureExtractor::new(estimator),
            window: PitchWindow::new(config.pitch_window_capacity()),
            voice: VoiceActivity::new(config.silence_threshold),
            trigger: TriggerEvaluator::new(
                config.pause_required(),
                config.speech_required(),
                config.cooldown(),
            ),
            frames_processed: 0,
            config,
        })
    }

    /// Process a frame stamped with the current monotonic time
    pub fn process_frame(&mut self, samples: &[f32]) -> Option<BackchannelEvent> {
        self.process_frame_at(samples, Instant::now())
    }

    /// Process a frame captured at `now`
    ///
    /// Empty frames are skipped without touching any state.
    pub fn process_frame_at(&mut self, samples: &[f32], now: Instant) -> Option<BackchannelEvent> {
        let features = self.extractor.extract(samples, now)?;
        self.frames_processed += 1;

        if features.is_voiced() {
            self.window.push(features.pitch_hz);
        }
        let pitch_condition_met = self.window.condition_met(self.config.pitch_shift_hz);

        let transition = self.voice.update(features.rms, pitch_condition_met, now);
        if transition == Transition::SpeechEnded {
            // Keep this turn's contour out of the next one
            self.window.clear();
        }

        if self.voice.is_speaking() {
            return None;
        }

        let pause = self.voice.pause()?;
        let event = self.trigger.evaluate(&pause, now)?;
        self.voice.consume_pitch_cue();
        Some(event)
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn is_speaking(&self) -> bool {
        self.voice.is_speaking()
    }

    pub fn state(&self) -> TurnState {
        self.voice.state()
    }

    /// Latched end-of-utterance attributes
    pub fn utterance(&self) -> Option<UtteranceEnd> {
        self.voice.utterance()
    }

    pub fn pitch_spread(&self) -> f64 {
        self.window.spread()
    }

    pub fn pitch_window(&self) -> &PitchWindow {
        &self.window
    }

    pub fn last_backchannel(&self) -> Option<Instant> {
        self.trigger.last_backchannel()
    }

    pub fn backchannel_count(&self) -> u64 {
        self.trigger.fired_count()
    }

    /// Non-empty frames processed so far
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}
