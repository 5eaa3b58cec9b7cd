//! Backchannel timing detection
//!
//! Turns a stream of fixed-size audio frames into backchannel opportunities
//! using only loudness, pitch movement and timing:
//!
//! 1. `features` measures RMS and asks the pitch estimator for F0
//! 2. `window` tracks the pitch spread over the last few frames
//! 3. `turn` segments speech/silence and latches end-of-utterance attributes
//! 4. `trigger` decides when a pause qualifies, with a cooldown

pub mod config;
pub mod features;
pub mod pipeline;
pub mod pitch;
pub mod trigger;
pub mod turn;
pub mod window;

pub use config::{ConfigError, DetectorConfig, MAX_PITCH_WINDOW_FRAMES};
pub use features::{rms, FeatureExtractor, FrameFeatures};
pub use pipeline::BackchannelDetector;
pub use pitch::{McLeodConfig, McLeodPitchEstimator, PitchEstimator, MAX_ANALYSIS_WINDOW};
pub use trigger::{BackchannelEvent, TriggerConditions, TriggerEvaluator};
pub use turn::{Pause, Transition, TurnState, UtteranceEnd, VoiceActivity};
pub use window::PitchWindow;
