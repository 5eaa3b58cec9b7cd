//! Real-time backchannel cue detection
//!
//! [`detector`] holds the frame-by-frame core; [`audio`], [`replay`] and
//! [`session`] connect it to microphones, WAV files and reports.

pub mod audio;
pub mod config;
pub mod detector;
pub mod replay;
pub mod session;

pub use config::Config;
pub use detector::{BackchannelDetector, BackchannelEvent, DetectorConfig, PitchEstimator};
