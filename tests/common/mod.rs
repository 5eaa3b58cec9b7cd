// Shared helpers for integration tests
#![allow(dead_code)]

use backchannel::detector::{BackchannelDetector, BackchannelEvent, DetectorConfig, PitchEstimator};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::time::{Duration, Instant};

pub const SAMPLE_RATE: u32 = 16000;
pub const CHUNK: usize = 160;

/// Pitch estimator that replays a scripted contour, one value per frame
pub struct ScriptedPitch {
    values: VecDeque<f64>,
}

impl ScriptedPitch {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl PitchEstimator for ScriptedPitch {
    fn estimate(&mut self, _samples: &[f32]) -> f64 {
        self.values.pop_front().unwrap_or(0.0)
    }
}

/// A frame whose RMS is exactly `level`
pub fn frame(level: f32) -> Vec<f32> {
    vec![level; CHUNK]
}

/// One scripted frame: loudness plus the pitch the estimator should report
#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub level: f32,
    pub pitch: f64,
}

pub fn speech(count: usize, pitch: f64) -> Vec<Step> {
    vec![Step { level: 0.05, pitch }; count]
}

pub fn silence(count: usize) -> Vec<Step> {
    vec![Step { level: 0.0, pitch: 0.0 }; count]
}

/// Speech with a flat contour that moves linearly over its last `glide_frames`
pub fn speech_with_glide(count: usize, from: f64, to: f64, glide_frames: usize) -> Vec<Step> {
    let steady = count.saturating_sub(glide_frames);
    let mut steps = speech(steady, from);
    for k in 0..glide_frames.min(count) {
        let t = if glide_frames > 1 {
            k as f64 / (glide_frames - 1) as f64
        } else {
            1.0
        };
        steps.push(Step {
            level: 0.05,
            pitch: from + (to - from) * t,
        });
    }
    steps
}

/// Run scripted steps at 10ms per frame, returning (frame index, event) pairs
pub fn run_script(config: DetectorConfig, steps: &[Step], origin: Instant) -> Vec<(usize, BackchannelEvent)> {
    let frame_duration = config.frame_duration();
    let estimator = ScriptedPitch::new(steps.iter().map(|s| s.pitch));
    let mut detector = BackchannelDetector::new(config, estimator).expect("valid config");

    steps
        .iter()
        .enumerate()
        .filter_map(|(i, step)| {
            let now = origin + frame_duration * i as u32;
            detector
                .process_frame_at(&frame(step.level), now)
                .map(|event| (i, event))
        })
        .collect()
}

/// Sine tone whose frequency changes per segment, with continuous phase
pub fn tone_segments(segments: &[(f32, Duration)], amplitude: f32) -> Vec<f32> {
    let mut phase = 0.0f32;
    let mut out = Vec::new();
    for &(freq, duration) in segments {
        let n = (duration.as_secs_f64() * SAMPLE_RATE as f64).round() as usize;
        for _ in 0..n {
            out.push(phase.sin() * amplitude);
            phase += 2.0 * PI * freq / SAMPLE_RATE as f32;
            if phase > 2.0 * PI {
                phase -= 2.0 * PI;
            }
        }
    }
    out
}
