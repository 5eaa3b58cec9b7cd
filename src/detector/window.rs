use std::collections::VecDeque;

/// Larger windows grow on demand
const PREALLOCATED: usize = 64;

/// Trailing window of voiced pitch estimates
///
/// Holds at most `capacity` samples; the oldest is evicted as new ones arrive.
/// Reports the max-min spread as a measure of intonation movement.
#[derive(Debug, Clone)]
pub struct PitchWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl PitchWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(PREALLOCATED) + 1),
            capacity,
        }
    }

    /// Append a voiced pitch sample in Hz
    pub fn push(&mut self, pitch_hz: f64) {
        self.samples.push_back(pitch_hz);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Max minus min over the window, or 0 with fewer than two samples
    pub fn spread(&self) -> f64 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        let (min, max) = self
            .samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| {
                (lo.min(p), hi.max(p))
            });
        max - min
    }

    /// Whether the spread reaches `pitch_shift_hz`
    pub fn condition_met(&self, pitch_shift_hz: f64) -> bool {
        self.spread() >= pitch_shift_hz
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
