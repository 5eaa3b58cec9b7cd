use std::time::{Duration, Instant};

/// Per-frame timestamps derived from the amount of audio seen
///
/// Frame `n` is stamped `origin + n * frame_duration`, so timings follow the
/// audio itself rather than when a read happened to be processed. Live
/// capture anchors the origin at the first received samples; replay anchors it
/// at the start of the file.
#[derive(Debug, Clone)]
pub struct FrameClock {
    origin: Instant,
    frame_duration: Duration,
    frames: u32,
}

impl FrameClock {
    pub fn audio(origin: Instant, frame_duration: Duration) -> Self {
        Self {
            origin,
            frame_duration,
            frames: 0,
        }
    }

    /// Timestamp for the next frame
    pub fn tick(&mut self) -> Instant {
        let now = self.origin + self.frame_duration * self.frames;
        self.frames = self.frames.saturating_add(1);
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_clock_advances_by_frame() {
        let origin = Instant::now();
        let mut clock = FrameClock::audio(origin, Duration::from_millis(10));
        assert_eq!(clock.tick(), origin);
        assert_eq!(clock.tick(), origin + Duration::from_millis(10));
        assert_eq!(clock.tick(), origin + Duration::from_millis(20));
    }

    #[test]
    fn test_audio_clock_ignores_wall_time() {
        let origin = Instant::now();
        let mut clock = FrameClock::audio(origin, Duration::from_millis(32));
        clock.tick();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.tick(), origin + Duration::from_millis(32));
    }
}
