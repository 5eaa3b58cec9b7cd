use std::time::{Duration, Instant};
use tracing::debug;

/// Attributes of an utterance as of its most recent speech frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtteranceEnd {
    /// Time from the first speech frame to the latest one
    pub duration: Duration,
    /// Whether the pitch window showed enough movement on the latest speech frame
    pub pitch_shift_ok: bool,
}

impl UtteranceEnd {
    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

/// Speech/silence state of one audio stream
///
/// The end-of-utterance attributes only exist inside the variants, so they
/// can be written while speaking and only read while silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Speaking {
        start: Instant,
        latest: UtteranceEnd,
    },
    Silent {
        /// `None` until the first utterance has ended
        since: Option<Instant>,
        last_utterance: Option<UtteranceEnd>,
    },
}

impl Default for TurnState {
    fn default() -> Self {
        Self::Silent {
            since: None,
            last_utterance: None,
        }
    }
}

/// What a frame did to the speech/silence state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    SpeechStarted,
    SpeechContinued,
    SpeechEnded,
    SilenceContinued,
}

/// The pause currently in progress and the utterance that preceded it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pause {
    pub since: Instant,
    pub utterance: UtteranceEnd,
}

/// Energy-gated speech/silence state machine
#[derive(Debug, Clone)]
pub struct VoiceActivity {
    state: TurnState,
    silence_threshold: f64,
}

impl VoiceActivity {
    pub fn new(silence_threshold: f64) -> Self {
        Self {
            state: TurnState::default(),
            silence_threshold,
        }
    }

    /// Speech requires strictly more energy than the threshold
    pub fn is_speech(&self, rms: f64) -> bool {
        rms > self.silence_threshold
    }

    /// Advance the state machine by one frame
    pub fn update(&mut self, rms: f64, pitch_condition_met: bool, now: Instant) -> Transition {
        let speech = self.is_speech(rms);

        match (self.state, speech) {
            (TurnState::Silent { .. }, true) => {
                debug!("Speech started (rms {:.4})", rms);
                self.state = TurnState::Speaking {
                    start: now,
                    latest: UtteranceEnd {
                        duration: Duration::ZERO,
                        pitch_shift_ok: pitch_condition_met,
                    },
                };
                Transition::SpeechStarted
            }
            (TurnState::Speaking { start, .. }, true) => {
                self.state = TurnState::Speaking {
                    start,
                    latest: UtteranceEnd {
                        duration: now.saturating_duration_since(start),
                        pitch_shift_ok: pitch_condition_met,
                    },
                };
                Transition::SpeechContinued
            }
            (TurnState::Speaking { latest, .. }, false) => {
                debug!(
                    "Speech ended after {:.0}ms (pitch shift: {})",
                    latest.duration_ms(),
                    latest.pitch_shift_ok
                );
                self.state = TurnState::Silent {
                    since: Some(now),
                    last_utterance: Some(latest),
                };
                Transition::SpeechEnded
            }
            (TurnState::Silent { .. }, false) => Transition::SilenceContinued,
        }
    }

    /// The pause in progress, if speech has ended at least once
    pub fn pause(&self) -> Option<Pause> {
        match self.state {
            TurnState::Silent {
                since: Some(since),
                last_utterance: Some(utterance),
            } => Some(Pause { since, utterance }),
            _ => None,
        }
    }

    /// Drop the pitch cue of the utterance that preceded the current pause
    ///
    /// The duration is kept; only the next utterance overwrites it.
    pub fn consume_pitch_cue(&mut self) {
        if let TurnState::Silent {
            last_utterance: Some(utterance),
            ..
        } = &mut self.state
        {
            utterance.pitch_shift_ok = false;
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self.state, TurnState::Speaking { .. })
    }

    /// Latched attributes: live while speaking, frozen while silent
    pub fn utterance(&self) -> Option<UtteranceEnd> {
        match self.state {
            TurnState::Speaking { latest, .. } => Some(latest),
            TurnState::Silent { last_utterance, .. } => last_utterance,
        }
    }
}
