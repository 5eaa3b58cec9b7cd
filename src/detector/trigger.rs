use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::turn::Pause;

/// A moment at which the listener should emit a backchannel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackchannelEvent {
    /// Frame instant at which all conditions first held
    pub at: Instant,
    /// How long the pause had lasted
    pub pause: Duration,
    /// Length of the utterance that preceded the pause
    pub utterance: Duration,
    /// 1-based count of events fired by this detector
    pub sequence: u64,
}

impl BackchannelEvent {
    pub fn pause_ms(&self) -> u64 {
        self.pause.as_millis() as u64
    }

    pub fn utterance_ms(&self) -> u64 {
        self.utterance.as_millis() as u64
    }
}

/// Which trigger conditions held on a silent frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriggerConditions {
    /// Pause has lasted long enough
    pub pause_ok: bool,
    /// Preceding utterance was long enough
    pub speech_ok: bool,
    /// Preceding utterance ended with pitch movement
    pub pitch_ok: bool,
    /// Cooldown since the last backchannel has elapsed
    pub cooldown_ok: bool,
}

impl TriggerConditions {
    pub fn all(&self) -> bool {
        self.pause_ok && self.speech_ok && self.pitch_ok && self.cooldown_ok
    }
}

/// Decides when a pause warrants a backchannel, rate limited by a cooldown
#[derive(Debug, Clone)]
pub struct TriggerEvaluator {
    pause_required: Duration,
    speech_required: Duration,
    cooldown: Duration,
    /// `None` means no backchannel has fired yet
    last_backchannel: Option<Instant>,
    fired: u64,
}

impl TriggerEvaluator {
    pub fn new(pause_required: Duration, speech_required: Duration, cooldown: Duration) -> Self {
        Self {
            pause_required,
            speech_required,
            cooldown,
            last_backchannel: None,
            fired: 0,
        }
    }

    /// Evaluate all conditions against `now` without side effects
    pub fn conditions(&self, pause: &Pause, now: Instant) -> TriggerConditions {
        TriggerConditions {
            pause_ok: now.saturating_duration_since(pause.since) >= self.pause_required,
            speech_ok: pause.utterance.duration >= self.speech_required,
            pitch_ok: pause.utterance.pitch_shift_ok,
            cooldown_ok: self
                .last_backchannel
                .map_or(true, |last| now.saturating_duration_since(last) >= self.cooldown),
        }
    }

    /// Check a silent frame and fire if every condition holds.
    ///
    /// On fire the cooldown clock restarts at `now`; the caller must consume
    /// the pitch cue so the same pause cannot fire twice.
    pub fn evaluate(&mut self, pause: &Pause, now: Instant) -> Option<BackchannelEvent> {
        let conditions = self.conditions(pause, now);
        if !conditions.all() {
            return None;
        }

        self.last_backchannel = Some(now);
        self.fired += 1;

        let event = BackchannelEvent {
            at: now,
            pause: now.saturating_duration_since(pause.since),
            utterance: pause.utterance.duration,
            sequence: self.fired,
        };

        info!(
            "Backchannel #{} after {}ms pause ({}ms utterance)",
            event.sequence,
            event.pause_ms(),
            event.utterance_ms()
        );
        debug!("Cooldown of {}ms started", self.cooldown.as_millis());

        Some(event)
    }

    pub fn last_backchannel(&self) -> Option<Instant> {
        self.last_backchannel
    }

    pub fn fired_count(&self) -> u64 {
        self.fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::turn::UtteranceEnd;

    fn evaluator() -> TriggerEvaluator {
        TriggerEvaluator::new(
            Duration::from_millis(400),
            Duration::from_millis(1000),
            Duration::from_millis(1400),
        )
    }

    fn pause(since: Instant, utterance_ms: u64, pitch_shift_ok: bool) -> Pause {
        Pause {
            since,
            utterance: UtteranceEnd {
                duration: Duration::from_millis(utterance_ms),
                pitch_shift_ok,
            },
        }
    }

    #[test]
    fn test_fires_when_all_conditions_hold() {
        let mut trigger = evaluator();
        let base = Instant::now();
        let p = pause(base, 1500, true);

        assert!(trigger.evaluate(&p, base + Duration::from_millis(390)).is_none());

        let event = trigger.evaluate(&p, base + Duration::from_millis(400)).unwrap();
        assert_eq!(event.at, base + Duration::from_millis(400));
        assert_eq!(event.pause_ms(), 400);
        assert_eq!(event.utterance_ms(), 1500);
        assert_eq!(event.sequence, 1);
        assert_eq!(trigger.last_backchannel(), Some(event.at));
    }

    #[test]
    fn test_short_utterance_never_fires() {
        let mut trigger = evaluator();
        let base = Instant::now();
        let p = pause(base, 999, true);
        for ms in (0..5000).step_by(10) {
            assert!(trigger.evaluate(&p, base + Duration::from_millis(ms)).is_none());
        }
        assert_eq!(trigger.fired_count(), 0);
    }

    #[test]
    fn test_missing_pitch_cue_never_fires() {
        let mut trigger = evaluator();
        let base = Instant::now();
        let p = pause(base, 3000, false);
        let conditions = trigger.conditions(&p, base + Duration::from_secs(2));
        assert!(conditions.pause_ok && conditions.speech_ok && conditions.cooldown_ok);
        assert!(!conditions.pitch_ok);
        assert!(trigger.evaluate(&p, base + Duration::from_secs(2)).is_none());
    }

    #[test]
    fn test_cooldown_blocks_second_trigger() {
        let mut trigger = evaluator();
        let base = Instant::now();

        let first = pause(base, 1200, true);
        assert!(trigger.evaluate(&first, base + Duration::from_millis(400)).is_some());

        // A new qualifying pause 1000ms after the first trigger
        let second = pause(base + Duration::from_millis(1000), 1200, true);
        let now = base + Duration::from_millis(1400);
        assert!(!trigger.conditions(&second, now).cooldown_ok);
        assert!(trigger.evaluate(&second, now).is_none());

        // Cooldown is inclusive at exactly 1400ms
        let now = base + Duration::from_millis(1800);
        let event = trigger.evaluate(&second, now).unwrap();
        assert_eq!(event.sequence, 2);
    }

    #[test]
    fn test_first_trigger_not_blocked_by_cooldown() {
        let trigger = evaluator();
        let base = Instant::now();
        assert!(trigger.conditions(&pause(base, 0, false), base).cooldown_ok);
    }
}
