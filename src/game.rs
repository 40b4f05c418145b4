use crate::types::{GameEvent, Prediction, TargetEmoji};

/// Hard ceiling on processed frames per round. Once reached without a match
/// the round ends in `Exhausted`.
pub const MAX_ATTEMPTS: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    Searching,
    Found,
    Exhausted,
}

impl RoundPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundPhase::Found | RoundPhase::Exhausted)
    }
}

/// Per-round bookkeeping. Reset wholesale on round start, mutated once per
/// processed frame, discarded when the round ends.
#[derive(Clone, Debug, Default)]
struct MatchState {
    top_guess: Option<String>,
    has_spoken_once: bool,
    attempts: u32,
}

/// Turns noisy per-frame top-K predictions into a debounced round outcome.
///
/// Raw top-1 classification flickers frame to frame, so the win check
/// accepts the target in either of the top two slots. That tolerates
/// one-slot confusion without temporal smoothing, trading the occasional
/// false positive for responsiveness.
pub struct MatchEngine {
    phase: RoundPhase,
    target: Option<TargetEmoji>,
    state: MatchState,
}

impl MatchEngine {
    pub fn new() -> Self {
        MatchEngine {
            phase: RoundPhase::Idle,
            target: None,
            state: MatchState::default(),
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    #[allow(dead_code)]
    pub fn attempts(&self) -> u32 {
        self.state.attempts
    }

    /// Begin hunting for `target`. Clears all round state, including the
    /// attempt counter and the one-shot speech latch.
    pub fn start_round(&mut self, target: TargetEmoji) {
        log::info!("round started, hunting {} {}", target.glyph, target.name);
        self.target = Some(target);
        self.state = MatchState::default();
        self.phase = RoundPhase::Searching;
    }

    /// Feed one frame's predictions through the state machine.
    ///
    /// Calls outside `Searching` are inert. An empty prediction list is a
    /// contract violation and panics.
    pub fn observe(&mut self, predictions: &[Prediction]) -> Vec<GameEvent> {
        if self.phase != RoundPhase::Searching {
            return Vec::new();
        }
        assert!(
            !predictions.is_empty(),
            "observe called with an empty prediction list"
        );

        let mut events = Vec::new();
        let top1 = predictions[0].label.as_str();
        let top2 = predictions.get(1).map(|p| p.label.as_str());

        // The top-guess update runs before the match check and regardless of
        // whether this frame wins; the initial guess is spoken exactly once.
        if self.state.top_guess.as_deref() != Some(top1) {
            self.state.top_guess = Some(top1.to_string());
            if !self.state.has_spoken_once {
                events.push(GameEvent::InitialGuess {
                    label: top1.to_string(),
                });
                self.state.has_spoken_once = true;
            }
        }

        self.state.attempts += 1;

        let target = self
            .target
            .as_ref()
            .expect("searching round without a target");
        let matched = top1 == target.name || top2 == Some(target.name.as_str());

        // Checked in priority order: a match on the ceiling frame is a win.
        if matched {
            self.phase = RoundPhase::Found;
            events.push(GameEvent::MatchFound {
                target: target.clone(),
                attempts: self.state.attempts,
            });
        } else if self.state.attempts >= MAX_ATTEMPTS {
            self.phase = RoundPhase::Exhausted;
            events.push(GameEvent::RoundExhausted {
                attempts: self.state.attempts,
            });
        } else {
            log::debug!(
                "attempt {}: top guess {top1:?}, no match",
                self.state.attempts
            );
        }

        events
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        MatchEngine::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preds(labels: &[&str]) -> Vec<Prediction> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| Prediction {
                label: label.to_string(),
                score: 1.0 - i as f32 * 0.1,
            })
            .collect()
    }

    fn searching_engine(target: &str) -> MatchEngine {
        let mut engine = MatchEngine::new();
        engine.start_round(TargetEmoji::new(target, "📺"));
        engine
    }

    #[test]
    fn finds_target_in_top_slot_on_second_frame() {
        let mut engine = searching_engine("tv");

        let events = engine.observe(&preds(&["lamp", "chair"]));
        assert_eq!(engine.phase(), RoundPhase::Searching);
        assert_eq!(engine.attempts(), 1);
        assert_eq!(
            events,
            vec![GameEvent::InitialGuess {
                label: "lamp".to_string()
            }]
        );

        let events = engine.observe(&preds(&["tv", "lamp"]));
        assert_eq!(engine.phase(), RoundPhase::Found);
        assert_eq!(engine.attempts(), 2);
        assert!(matches!(
            events.as_slice(),
            [GameEvent::MatchFound { attempts: 2, .. }]
        ));
    }

    #[test]
    fn second_slot_also_wins() {
        let mut engine = searching_engine("tv");
        let events = engine.observe(&preds(&["lamp", "tv"]));
        assert_eq!(engine.phase(), RoundPhase::Found);
        // Initial guess still fires for the losing top-1 label.
        assert!(matches!(events[0], GameEvent::InitialGuess { .. }));
        assert!(matches!(events[1], GameEvent::MatchFound { .. }));
    }

    #[test]
    fn exhausts_at_exactly_one_hundred_attempts() {
        let mut engine = searching_engine("cat");

        for i in 1..=99 {
            let events = engine.observe(&preds(&["lamp", "chair"]));
            assert_eq!(engine.phase(), RoundPhase::Searching);
            assert_eq!(engine.attempts(), i);
            assert!(!events.iter().any(|e| matches!(e, GameEvent::MatchFound { .. })));
        }

        let events = engine.observe(&preds(&["lamp", "chair"]));
        assert_eq!(engine.attempts(), 100);
        assert_eq!(engine.phase(), RoundPhase::Exhausted);
        assert_eq!(events, vec![GameEvent::RoundExhausted { attempts: 100 }]);
    }

    #[test]
    fn match_on_ceiling_frame_counts_as_win() {
        let mut engine = searching_engine("tv");
        for _ in 0..99 {
            engine.observe(&preds(&["lamp", "chair"]));
        }
        let events = engine.observe(&preds(&["tv", "chair"]));
        assert_eq!(engine.phase(), RoundPhase::Found);
        assert!(matches!(
            events.as_slice(),
            [GameEvent::MatchFound { attempts: 100, .. }]
        ));
    }

    #[test]
    fn initial_guess_spoken_exactly_once() {
        let mut engine = searching_engine("cat");

        let first = engine.observe(&preds(&["lamp", "chair"]));
        assert_eq!(first.len(), 1);

        // Same label again: no event. Changed label: still no event, the
        // one-shot latch has fired.
        assert!(engine.observe(&preds(&["lamp", "chair"])).is_empty());
        assert!(engine.observe(&preds(&["shoe", "chair"])).is_empty());
        assert!(engine.observe(&preds(&["lamp", "chair"])).is_empty());
        assert_eq!(engine.attempts(), 4);
    }

    #[test]
    fn attempts_reset_only_on_round_start() {
        let mut engine = searching_engine("cat");
        engine.observe(&preds(&["lamp", "chair"]));
        engine.observe(&preds(&["lamp", "chair"]));
        assert_eq!(engine.attempts(), 2);

        engine.start_round(TargetEmoji::new("tv", "📺"));
        assert_eq!(engine.attempts(), 0);

        // The speech latch is reset too.
        let events = engine.observe(&preds(&["lamp", "chair"]));
        assert!(matches!(events.as_slice(), [GameEvent::InitialGuess { .. }]));
    }

    #[test]
    fn terminal_phases_ignore_further_frames() {
        let mut engine = searching_engine("tv");
        engine.observe(&preds(&["tv", "lamp"]));
        assert_eq!(engine.phase(), RoundPhase::Found);
        assert!(engine.phase().is_terminal());

        let events = engine.observe(&preds(&["tv", "lamp"]));
        assert!(events.is_empty());
        assert_eq!(engine.attempts(), 1);
    }

    #[test]
    fn idle_engine_ignores_frames() {
        let mut engine = MatchEngine::new();
        assert_eq!(engine.phase(), RoundPhase::Idle);
        assert!(engine.observe(&preds(&["lamp", "chair"])).is_empty());
        assert_eq!(engine.attempts(), 0);
    }

    #[test]
    fn single_prediction_frame_is_accepted() {
        let mut engine = searching_engine("tv");
        let events = engine.observe(&preds(&["tv"]));
        assert_eq!(engine.phase(), RoundPhase::Found);
        assert_eq!(events.len(), 2);
    }

    #[test]
    #[should_panic(expected = "empty prediction list")]
    fn empty_prediction_list_panics() {
        let mut engine = searching_engine("tv");
        engine.observe(&[]);
    }
}
