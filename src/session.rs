use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::{
    error::PipelineError,
    game::{MatchEngine, RoundPhase},
    labels::LabelTable,
    pipeline::{self, ScavengerModel},
    types::{Frame, GameEvent, TargetEmoji},
};

/// Tick pacing when no frame is ready, roughly one display refresh.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Drives the per-frame pipeline: preprocess, classify, top-K, confirm.
///
/// One pass at a time, no reentrancy: the loop runs a pass to completion
/// before looking at the next frame, so at most one classification is ever
/// in flight and the match engine is mutated from exactly one place. A
/// paused session keeps ticking (and draining stale frames) but skips all
/// pipeline work, so resuming stays snappy.
pub struct GameSession<M: ScavengerModel> {
    model: M,
    labels: LabelTable,
    engine: MatchEngine,
    running: Arc<AtomicBool>,
    events_tx: Sender<GameEvent>,
    debug_mode: bool,
}

impl<M: ScavengerModel> GameSession<M> {
    pub fn new(model: M, labels: LabelTable, events_tx: Sender<GameEvent>) -> Self {
        GameSession {
            model,
            labels,
            engine: MatchEngine::new(),
            running: Arc::new(AtomicBool::new(true)),
            events_tx,
            debug_mode: false,
        }
    }

    /// Also emit the full top-K list per frame, for the debug overlay.
    pub fn with_debug(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    /// Shared pause/resume flag. Clearing it takes effect at the start of
    /// the next pass; an in-flight pass always completes.
    #[allow(dead_code)]
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn start_round(&mut self, target: TargetEmoji) {
        self.engine.start_round(target);
    }

    /// Pump passes until the round reaches a terminal phase or the frame
    /// source disconnects. Recoverable errors skip the pass; anything else
    /// halts the loop and is returned to the caller.
    pub fn run(mut self, frame_rx: Receiver<Frame>) -> Result<RoundPhase, PipelineError> {
        loop {
            if self.engine.phase().is_terminal() {
                return Ok(self.engine.phase());
            }

            if !self.running.load(Ordering::Relaxed) {
                // Paused: drop whatever frame is pending and tick again.
                match frame_rx.recv_timeout(FRAME_INTERVAL) {
                    Ok(_) | Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => {
                        log::info!("frame source closed while paused");
                        return Ok(self.engine.phase());
                    }
                }
            }

            let frame = match recv_latest_frame(&frame_rx) {
                Ok(frame) => frame,
                Err(RecvTimeoutError::Timeout) => {
                    log::debug!("{}", PipelineError::FrameUnavailable);
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    log::info!("frame source closed, stopping game loop");
                    return Ok(self.engine.phase());
                }
            };

            match self.pass(&frame) {
                Ok(()) => {}
                Err(err) if err.is_recoverable() => log::warn!("pass skipped: {err}"),
                Err(err) => {
                    log::error!("game loop halted: {err}");
                    return Err(err);
                }
            }
        }
    }

    /// One full pass over a single frame. The match engine is only touched
    /// once every preceding step has succeeded; an abandoned pass leaves the
    /// round state exactly as it was.
    fn pass(&mut self, frame: &Frame) -> Result<(), PipelineError> {
        let input = pipeline::crop_and_normalize(frame, pipeline::VIDEO_PIXELS)?;
        let scores = self
            .model
            .predict(input)
            .map_err(PipelineError::Classifier)?;
        self.labels.check_scores(&scores)?;

        let top = pipeline::top_k(&scores, &self.labels, pipeline::TOP_K);

        if self.debug_mode {
            let _ = self.events_tx.try_send(GameEvent::TopPredictions(top.clone()));
        }

        for event in self.engine.observe(&top) {
            let _ = self.events_tx.try_send(event);
        }

        Ok(())
    }
}

/// Take the newest pending frame, discarding any the camera produced while
/// the previous pass was running.
fn recv_latest_frame(frame_rx: &Receiver<Frame>) -> Result<Frame, RecvTimeoutError> {
    let mut frame = frame_rx.recv_timeout(FRAME_INTERVAL)?;
    while let Ok(newer) = frame_rx.try_recv() {
        frame = newer;
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Prediction;
    use anyhow::anyhow;
    use crossbeam_channel::{bounded, unbounded};
    use ndarray::Array4;
    use std::{thread, time::Instant};

    /// Scripted stand-in for the ONNX model: returns one pre-baked score
    /// vector per call, then keeps repeating the last one.
    struct ScriptedModel {
        script: Vec<anyhow::Result<Vec<f32>>>,
        calls: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl ScriptedModel {
        fn new(script: Vec<anyhow::Result<Vec<f32>>>) -> Self {
            ScriptedModel {
                script,
                calls: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
            }
        }

        fn call_counter(&self) -> Arc<std::sync::atomic::AtomicUsize> {
            self.calls.clone()
        }
    }

    impl ScavengerModel for ScriptedModel {
        fn predict(&mut self, _input: Array4<f32>) -> anyhow::Result<Vec<f32>> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self
                .script
                .get(index.min(self.script.len().saturating_sub(1)))
                .expect("scripted model called with an empty script");
            match step {
                Ok(scores) => Ok(scores.clone()),
                Err(err) => Err(anyhow!("{err}")),
            }
        }
    }

    fn labels() -> LabelTable {
        LabelTable::from_names(["tv", "lamp", "chair"])
    }

    fn frame(width: u32, height: u32) -> Frame {
        Frame {
            rgba: vec![128; (width * height * 4) as usize],
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// Feed identical frames until the session drops its receiver.
    fn spawn_frame_feeder() -> Receiver<Frame> {
        let (tx, rx) = bounded(1);
        thread::spawn(move || {
            while tx.send(frame(320, 320)).is_ok() {}
        });
        rx
    }

    /// Feed exactly `count` frames, then disconnect.
    fn spawn_finite_feeder(count: usize) -> Receiver<Frame> {
        let (tx, rx) = bounded(1);
        thread::spawn(move || {
            for _ in 0..count {
                if tx.send(frame(320, 320)).is_err() {
                    break;
                }
            }
        });
        rx
    }

    #[test]
    fn round_won_when_target_reaches_top_two() {
        // Pass 1: lamp/chair on top. Pass 2: tv takes the lead.
        let model = ScriptedModel::new(vec![
            Ok(vec![0.1, 0.6, 0.3]),
            Ok(vec![0.7, 0.2, 0.1]),
        ]);
        let (events_tx, events_rx) = unbounded();

        let mut session = GameSession::new(model, labels(), events_tx);
        session.start_round(TargetEmoji::new("tv", "📺"));

        let phase = session.run(spawn_frame_feeder()).unwrap();
        assert_eq!(phase, RoundPhase::Found);

        let events: Vec<GameEvent> = events_rx.try_iter().collect();
        assert_eq!(
            events[0],
            GameEvent::InitialGuess {
                label: "lamp".to_string()
            }
        );
        assert!(matches!(
            events.last(),
            Some(GameEvent::MatchFound { attempts: 2, .. })
        ));
    }

    #[test]
    fn round_exhausts_after_one_hundred_processed_frames() {
        let model = ScriptedModel::new(vec![Ok(vec![0.1, 0.6, 0.3])]);
        let (events_tx, events_rx) = unbounded();

        let mut session = GameSession::new(model, labels(), events_tx);
        session.start_round(TargetEmoji::new("tv", "📺"));

        let phase = session.run(spawn_frame_feeder()).unwrap();
        assert_eq!(phase, RoundPhase::Exhausted);

        let events: Vec<GameEvent> = events_rx.try_iter().collect();
        assert!(!events.iter().any(|e| matches!(e, GameEvent::MatchFound { .. })));
        assert!(events.contains(&GameEvent::RoundExhausted { attempts: 100 }));
    }

    #[test]
    fn classifier_failure_halts_the_loop() {
        let model = ScriptedModel::new(vec![Err(anyhow!("device lost"))]);
        let (events_tx, events_rx) = unbounded();

        let mut session = GameSession::new(model, labels(), events_tx);
        session.start_round(TargetEmoji::new("tv", "📺"));

        let err = session.run(spawn_frame_feeder()).unwrap_err();
        assert!(matches!(err, PipelineError::Classifier(_)));
        assert!(events_rx.try_iter().next().is_none());
    }

    #[test]
    fn too_small_frames_abort_without_touching_round_state() {
        let model = ScriptedModel::new(vec![Ok(vec![0.1, 0.6, 0.3])]);
        let calls = model.call_counter();
        let (events_tx, events_rx) = unbounded();

        let mut session = GameSession::new(model, labels(), events_tx);
        session.start_round(TargetEmoji::new("tv", "📺"));

        let (tx, rx) = bounded(1);
        thread::spawn(move || {
            let _ = tx.send(frame(100, 100));
        });

        let err = session.run(rx).unwrap_err();
        assert!(matches!(err, PipelineError::FrameTooSmall { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(events_rx.try_iter().next().is_none());
    }

    #[test]
    fn label_width_mismatch_is_fatal() {
        let model = ScriptedModel::new(vec![Ok(vec![0.5, 0.5])]);
        let (events_tx, _events_rx) = unbounded();

        let mut session = GameSession::new(model, labels(), events_tx);
        session.start_round(TargetEmoji::new("tv", "📺"));

        let err = session.run(spawn_frame_feeder()).unwrap_err();
        assert!(matches!(err, PipelineError::LabelCountMismatch { .. }));
    }

    #[test]
    fn paused_session_skips_pipeline_work() {
        let model = ScriptedModel::new(vec![Ok(vec![0.7, 0.2, 0.1])]);
        let calls = model.call_counter();
        let (events_tx, _events_rx) = unbounded();

        let mut session = GameSession::new(model, labels(), events_tx);
        session.start_round(TargetEmoji::new("tv", "📺"));
        session.running_flag().store(false, Ordering::SeqCst);

        let phase = session.run(spawn_finite_feeder(8)).unwrap();
        assert_eq!(phase, RoundPhase::Searching);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn debug_mode_emits_full_top_k() {
        let model = ScriptedModel::new(vec![Ok(vec![0.7, 0.2, 0.1])]);
        let (events_tx, events_rx) = unbounded();

        let mut session = GameSession::new(model, labels(), events_tx).with_debug(true);
        session.start_round(TargetEmoji::new("tv", "📺"));

        let phase = session.run(spawn_frame_feeder()).unwrap();
        assert_eq!(phase, RoundPhase::Found);

        let events: Vec<GameEvent> = events_rx.try_iter().collect();
        let top = events
            .iter()
            .find_map(|e| match e {
                GameEvent::TopPredictions(list) => Some(list),
                _ => None,
            })
            .expect("debug mode should emit the top-K list");
        assert_eq!(
            top.first(),
            Some(&Prediction {
                label: "tv".to_string(),
                score: 0.7
            })
        );
    }
}
