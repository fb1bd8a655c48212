//! Attention Engine
//!
//! Owns every piece of shared mutable state (pose cache and stability
//! counter, debounce clock, attention state, face-loss timer) behind one
//! `&mut self`. Both event sources feed it:
//! - frame arrivals via [`AttentionEngine::process_frame`]
//! - periodic watchdog ticks via [`AttentionEngine::watchdog_tick`]
//!
//! Callers serialize access (see [`crate::runtime`]); the engine itself is
//! synchronous and deterministic in its timestamps.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::classifier::AttentionClassifier;
use crate::config::{GazeplayConfig, ThresholdConfig};
use crate::debouncer::{AttentionState, Commit, HysteresisDebouncer};
use crate::dispatcher::{PlaybackCommand, PlaybackDispatcher};
use crate::domain::FaceGeometry;
use crate::events::{CommandRecord, EngineEvent, FrameDiagnostic, StateTransition, TransitionCause};
use crate::frame_gate::FrameGate;
use crate::pose_estimator::{PoseEstimator, PoseSource};
use crate::provider::FaceProvider;
use crate::sinks::PlaybackSink;
use crate::watchdog::Watchdog;

/// Point-in-time view of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub state: AttentionState,
    pub enabled: bool,
    pub pitch_down_threshold: f32,
    pub stability_counter: u32,
    pub fast_path_active: bool,
    pub frames_admitted: u64,
    pub frames_dropped: u64,
    pub commands_sent: u64,
    pub commands_suppressed: u64,
    pub last_face_seen_us: Option<i64>,
}

#[derive(Debug)]
pub struct AttentionEngine {
    gate: FrameGate,
    estimator: PoseEstimator,
    classifier: AttentionClassifier,
    debouncer: HysteresisDebouncer,
    watchdog: Watchdog,
    dispatcher: PlaybackDispatcher,
    enabled: bool,
}

impl AttentionEngine {
    pub fn new(config: &ThresholdConfig, sink: Arc<dyn PlaybackSink>) -> Self {
        Self {
            gate: FrameGate::new(config.min_frame_interval_us),
            estimator: PoseEstimator::new(config),
            classifier: AttentionClassifier::new(config.pitch_down_threshold),
            debouncer: HysteresisDebouncer::new(config.on_delay_us, config.off_delay_us),
            watchdog: Watchdog::new(config.watchdog_period_us, config.face_loss_timeout_us),
            dispatcher: PlaybackDispatcher::new(sink, config.command_min_interval_us),
            enabled: true,
        }
    }

    pub fn from_config(config: &GazeplayConfig, sink: Arc<dyn PlaybackSink>) -> Self {
        Self::new(&config.threshold_config(), sink)
    }

    /// Start the dwell and face-loss clocks. Idempotent; the first frame or
    /// tick does this implicitly.
    pub fn start(&mut self, now_us: i64) {
        self.debouncer.anchor(now_us);
        self.watchdog.anchor(now_us);
    }

    /// Gate, detect, estimate, classify, debounce, dispatch.
    ///
    /// Provider failures are logged and treated as "no face".
    pub fn process_frame<P>(&mut self, provider: &mut P, frame: &P::Frame, now_us: i64) -> Vec<EngineEvent>
    where
        P: FaceProvider + ?Sized,
    {
        if !self.gate.admit(now_us) {
            return Vec::new();
        }
        let geometry = match provider.detect(frame) {
            Ok(geometry) => geometry,
            Err(e) => {
                warn!(error = %e, "face provider failed; treating frame as no face");
                None
            }
        };
        self.evaluate(geometry.as_ref(), now_us)
    }

    /// Same as [`process_frame`](Self::process_frame) for callers that
    /// already hold the detection result.
    pub fn process_geometry(&mut self, geometry: Option<&FaceGeometry>, now_us: i64) -> Vec<EngineEvent> {
        if !self.gate.admit(now_us) {
            return Vec::new();
        }
        self.evaluate(geometry, now_us)
    }

    fn evaluate(&mut self, geometry: Option<&FaceGeometry>, now_us: i64) -> Vec<EngineEvent> {
        self.start(now_us);
        let mut events = Vec::with_capacity(3);

        // A detection with neither pitch nor both eyes is treated as no face:
        // it refreshes nothing and is never attending.
        let estimate = geometry.filter(|g| g.is_usable()).map(|g| {
            self.watchdog.face_seen(now_us);
            self.estimator.estimate(g, now_us)
        });
        let raw_attending = self.classifier.classify(estimate.as_ref());

        let diagnostic = FrameDiagnostic {
            timestamp_us: now_us,
            face_detected: geometry.is_some(),
            facing: estimate.map(|e| e.facing).unwrap_or(false),
            vertical_metric: estimate.map(|e| e.vertical_metric).unwrap_or(0.0),
            vertical_source: estimate.map(|e| e.source).unwrap_or(PoseSource::FallbackNone),
            pitch_down_threshold: self.classifier.pitch_down_threshold(),
            yaw: geometry.and_then(FaceGeometry::yaw),
            roll: geometry.and_then(FaceGeometry::roll),
            raw_attending,
        };
        debug!(
            ts = now_us,
            face = diagnostic.face_detected,
            facing = diagnostic.facing,
            metric = diagnostic.vertical_metric,
            source = ?diagnostic.vertical_source,
            raw = raw_attending,
            "frame evaluated"
        );
        events.push(EngineEvent::Frame(diagnostic));

        if self.enabled {
            if let Some(commit) = self.debouncer.observe(raw_attending, now_us) {
                self.apply_commit(commit, TransitionCause::Dwell, now_us, &mut events);
            }
        }
        events
    }

    /// Periodic liveness check. Forces a "not attending" observation and
    /// drops fast-path confidence once the face has been gone too long.
    pub fn watchdog_tick(&mut self, now_us: i64) -> Vec<EngineEvent> {
        self.start(now_us);
        let mut events = Vec::new();
        if !self.watchdog.face_lost(now_us) {
            return events;
        }

        if self.estimator.fast_path_active() {
            debug!(ts = now_us, "face lost; fast path disabled");
        }
        self.estimator.reset_stability();

        if self.enabled {
            let raw_attending = self.classifier.classify(None);
            if let Some(commit) = self.debouncer.observe(raw_attending, now_us) {
                self.apply_commit(commit, TransitionCause::Watchdog, now_us, &mut events);
            }
        }
        events
    }

    /// Disabling commits `Away` at once and halts dispatch. Enabling
    /// resumes dispatch but never commits `Looking` by itself.
    pub fn set_enabled(&mut self, enabled: bool, now_us: i64) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if enabled == self.enabled {
            return events;
        }
        self.start(now_us);
        self.enabled = enabled;

        if enabled {
            info!(ts = now_us, "attention engine enabled");
            self.dispatcher.resume();
            self.debouncer.rearm(now_us);
        } else {
            info!(ts = now_us, "attention engine disabled");
            if let Some(commit) = self.debouncer.force_away(now_us) {
                self.apply_commit(commit, TransitionCause::Disabled, now_us, &mut events);
            }
            self.dispatcher.halt();
        }
        events
    }

    /// Live threshold update; takes effect on the next evaluation.
    /// Returns `false` (and keeps the old value) for non-finite input.
    pub fn set_pitch_down_threshold(&mut self, threshold: f32) -> bool {
        let accepted = self.classifier.set_pitch_down_threshold(threshold);
        if accepted {
            info!(threshold, "pitch-down threshold updated");
        } else {
            warn!(threshold, "rejected non-finite pitch-down threshold");
        }
        accepted
    }

    fn apply_commit(
        &mut self,
        commit: Commit,
        cause: TransitionCause,
        now_us: i64,
        events: &mut Vec<EngineEvent>,
    ) {
        info!(
            ts = now_us,
            from = ?commit.previous,
            to = ?commit.new,
            ?cause,
            "attention state committed"
        );
        events.push(EngineEvent::StateChanged(StateTransition {
            previous: commit.previous,
            new: commit.new,
            timestamp_us: now_us,
            cause,
        }));

        let command = PlaybackCommand::for_attending(commit.attending);
        let decision = self.dispatcher.dispatch(command, now_us);
        events.push(EngineEvent::Command(CommandRecord {
            command,
            decision,
            timestamp_us: now_us,
        }));
    }

    pub fn state(&self) -> AttentionState {
        self.debouncer.state()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn watchdog_period_us(&self) -> u64 {
        self.watchdog.period_us()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            state: self.debouncer.state(),
            enabled: self.enabled,
            pitch_down_threshold: self.classifier.pitch_down_threshold(),
            stability_counter: self.estimator.stability(),
            fast_path_active: self.estimator.fast_path_active(),
            frames_admitted: self.gate.admitted(),
            frames_dropped: self.gate.dropped(),
            commands_sent: self.dispatcher.sent(),
            commands_suppressed: self.dispatcher.suppressed(),
            last_face_seen_us: self.watchdog.last_face_seen_us(),
        }
    }
}
