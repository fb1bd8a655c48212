#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use gazeplay_core::{
    AttentionEngine, DispatchDecision, DispatchError, EngineEvent, FaceGeometry, FaceLandmarks,
    HeadPose, PlaybackCommand, PlaybackSink, Point2, StateTransition, ThresholdConfig,
};

/// Sink that records every delivered command.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<PlaybackCommand>>,
}

impl RecordingSink {
    pub fn delivered(&self) -> Vec<PlaybackCommand> {
        self.delivered.lock().unwrap().clone()
    }
}

impl PlaybackSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn deliver(&self, command: PlaybackCommand) -> Result<(), DispatchError> {
        self.delivered.lock().unwrap().push(command);
        Ok(())
    }
}

pub fn engine_with(config: &ThresholdConfig) -> (AttentionEngine, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    (AttentionEngine::new(config, sink.clone()), sink)
}

pub fn engine() -> (AttentionEngine, Arc<RecordingSink>) {
    engine_with(&ThresholdConfig::default())
}

/// Face pointed at the screen with the given pitch.
pub fn facing(pitch: f32) -> FaceGeometry {
    FaceGeometry {
        pose: Some(HeadPose::new(pitch, 0.0, 0.0)),
        ..Default::default()
    }
}

/// Face looking well below the default pitch-down threshold.
pub fn looking_down() -> FaceGeometry {
    facing(-0.8)
}

/// Face turned away from the screen.
pub fn turned_away() -> FaceGeometry {
    FaceGeometry {
        pose: Some(HeadPose::new(0.0, 1.0, 0.0)),
        ..Default::default()
    }
}

/// Eye and nose landmarks only; no direct pose. Vertical metric 0.3.
pub fn eyes_only() -> FaceGeometry {
    FaceGeometry {
        landmarks: Some(FaceLandmarks {
            left_eye: vec![Point2::new(-1.0, 0.0), Point2::new(1.0, 0.0)],
            right_eye: vec![Point2::new(9.0, 0.0), Point2::new(11.0, 0.0)],
            nose: Some(vec![Point2::new(5.0, 2.0), Point2::new(5.0, 4.0)]),
            nose_outline: None,
        }),
        ..Default::default()
    }
}

/// Both eyes but no nose landmarks: a face whose vertical metric is unavailable.
pub fn eyes_without_nose() -> FaceGeometry {
    let mut geometry = eyes_only();
    if let Some(lm) = geometry.landmarks.as_mut() {
        lm.nose = None;
    }
    geometry
}

/// Yaw and roll only. Not enough to judge attention.
pub fn pose_without_pitch() -> FaceGeometry {
    FaceGeometry {
        pose: Some(HeadPose {
            pitch: None,
            yaw: Some(0.0),
            roll: Some(0.0),
        }),
        ..Default::default()
    }
}

/// Feed `geometry` every `step_us` over `[from_us, to_us]`.
pub fn feed(
    engine: &mut AttentionEngine,
    from_us: i64,
    to_us: i64,
    step_us: i64,
    geometry: Option<&FaceGeometry>,
) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    let mut t = from_us;
    while t <= to_us {
        events.extend(engine.process_geometry(geometry, t));
        t += step_us;
    }
    events
}

pub fn transitions(events: &[EngineEvent]) -> Vec<StateTransition> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::StateChanged(t) => Some(*t),
            _ => None,
        })
        .collect()
}

pub fn commands(events: &[EngineEvent]) -> Vec<(PlaybackCommand, DispatchDecision, i64)> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Command(c) => Some((c.command, c.decision, c.timestamp_us)),
            _ => None,
        })
        .collect()
}
