//! Events emitted by the engine. Presentation (UI, logs, JSON lines) is
//! up to the consumer; the engine holds no reference to any of it.

use serde::{Deserialize, Serialize};

use crate::debouncer::AttentionState;
use crate::dispatcher::{DispatchDecision, PlaybackCommand};
use crate::pose_estimator::PoseSource;

/// Per-frame diagnostic, emitted after every admitted frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDiagnostic {
    pub timestamp_us: i64,
    pub face_detected: bool,
    pub facing: bool,
    pub vertical_metric: f32,
    pub vertical_source: PoseSource,
    pub pitch_down_threshold: f32,
    pub yaw: Option<f32>,
    pub roll: Option<f32>,
    pub raw_attending: bool,
}

/// Why a transition was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// Raw signal held for the dwell time
    Dwell,
    /// Watchdog injected a face-loss observation
    Watchdog,
    /// External disable signal
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub previous: AttentionState,
    pub new: AttentionState,
    pub timestamp_us: i64,
    pub cause: TransitionCause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub command: PlaybackCommand,
    pub decision: DispatchDecision,
    pub timestamp_us: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    Frame(FrameDiagnostic),
    StateChanged(StateTransition),
    Command(CommandRecord),
}

impl EngineEvent {
    pub fn timestamp_us(&self) -> i64 {
        match self {
            Self::Frame(d) => d.timestamp_us,
            Self::StateChanged(t) => t.timestamp_us,
            Self::Command(c) => c.timestamp_us,
        }
    }

    /// Single-line JSON encoding.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
