//! gazeplay core: infers whether the user is watching the screen from
//! per-frame face geometry and drives a debounced play/pause signal.
//!
//! Pipeline, leaf first:
//! frame gate → face provider → pose estimator → classifier → hysteresis
//! debouncer → playback dispatcher → sink. The watchdog runs on its own
//! clock and injects face-loss observations into the same path.

pub mod classifier;
pub mod config;
pub mod debouncer;
pub mod dispatcher;
pub mod domain;
pub mod engine;
pub mod error;
pub mod events;
pub mod frame_gate;
pub mod pose_estimator;
pub mod provider;
pub mod runtime;
pub mod sinks;
pub mod watchdog;

#[cfg(test)]
pub mod tests_config;

pub use classifier::AttentionClassifier;
pub use config::{
    ConfigError, DispatchSection, DispatchStrategy, GazeplayConfig, ThresholdConfig,
    ThresholdSection, TimingSection,
};
pub use debouncer::{AttentionState, DebounceClock, HysteresisDebouncer};
pub use dispatcher::{DispatchDecision, PlaybackCommand, PlaybackDispatcher};
pub use domain::{dt_sec, dt_us, FaceGeometry, FaceLandmarks, FaceRect, HeadPose, Point2};
pub use engine::{AttentionEngine, EngineSnapshot};
pub use error::{DispatchError, ProviderError, ServiceError};
pub use events::{CommandRecord, EngineEvent, FrameDiagnostic, StateTransition, TransitionCause};
pub use frame_gate::FrameGate;
pub use pose_estimator::{PoseEstimate, PoseEstimator, PoseSource};
pub use provider::{FaceProvider, PrecomputedProvider};
pub use runtime::{AttentionService, BackgroundSink, ServiceHandle};
pub use sinks::{
    build_sink, host_matches_allowlist, MediaKeyPoster, MediaKeySink, PlaybackSink,
    TabScriptSink, TabScripter,
};
pub use watchdog::Watchdog;
