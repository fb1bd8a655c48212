//! Error taxonomy.
//!
//! Nothing inside the attention core is fatal. Missing faces and missing
//! landmarks are ordinary observations (`None` geometry, `PoseSource::FallbackNone`)
//! and never appear here. Provider and dispatch failures are logged and
//! swallowed by the engine.

use thiserror::Error;

/// Failure of the face/pose detection call itself.
///
/// The engine treats this exactly like "no face detected".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("detection backend failed: {0}")]
    Backend(String),
}

/// Failure to deliver a playback command to the sink.
///
/// Only ever surfaced as a diagnostic; never alters attention state or
/// throttle bookkeeping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no open tab matches the media allow-list")]
    NoMatchingTab,
    #[error("permission to control the target was denied")]
    PermissionDenied,
    #[error("scripting is disabled in the target application")]
    ScriptingDisabled,
    #[error("playback sink error: {0}")]
    Sink(String),
}

/// Errors from the runtime handle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("attention service has stopped")]
    Closed,
    #[error("pitch-down threshold must be finite, got {0}")]
    InvalidThreshold(f32),
    #[error("no tokio runtime available")]
    NoRuntime,
}
