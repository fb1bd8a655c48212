//! Attention classification: face presence, facing and vertical metric
//! collapsed into a single raw boolean.

use crate::pose_estimator::{PoseEstimate, PoseSource};

#[derive(Debug, Clone)]
pub struct AttentionClassifier {
    pitch_down_threshold: f32,
}

impl AttentionClassifier {
    pub fn new(pitch_down_threshold: f32) -> Self {
        Self {
            pitch_down_threshold,
        }
    }

    /// `None` means no face was detected, which is never attending. Neither
    /// is a face whose vertical metric could not be derived.
    pub fn classify(&self, estimate: Option<&PoseEstimate>) -> bool {
        match estimate {
            None => false,
            Some(e) if e.source == PoseSource::FallbackNone => false,
            Some(e) => e.facing && e.vertical_metric > self.pitch_down_threshold,
        }
    }

    pub fn pitch_down_threshold(&self) -> f32 {
        self.pitch_down_threshold
    }

    /// Live tuning. Non-finite values are rejected and the old threshold kept.
    pub fn set_pitch_down_threshold(&mut self, threshold: f32) -> bool {
        if !threshold.is_finite() {
            return false;
        }
        self.pitch_down_threshold = threshold;
        true
    }
}
