//! Pose Estimation
//!
//! Derives a vertical attention metric and a facing flag from:
//! - Direct head pose angles (pitch, yaw, roll), when the provider supplies them
//! - Eye and nose landmark positions otherwise
//!
//! Landmark extraction is the expensive path. Estimates are cached for
//! `landmark_refresh_interval`, and once direct pitch has been available for
//! `max_stable_frames` consecutive estimates the landmark path is skipped
//! entirely until [`PoseEstimator::reset_stability`] is called.

use serde::{Deserialize, Serialize};

use crate::config::ThresholdConfig;
use crate::domain::{centroid, dt_us, FaceGeometry};

/// Floor for the inter-ocular distance used as the metric denominator.
pub const INTER_OCULAR_EPSILON: f32 = 0.001;

/// Where the vertical metric came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseSource {
    /// Direct pitch measurement from this frame
    PoseAngle,
    /// Nose-to-eye offset normalized by inter-ocular distance
    LandmarkDerived,
    /// Reused from the estimate cache
    CachedPose,
    /// Neither pitch nor landmarks were usable
    FallbackNone,
}

/// Pose estimation result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimate {
    /// Always finite
    pub vertical_metric: f32,
    pub source: PoseSource,
    pub facing: bool,
}

impl Default for PoseEstimate {
    fn default() -> Self {
        Self {
            vertical_metric: 0.0,
            source: PoseSource::FallbackNone,
            facing: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedEstimate {
    estimate: PoseEstimate,
    refreshed_at_us: i64,
}

impl CachedEstimate {
    /// A cached fallback stays a fallback; it carries no measurement.
    fn reuse(&self) -> PoseEstimate {
        match self.estimate.source {
            PoseSource::FallbackNone => self.estimate,
            _ => PoseEstimate {
                source: PoseSource::CachedPose,
                ..self.estimate
            },
        }
    }
}

/// Pose Estimator
#[derive(Debug, Clone)]
pub struct PoseEstimator {
    facing_bound: f32,
    max_stable: u32,
    refresh_interval_us: u64,
    stability: u32,
    cache: Option<CachedEstimate>,
}

impl PoseEstimator {
    pub fn new(config: &ThresholdConfig) -> Self {
        Self {
            facing_bound: config.facing_angle_bound,
            max_stable: config.max_stable_frames.max(1),
            refresh_interval_us: config.landmark_refresh_interval_us,
            stability: 0,
            cache: None,
        }
    }

    /// Estimate attention geometry for one admitted frame.
    pub fn estimate(&mut self, geometry: &FaceGeometry, now_us: i64) -> PoseEstimate {
        let pitch = geometry.pitch();

        // The fast path is only reached through direct-pitch recomputes,
        // so the cache is always populated there.
        if self.fast_path_active() {
            if let Some(p) = pitch {
                return self.adopt_pitch(geometry, p);
            }
            if let Some(cached) = self.cache {
                return cached.reuse();
            }
        }

        let stale = match self.cache {
            None => true,
            Some(c) => dt_us(now_us, c.refreshed_at_us) >= self.refresh_interval_us,
        };
        if stale {
            return self.recompute(geometry, now_us);
        }

        // A direct measurement beats a cached derived one, so take it
        // without waiting for the refresh interval.
        if let Some(p) = pitch {
            return self.adopt_pitch(geometry, p);
        }

        match self.cache {
            Some(cached) => cached.reuse(),
            None => self.recompute(geometry, now_us),
        }
    }

    /// Full recomputation; refreshes the cache timestamp.
    fn recompute(&mut self, geometry: &FaceGeometry, now_us: i64) -> PoseEstimate {
        let facing = self.facing_from(geometry);

        let estimate = if let Some(pitch) = geometry.pitch() {
            self.bump_stability();
            PoseEstimate {
                vertical_metric: pitch,
                source: PoseSource::PoseAngle,
                facing,
            }
        } else {
            self.stability = 0;
            match landmark_metric(geometry) {
                Some(metric) => PoseEstimate {
                    vertical_metric: metric,
                    source: PoseSource::LandmarkDerived,
                    facing,
                },
                None => PoseEstimate {
                    vertical_metric: 0.0,
                    source: PoseSource::FallbackNone,
                    facing,
                },
            }
        };

        self.cache = Some(CachedEstimate {
            estimate,
            refreshed_at_us: now_us,
        });
        estimate
    }

    /// Take a direct pitch reading between refreshes. The cache value is
    /// updated but its refresh timestamp is left alone.
    fn adopt_pitch(&mut self, geometry: &FaceGeometry, pitch: f32) -> PoseEstimate {
        self.bump_stability();

        let facing = match (geometry.yaw(), geometry.roll()) {
            (Some(_), Some(_)) => self.facing_from(geometry),
            _ => self
                .cache
                .map(|c| c.estimate.facing)
                .unwrap_or_else(|| self.facing_from(geometry)),
        };
        let estimate = PoseEstimate {
            vertical_metric: pitch,
            source: PoseSource::PoseAngle,
            facing,
        };

        if let Some(c) = self.cache.as_mut() {
            c.estimate = estimate;
        }
        estimate
    }

    fn facing_from(&self, geometry: &FaceGeometry) -> bool {
        match (geometry.yaw(), geometry.roll()) {
            (Some(yaw), Some(roll)) => yaw.abs() < self.facing_bound && roll.abs() < self.facing_bound,
            _ => geometry
                .landmarks
                .as_ref()
                .map(|lm| lm.has_both_eyes())
                .unwrap_or(false),
        }
    }

    fn bump_stability(&mut self) {
        self.stability = (self.stability + 1).min(self.max_stable);
    }

    pub fn fast_path_active(&self) -> bool {
        self.stability >= self.max_stable
    }

    pub fn stability(&self) -> u32 {
        self.stability
    }

    /// Drop fast-path confidence. Called by the watchdog on face loss.
    pub fn reset_stability(&mut self) {
        self.stability = 0;
    }

    /// Reset estimator state
    pub fn reset(&mut self) {
        self.stability = 0;
        self.cache = None;
    }
}

/// `(noseY - eyeY) / interOcular`, or `None` when eye or nose landmarks
/// are missing or the result is not finite.
fn landmark_metric(geometry: &FaceGeometry) -> Option<f32> {
    let landmarks = geometry.landmarks.as_ref()?;
    let left = centroid(&landmarks.left_eye)?;
    let right = centroid(&landmarks.right_eye)?;
    let nose = centroid(landmarks.nose_points()?)?;

    let eye_center = left.midpoint(&right);
    let inter_ocular = left.distance(&right).max(INTER_OCULAR_EPSILON);
    let metric = (nose.y - eye_center.y) / inter_ocular;

    metric.is_finite().then_some(metric)
}
