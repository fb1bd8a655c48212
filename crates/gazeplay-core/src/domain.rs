//! Per-frame face geometry and session clock helpers.
//!
//! Timestamps throughout the crate are `i64` microseconds on a monotonic
//! session clock. Geometry is produced once per admitted frame by a
//! [`FaceProvider`](crate::provider::FaceProvider) and is not retained past
//! one estimation cycle.

use serde::{Deserialize, Serialize};

/// Elapsed microseconds between two timestamps.
///
/// Returns 0 instead of wrapping when the clock appears to run backwards.
#[inline]
pub fn dt_us(now_us: i64, last_us: i64) -> u64 {
    if now_us >= last_us {
        (now_us - last_us) as u64
    } else {
        0
    }
}

/// Elapsed seconds between two timestamps (see [`dt_us`]).
#[inline]
pub fn dt_sec(now_us: i64, last_us: i64) -> f32 {
    (dt_us(now_us, last_us) as f32) / 1_000_000.0
}

/// Convert a configured duration in seconds to whole microseconds.
///
/// Negative and non-finite inputs clamp to 0.
pub fn sec_to_us(sec: f32) -> u64 {
    if !sec.is_finite() || sec <= 0.0 {
        return 0;
    }
    (sec as f64 * 1_000_000.0).round() as u64
}

/// 2-D image-space point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn midpoint(&self, other: &Point2) -> Point2 {
        Point2::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Mean of an ordered point sequence. `None` for an empty sequence.
pub fn centroid(points: &[Point2]) -> Option<Point2> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f32;
    let (sx, sy) = points
        .iter()
        .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point2::new(sx / n, sy / n))
}

/// Face bounding rectangle in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Direct head pose angles in radians. Each component is optional because
/// detection backends report them independently.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPose {
    pub pitch: Option<f32>,
    pub yaw: Option<f32>,
    pub roll: Option<f32>,
}

impl HeadPose {
    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self {
            pitch: Some(pitch),
            yaw: Some(yaw),
            roll: Some(roll),
        }
    }
}

/// Landmark point sequences for the regions the estimator needs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub left_eye: Vec<Point2>,
    pub right_eye: Vec<Point2>,
    /// Nose centre line. Preferred over `nose_outline` when present.
    #[serde(default)]
    pub nose: Option<Vec<Point2>>,
    /// Outer nose contour, used when `nose` is missing.
    #[serde(default)]
    pub nose_outline: Option<Vec<Point2>>,
}

impl FaceLandmarks {
    pub fn has_both_eyes(&self) -> bool {
        !self.left_eye.is_empty() && !self.right_eye.is_empty()
    }

    /// Nose points, falling back to the outline sequence.
    pub fn nose_points(&self) -> Option<&[Point2]> {
        self.nose
            .as_deref()
            .filter(|pts| !pts.is_empty())
            .or_else(|| self.nose_outline.as_deref().filter(|pts| !pts.is_empty()))
    }
}

/// Geometry for one detected face.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceGeometry {
    pub rect: FaceRect,
    #[serde(default)]
    pub pose: Option<HeadPose>,
    #[serde(default)]
    pub landmarks: Option<FaceLandmarks>,
}

impl FaceGeometry {
    /// Direct pitch measurement, ignoring non-finite values.
    pub fn pitch(&self) -> Option<f32> {
        self.pose.and_then(|p| p.pitch).filter(|v| v.is_finite())
    }

    pub fn yaw(&self) -> Option<f32> {
        self.pose.and_then(|p| p.yaw).filter(|v| v.is_finite())
    }

    pub fn roll(&self) -> Option<f32> {
        self.pose.and_then(|p| p.roll).filter(|v| v.is_finite())
    }

    /// True when the geometry carries something attention can be judged
    /// from: a direct pitch or both eye sequences.
    pub fn is_usable(&self) -> bool {
        self.pitch().is_some()
            || self
                .landmarks
                .as_ref()
                .map(FaceLandmarks::has_both_eyes)
                .unwrap_or(false)
    }
}
