//! Face/pose provider boundary.
//!
//! The detection capability itself is external. Anything that can turn a
//! frame into optional [`FaceGeometry`] plugs in here, which keeps the
//! engine testable with synthetic geometry.

use crate::domain::FaceGeometry;
use crate::error::ProviderError;

pub trait FaceProvider {
    type Frame;

    /// `Ok(None)` means no face in this frame. Must return within the
    /// frame-processing budget.
    fn detect(&mut self, frame: &Self::Frame) -> Result<Option<FaceGeometry>, ProviderError>;
}

/// Provider whose frames already carry their geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecomputedProvider;

impl FaceProvider for PrecomputedProvider {
    type Frame = Option<FaceGeometry>;

    fn detect(&mut self, frame: &Self::Frame) -> Result<Option<FaceGeometry>, ProviderError> {
        Ok(frame.clone())
    }
}
