/// Detector and identity-tracker boundaries
///
/// The pipeline works with any detector or tracker as long as it implements
/// these interfaces. Errors cross the boundary as plain strings; the
/// orchestrator logs them and skips the cycle.
use crate::types::{Detection, TrackObservation};
use image::RgbImage;

/// Common interface for object detectors
pub trait Detector: Send {
    /// Detect objects in a single frame (pixel coordinates)
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, String>;

    /// Get the detector name (for logging/debugging)
    fn name(&self) -> &str;
}

/// Assigns stable identities to detections across frames
pub trait IdentityTracker: Send {
    /// Feed one frame's detections, get the currently tracked boxes back
    fn track(&mut self, detections: &[Detection]) -> Result<Vec<TrackObservation>, String>;

    /// Get the tracker name (for logging/debugging)
    fn name(&self) -> &str;
}

/// Keeps detections of one class above a confidence floor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassFilter {
    pub class_id: u32,
    pub min_confidence: f32,
}

impl ClassFilter {
    pub fn new(class_id: u32, min_confidence: f32) -> Self {
        Self {
            class_id,
            min_confidence,
        }
    }

    pub fn accepts(&self, detection: &Detection) -> bool {
        detection.class_id == self.class_id && detection.confidence >= self.min_confidence
    }

    pub fn apply(&self, mut detections: Vec<Detection>) -> Vec<Detection> {
        detections.retain(|det| self.accepts(det));
        detections
    }
}
