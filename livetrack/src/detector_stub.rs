// Stub detector and tracker so the pipeline runs end to end without a model.
// Real deployments plug their own `Detector` / `IdentityTracker` in.

use crate::detector_trait::{Detector, IdentityTracker};
use crate::types::{Detection, TrackObservation};
use image::RgbImage;

/// Detector that never finds anything
#[derive(Debug, Default)]
pub struct StubDetector {
    frames_seen: u64,
}

impl StubDetector {
    pub fn new() -> Self {
        log::info!("Creating stub detector (no model loaded, no detections will be produced)");
        Self { frames_seen: 0 }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }
}

impl Detector for StubDetector {
    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<Detection>, String> {
        if self.frames_seen == 0 {
            log::warn!("Stub detector in use - no actual detection performed");
        }
        self.frames_seen += 1;
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Tracker that numbers detections by their order in the frame (1, 2, ...)
///
/// Identities are only stable while the detector reports people in a stable
/// order, which holds for scripted inputs and single-person scenes.
#[derive(Debug, Default)]
pub struct SequentialTracker;

impl SequentialTracker {
    pub fn new() -> Self {
        Self
    }
}

impl IdentityTracker for SequentialTracker {
    fn track(&mut self, detections: &[Detection]) -> Result<Vec<TrackObservation>, String> {
        Ok(detections
            .iter()
            .enumerate()
            .map(|(i, det)| TrackObservation::new(i as u32 + 1, det.bbox, det.confidence))
            .collect())
    }

    fn name(&self) -> &str {
        "sequential"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worldtrack::Bbox;

    #[test]
    fn test_stub_detector_is_empty() {
        let mut detector = StubDetector::new();
        let frame = RgbImage::new(16, 16);
        assert!(detector.detect(&frame).unwrap().is_empty());
        assert!(detector.detect(&frame).unwrap().is_empty());
        assert_eq!(detector.frames_seen(), 2);
    }

    #[test]
    fn test_sequential_ids() {
        let mut tracker = SequentialTracker::new();
        let detections = vec![
            Detection::new(Bbox::new(0.0, 0.0, 1.0, 1.0), 0.9, 0),
            Detection::new(Bbox::new(5.0, 5.0, 6.0, 6.0), 0.6, 0),
        ];
        let tracks = tracker.track(&detections).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!((tracks[0].track_id, tracks[0].confidence), (1, 0.9));
        assert_eq!((tracks[1].track_id, tracks[1].confidence), (2, 0.6));
        assert_eq!(tracks[1].bbox, detections[1].bbox);
    }
}
