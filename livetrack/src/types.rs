//! Type definitions for detections, tracks and world positions

use serde::{Deserialize, Serialize};
use worldtrack::Bbox;

/// COCO class id of "person", the only class the pipeline tracks by default
pub const PERSON_CLASS_ID: u32 = 0;

/// Single detector output in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Bounding box (pixels, top-left origin)
    pub bbox: Bbox,
    /// Detection confidence score (0-1)
    pub confidence: f32,
    /// Detector class id
    pub class_id: u32,
}

impl Detection {
    pub fn new(bbox: Bbox, confidence: f32, class_id: u32) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
        }
    }
}

/// One tracked person in one frame, as emitted by the identity tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackObservation {
    /// Stable identity assigned by the tracker
    pub track_id: u32,
    /// Bounding box (pixels)
    pub bbox: Bbox,
    /// Confidence carried over from the matched detection
    pub confidence: f32,
}

impl TrackObservation {
    pub fn new(track_id: u32, bbox: Bbox, confidence: f32) -> Self {
        Self {
            track_id,
            bbox,
            confidence,
        }
    }
}

/// Smoothed ground-plane position of one track for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPosition {
    pub id: u32,
    /// Meters when a homography is loaded, pixels otherwise
    pub x: f64,
    pub y: f64,
    /// Direction of travel in degrees [0, 360)
    pub heading: f64,
    /// Speed in world units per second
    pub speed: f64,
    pub confidence: f32,
}
