//! Pixel to ground-plane projection with identity fallback

use crate::homography::Homography;
use anyhow::Result;
use std::path::Path;

/// Maps footprints to world coordinates.
///
/// Without a homography the projector passes pixels through unchanged, so
/// downstream values are in pixels rather than meters.
#[derive(Debug, Clone, Default)]
pub struct Projector {
    homography: Option<Homography>,
}

impl Projector {
    pub fn new(homography: Option<Homography>) -> Self {
        Self { homography }
    }

    /// Pixel passthrough projector
    pub fn identity() -> Self {
        Self { homography: None }
    }

    /// Load the homography from disk if enabled.
    ///
    /// A missing or unreadable file only degrades the projector to pixel
    /// passthrough; it is reported once here and never again per frame.
    pub fn from_file(path: impl AsRef<Path>, enabled: bool) -> Self {
        let path = path.as_ref();
        if !enabled {
            log::info!("Homography disabled; reporting positions in pixels");
            return Self::identity();
        }

        match Homography::load(path) {
            Ok(homography) => {
                log::info!("Loaded homography from {}", path.display());
                Self::new(Some(homography))
            }
            Err(e) => {
                log::warn!(
                    "Could not load homography from {}: {:#}; homography disabled",
                    path.display(),
                    e
                );
                Self::identity()
            }
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.homography.is_some()
    }

    pub fn homography(&self) -> Option<&Homography> {
        self.homography.as_ref()
    }

    /// Map a pixel point to the ground plane
    pub fn to_world(&self, x_px: f64, y_px: f64) -> Result<(f64, f64)> {
        match &self.homography {
            Some(h) => h.project(x_px, y_px),
            None => Ok((x_px, y_px)),
        }
    }
}
