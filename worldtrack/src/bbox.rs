//! Pixel bounding boxes and their ground-contact footprint

use anyhow::{bail, Result};
use std::fmt;

/// Axis-aligned bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl Bbox {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Convert to bounds array [xmin, ymin, xmax, ymax]
    pub fn to_bounds(&self) -> [f32; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    /// Point where the person touches the ground: horizontal midpoint of the
    /// bottom edge.
    pub fn footprint(&self) -> (f64, f64) {
        (
            (self.xmin as f64 + self.xmax as f64) / 2.0,
            self.ymax as f64,
        )
    }

    /// Reject boxes the detector should never have produced.
    pub fn validate(&self) -> Result<()> {
        let bounds = self.to_bounds();
        if bounds.iter().any(|v| !v.is_finite()) {
            bail!("bounding box has non-finite coordinates: {}", self);
        }
        if self.xmax < self.xmin || self.ymax < self.ymin {
            bail!("bounding box has inverted corners: {}", self);
        }
        Ok(())
    }
}

impl fmt::Display for Bbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bbox({:.1}, {:.1}, {:.1}, {:.1})",
            self.xmin, self.ymin, self.xmax, self.ymax
        )
    }
}
