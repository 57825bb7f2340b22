//! Per-track smoothing strategies
//!
//! Two interchangeable strategies share the `Smoother` interface:
//! - EmaSmoother: exponential moving average with finite-difference velocity
//! - KalmanSmoother: constant-velocity Kalman filter with heading hold
//!
//! Each smoother owns one independent state per track id. State is created on
//! the first observation of an id and lives until `remove` is called.

use anyhow::{bail, Result};

mod ema;
mod kalman_heading;

pub use ema::EmaSmoother;
pub use kalman_heading::{KalmanSmoother, KalmanSmootherParams};

/// Smoothed ground-plane estimate for one track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedState {
    /// Smoothed position (world units, meters when calibrated)
    pub x: f64,
    pub y: f64,
    /// Magnitude of the velocity estimate (world units per second)
    pub speed: f64,
    /// Direction of travel in degrees, always within [0, 360)
    pub heading: f64,
}

impl SmoothedState {
    /// State reported for a track seen for the first time
    pub fn at_rest(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            speed: 0.0,
            heading: 0.0,
        }
    }
}

/// Common interface for per-track smoothers
///
/// Callers must feed non-decreasing timestamps per track id. A call whose
/// timestamp is not strictly newer than the stored one leaves the state
/// untouched and repeats the last reported estimate.
pub trait Smoother: Send {
    /// Feed one raw world-space measurement for `track_id` taken at
    /// `timestamp` (seconds on a monotonic clock)
    fn update(&mut self, track_id: u32, x: f64, y: f64, timestamp: f64) -> Result<SmoothedState>;

    /// Drop the state of a track that is no longer observed
    fn remove(&mut self, track_id: u32) -> bool;

    /// Number of tracks with live state
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all track state
    fn clear(&mut self);

    /// Get the strategy name (for logging/debugging)
    fn name(&self) -> &str;
}

/// Direction of a velocity vector in degrees, normalized to [0, 360)
pub fn heading_degrees(vx: f64, vy: f64) -> f64 {
    let heading = (vy.atan2(vx).to_degrees() + 360.0).rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative angles
    if heading >= 360.0 {
        0.0
    } else {
        heading
    }
}

pub(crate) fn ensure_finite(x: f64, y: f64, timestamp: f64) -> Result<()> {
    if !x.is_finite() || !y.is_finite() || !timestamp.is_finite() {
        bail!(
            "non-finite measurement (x={}, y={}, t={})",
            x,
            y,
            timestamp
        );
    }
    Ok(())
}
