//! Constant-velocity Kalman smoother with heading stabilization

use super::{ensure_finite, heading_degrees, SmoothedState, Smoother};
use crate::kalman::{ConstantVelocityFilter, KalmanNoise};
use anyhow::Result;
use std::collections::HashMap;

/// Configuration for the Kalman smoother
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanSmootherParams {
    /// Filter noise parameters
    pub noise: KalmanNoise,
    /// Below this speed (world units/s) the track counts as standing still and
    /// keeps its last heading
    pub heading_speed_threshold: f64,
}

impl Default for KalmanSmootherParams {
    fn default() -> Self {
        Self {
            noise: KalmanNoise::default(),
            heading_speed_threshold: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct KalmanTrack {
    filter: ConstantVelocityFilter,
    timestamp: f64,
    /// Last stabilized heading
    heading: f64,
}

impl KalmanTrack {
    fn estimate(&self) -> SmoothedState {
        let (x, y) = self.filter.position();
        SmoothedState {
            x,
            y,
            speed: self.filter.speed(),
            heading: self.heading,
        }
    }
}

/// Kalman smoother: one constant-velocity filter per track id
///
/// Near-zero velocity vectors produce headings that flip around at random, so
/// the heading is only recomputed while the estimated speed is at or above
/// `heading_speed_threshold`.
#[derive(Debug, Clone)]
pub struct KalmanSmoother {
    params: KalmanSmootherParams,
    tracks: HashMap<u32, KalmanTrack>,
}

impl KalmanSmoother {
    pub fn new(params: KalmanSmootherParams) -> Self {
        Self {
            params,
            tracks: HashMap::new(),
        }
    }

    pub fn params(&self) -> &KalmanSmootherParams {
        &self.params
    }

    /// Velocity estimate of a track, if it has state
    pub fn velocity(&self, track_id: u32) -> Option<(f64, f64)> {
        self.tracks.get(&track_id).map(|t| t.filter.velocity())
    }
}

impl Smoother for KalmanSmoother {
    fn update(&mut self, track_id: u32, x: f64, y: f64, timestamp: f64) -> Result<SmoothedState> {
        ensure_finite(x, y, timestamp)?;

        let Some(track) = self.tracks.get_mut(&track_id) else {
            self.tracks.insert(
                track_id,
                KalmanTrack {
                    filter: ConstantVelocityFilter::new(x, y, &self.params.noise),
                    timestamp,
                    heading: 0.0,
                },
            );
            return Ok(SmoothedState::at_rest(x, y));
        };

        let dt = timestamp - track.timestamp;
        if dt <= 0.0 {
            log::debug!(
                "Kalman track {}: skipping update with dt={:.6}s",
                track_id,
                dt
            );
            return Ok(track.estimate());
        }

        // Work on a copy so a numerical failure leaves the track untouched
        let mut filter = track.filter;
        filter.predict(dt);
        filter.update(x, y)?;

        track.filter = filter;
        track.timestamp = timestamp;

        if filter.speed() >= self.params.heading_speed_threshold {
            let (vx, vy) = filter.velocity();
            track.heading = heading_degrees(vx, vy);
        }

        Ok(track.estimate())
    }

    fn remove(&mut self, track_id: u32) -> bool {
        self.tracks.remove(&track_id).is_some()
    }

    fn len(&self) -> usize {
        self.tracks.len()
    }

    fn clear(&mut self) {
        self.tracks.clear();
    }

    fn name(&self) -> &str {
        "kalman"
    }
}
