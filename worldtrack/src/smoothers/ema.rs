//! Exponential moving average smoother

use super::{ensure_finite, heading_degrees, SmoothedState, Smoother};
use anyhow::{bail, Result};
use std::collections::HashMap;

/// Smallest time step used for the velocity finite difference (seconds)
const MIN_DT: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
struct EmaTrack {
    x: f64,
    y: f64,
    timestamp: f64,
    speed: f64,
    heading: f64,
}

impl EmaTrack {
    fn estimate(&self) -> SmoothedState {
        SmoothedState {
            x: self.x,
            y: self.y,
            speed: self.speed,
            heading: self.heading,
        }
    }
}

/// EMA smoother: `smoothed = alpha * previous + (1 - alpha) * raw`
///
/// Higher alpha means more inertia. Speed and heading come from the finite
/// difference of consecutive smoothed positions.
#[derive(Debug, Clone)]
pub struct EmaSmoother {
    alpha: f64,
    tracks: HashMap<u32, EmaTrack>,
}

impl EmaSmoother {
    pub fn new(alpha: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&alpha) {
            bail!("EMA alpha must be within [0, 1], got {}", alpha);
        }
        Ok(Self {
            alpha,
            tracks: HashMap::new(),
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[inline]
    fn blend(&self, previous: f64, raw: f64) -> f64 {
        self.alpha * previous + (1.0 - self.alpha) * raw
    }
}

impl Smoother for EmaSmoother {
    fn update(&mut self, track_id: u32, x: f64, y: f64, timestamp: f64) -> Result<SmoothedState> {
        ensure_finite(x, y, timestamp)?;

        let Some(prev) = self.tracks.get(&track_id).copied() else {
            self.tracks.insert(
                track_id,
                EmaTrack {
                    x,
                    y,
                    timestamp,
                    speed: 0.0,
                    heading: 0.0,
                },
            );
            return Ok(SmoothedState::at_rest(x, y));
        };

        if timestamp <= prev.timestamp {
            log::debug!(
                "EMA track {}: ignoring non-increasing timestamp {:.6} (last {:.6})",
                track_id,
                timestamp,
                prev.timestamp
            );
            return Ok(prev.estimate());
        }

        let xs = self.blend(prev.x, x);
        let ys = self.blend(prev.y, y);
        let dt = (timestamp - prev.timestamp).max(MIN_DT);
        let vx = (xs - prev.x) / dt;
        let vy = (ys - prev.y) / dt;

        let track = EmaTrack {
            x: xs,
            y: ys,
            timestamp,
            speed: vx.hypot(vy),
            heading: heading_degrees(vx, vy),
        };
        self.tracks.insert(track_id, track);

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
        "ema"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_alpha_bounds() {
        assert!(EmaSmoother::new(0.0).is_ok());
        assert!(EmaSmoother::new(1.0).is_ok());
        assert!(EmaSmoother::new(-0.1).is_err());
        assert!(EmaSmoother::new(1.5).is_err());
        assert!(EmaSmoother::new(f64::NAN).is_err());
    }

    #[test]
    fn test_blend_and_velocity() {
        let mut ema = EmaSmoother::new(0.6).unwrap();
        ema.update(1, 0.0, 0.0, 0.0).unwrap();

        let state = ema.update(1, 10.0, 0.0, 2.0).unwrap();
        // 0.6 * 0 + 0.4 * 10
        assert_abs_diff_eq!(state.x, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(state.y, 0.0, epsilon = 1e-12);
        // Velocity is taken from the smoothed positions: 4m over 2s
        assert_abs_diff_eq!(state.speed, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(state.heading, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_heading_follows_smoothed_motion() {
        let mut ema = EmaSmoother::new(0.5).unwrap();
        ema.update(3, 0.0, 0.0, 0.0).unwrap();
        let state = ema.update(3, 0.0, -2.0, 1.0).unwrap();
        assert_abs_diff_eq!(state.y, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(state.speed, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(state.heading, 270.0, epsilon = 1e-9);
    }

    #[test]
    fn test_alpha_zero_tracks_raw_input() {
        let mut ema = EmaSmoother::new(0.0).unwrap();
        ema.update(1, 1.0, 1.0, 0.0).unwrap();
        let state = ema.update(1, 2.0, 3.0, 0.5).unwrap();
        assert_eq!((state.x, state.y), (2.0, 3.0));
    }

    #[test]
    fn test_tiny_dt_does_not_blow_up() {
        let mut ema = EmaSmoother::new(0.6).unwrap();
        ema.update(1, 0.0, 0.0, 1.0).unwrap();
        let state = ema.update(1, 1.0, 0.0, 1.0 + 1e-12).unwrap();
        assert!(state.speed.is_finite());
        // dt is floored at MIN_DT
        assert_abs_diff_eq!(state.speed, 0.4 / MIN_DT, epsilon = 1e-3);
    }
}
