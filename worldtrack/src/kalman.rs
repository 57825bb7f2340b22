//! Constant-velocity Kalman filter on the ground plane

use anyhow::{anyhow, Result};
use nalgebra::{Matrix2, Matrix2x4, Matrix4, Vector2, Vector4};

/// Noise parameters for the constant-velocity model.
///
/// Process noise terms are rates (variance per second) and get scaled by the
/// elapsed time of every prediction step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanNoise {
    /// Process noise for position (m²/s) - kept near zero, position follows velocity
    pub process_noise_pos: f64,
    /// Process noise for velocity ((m/s)²/s) - walking people accelerate freely
    pub process_noise_vel: f64,
    /// Measurement noise (m²) - footprint jitter after projection
    pub measurement_noise: f64,
    /// Initial position variance (m²)
    pub initial_pos_variance: f64,
    /// Initial velocity variance ((m/s)²) - velocity is unknown at birth
    pub initial_vel_variance: f64,
}

impl Default for KalmanNoise {
    fn default() -> Self {
        Self {
            process_noise_pos: 1e-4,
            process_noise_vel: 0.5,
            measurement_noise: 0.05,
            initial_pos_variance: 0.05,
            initial_vel_variance: 10.0,
        }
    }
}

/// Kalman filter for a single point moving with constant velocity
/// State: [x, y, vx, vy], measurement: [x, y]
#[derive(Debug, Clone, Copy)]
pub struct ConstantVelocityFilter {
    /// State vector: [x, y, vx, vy]
    state: Vector4<f64>,
    /// State covariance matrix (uncertainty)
    covariance: Matrix4<f64>,
    /// Process noise rates, diagonal of Q per second
    process_noise: Vector4<f64>,
    /// Measurement noise covariance
    measurement_noise: Matrix2<f64>,
}

impl ConstantVelocityFilter {
    /// Create new filter at rest at the first measured position
    pub fn new(x: f64, y: f64, noise: &KalmanNoise) -> Self {
        let covariance = Matrix4::from_diagonal(&Vector4::new(
            noise.initial_pos_variance,
            noise.initial_pos_variance,
            noise.initial_vel_variance,
            noise.initial_vel_variance,
        ));

        Self {
            state: Vector4::new(x, y, 0.0, 0.0),
            covariance,
            process_noise: Vector4::new(
                noise.process_noise_pos,
                noise.process_noise_pos,
                noise.process_noise_vel,
                noise.process_noise_vel,
            ),
            measurement_noise: Matrix2::identity() * noise.measurement_noise,
        }
    }

    /// Predict next state based on constant velocity model
    pub fn predict(&mut self, dt: f64) {
        // x' = x + vx * dt
        // y' = y + vy * dt
        let mut f = Matrix4::identity();
        f[(0, 2)] = dt;
        f[(1, 3)] = dt;

        let q = Matrix4::from_diagonal(&(self.process_noise * dt));

        self.state = f * self.state;

        // P' = F * P * F^T + Q
        self.covariance = f * self.covariance * f.transpose() + q;
    }

    /// Correct the predicted state with a measured position
    pub fn update(&mut self, x: f64, y: f64) -> Result<()> {
        // We observe position, not velocity
        let h = Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0,
        );

        // Innovation (measurement residual)
        let innovation = Vector2::new(x, y) - h * self.state;

        // Innovation covariance: S = H * P * H^T + R
        let innovation_covariance = h * self.covariance * h.transpose() + self.measurement_noise;

        // Kalman gain: K = P * H^T * S^-1
        let s_inv = innovation_covariance
            .try_inverse()
            .ok_or_else(|| anyhow!("Failed to invert innovation covariance matrix"))?;
        let kalman_gain = self.covariance * h.transpose() * s_inv;

        let state = self.state + kalman_gain * innovation;
        let covariance = (Matrix4::identity() - kalman_gain * h) * self.covariance;

        if state.iter().any(|v| !v.is_finite()) {
            return Err(anyhow!("Kalman update produced a non-finite state"));
        }

        self.state = state;
        self.covariance = covariance;
        Ok(())
    }

    pub fn position(&self) -> (f64, f64) {
        (self.state[0], self.state[1])
    }

    pub fn velocity(&self) -> (f64, f64) {
        (self.state[2], self.state[3])
    }

    pub fn speed(&self) -> f64 {
        self.state[2].hypot(self.state[3])
    }

    /// Get current state
    pub fn state(&self) -> &Vector4<f64> {
        &self.state
    }

    /// Get current covariance
    pub fn covariance(&self) -> &Matrix4<f64> {
        &self.covariance
    }
}
