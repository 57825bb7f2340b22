//! Ground-plane state estimation for tracked people
//!
//! This crate turns per-track pixel footprints into smoothed world positions:
//! a planar homography maps the footprint onto the floor, and a per-track
//! smoother estimates position, speed and heading over time.
//!
//! # Unified Interface
//!
//! All smoothing strategies implement the `Smoother` trait:
//!
//! ```rust,ignore
//! use worldtrack::{EmaSmoother, KalmanSmoother, KalmanSmootherParams, Projector, Smoother};
//!
//! let projector = Projector::from_file("homography/H.npy", true);
//! let mut smoother: Box<dyn Smoother> = Box::new(KalmanSmoother::new(KalmanSmootherParams::default()));
//!
//! let (x, y) = projector.to_world(640.0, 700.0)?;
//! let state = smoother.update(1, x, y, 0.033)?;
//! ```

pub mod bbox;
pub mod homography;
pub mod kalman;
pub mod projection;
pub mod smoothers;

pub use bbox::Bbox;
pub use homography::Homography;
pub use kalman::{ConstantVelocityFilter, KalmanNoise};
pub use projection::Projector;
pub use smoothers::{
    heading_degrees, EmaSmoother, KalmanSmoother, KalmanSmootherParams, SmoothedState, Smoother,
};
