//! Live Position Tracking Library
//!
//! Turns a camera or video stream into a stream of smoothed ground-plane
//! positions of the people in view, broadcast over UDP at a bounded rate.
//!
//! Building blocks:
//! - `FrameSource`: threaded acquisition keeping only the latest frame
//! - `FramePacer`: bounded-rate cycle decisions with short waits only
//! - `WorldPositionMapper`: footprint, homography projection and smoothing
//!   (projection and smoothers live in the `worldtrack` crate)
//! - `LiveTracker`: the orchestrating cycle, with UDP output and JSONL log
//!
//! The object detector and the identity tracker are plugged in through the
//! `Detector` and `IdentityTracker` traits.

pub mod config;
pub mod detector_stub;
pub mod detector_trait;
pub mod error;
pub mod fps_tracker;
pub mod frame_pacer;
pub mod frame_source;
pub mod live_tracker;
pub mod packet;
pub mod sequence;
pub mod track_log;
pub mod transport;
pub mod types;
pub mod world_mapper;

#[cfg(feature = "opencv")]
pub mod video;

pub use config::{AppSettings, SmootherKind, VideoSource};
pub use detector_stub::{SequentialTracker, StubDetector};
pub use detector_trait::{ClassFilter, Detector, IdentityTracker};
pub use error::{Result, TrackerError};
pub use frame_pacer::FramePacer;
pub use frame_source::{Frame, FrameBackend, FrameSource};
pub use live_tracker::{CycleStats, LiveTracker, StopHandle};
pub use types::{Detection, TrackObservation, WorldPosition};
pub use world_mapper::WorldPositionMapper;

/// Initialize the tracking library
/// This function should be called once before starting a tracker
pub fn init() -> Result<()> {
    log::info!("Live position tracking library v{} initialized", version());
    Ok(())
}

/// Get library version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
