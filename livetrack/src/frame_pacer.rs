//! Bounded-rate cycle pacing
//!
//! The pacer never sleeps for a whole frame period. Long sleeps on the
//! foreground thread starve camera drivers that expect frequent attention,
//! so waiting is done in slices of at most `MAX_SLEEP_SLICE`.

use crate::error::{Result, TrackerError};
use std::time::{Duration, Instant};

/// Longest single sleep the pacer will ever take
pub const MAX_SLEEP_SLICE: Duration = Duration::from_millis(2);

#[derive(Debug, Clone)]
pub struct FramePacer {
    target_fps: f64,
    frame_duration: Duration,
    last_processed: Option<Instant>,
}

impl FramePacer {
    pub fn new(target_fps: f64) -> Result<Self> {
        if !target_fps.is_finite() || target_fps <= 0.0 {
            return Err(TrackerError::config(format!(
                "target_fps must be positive, got {}",
                target_fps
            )));
        }
        Ok(Self {
            target_fps,
            frame_duration: Duration::from_secs_f64(1.0 / target_fps),
            last_processed: None,
        })
    }

    pub fn target_fps(&self) -> f64 {
        self.target_fps
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Decide whether the current cycle should do work.
    ///
    /// The first call always accepts. An accepted cycle becomes the new
    /// reference point; a rejected one changes nothing.
    pub fn should_process(&mut self) -> bool {
        self.should_process_at(Instant::now())
    }

    pub fn should_process_at(&mut self, now: Instant) -> bool {
        match self.last_processed {
            Some(last) if now.saturating_duration_since(last) < self.frame_duration => false,
            _ => {
                self.last_processed = Some(now);
                true
            }
        }
    }

    /// Time left before the next cycle would be accepted
    pub fn time_until_next(&self, now: Instant) -> Duration {
        match self.last_processed {
            Some(last) => (last + self.frame_duration).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Block until the next slot opens, then claim it
    pub fn wait_for_next_slot(&mut self) {
        loop {
            let now = Instant::now();
            let remaining = self.time_until_next(now);
            if remaining.is_zero() {
                self.last_processed = Some(now);
                return;
            }
            std::thread::sleep(remaining.min(MAX_SLEEP_SLICE));
        }
    }

    /// Forget the last accepted cycle; the next call accepts immediately
    pub fn reset(&mut self) {
        self.last_processed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_rate() {
        assert!(FramePacer::new(0.0).is_err());
        assert!(FramePacer::new(-5.0).is_err());
        assert!(FramePacer::new(f64::NAN).is_err());
        assert!(FramePacer::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_ten_fps_window() {
        let mut pacer = FramePacer::new(10.0).unwrap();
        let t0 = Instant::now();

        assert!(pacer.should_process_at(t0));
        assert!(!pacer.should_process_at(t0 + Duration::from_millis(50)));
        assert!(!pacer.should_process_at(t0 + Duration::from_millis(99)));
        // A rejected call does not move the reference point
        assert!(pacer.should_process_at(t0 + Duration::from_millis(100)));
        assert!(!pacer.should_process_at(t0 + Duration::from_millis(150)));
        assert!(pacer.should_process_at(t0 + Duration::from_millis(250)));
    }

    #[test]
    fn test_time_until_next() {
        let mut pacer = FramePacer::new(10.0).unwrap();
        let t0 = Instant::now();
        assert_eq!(pacer.time_until_next(t0), Duration::ZERO);

        pacer.should_process_at(t0);
        assert_eq!(
            pacer.time_until_next(t0 + Duration::from_millis(30)),
            Duration::from_millis(70)
        );
        assert_eq!(
            pacer.time_until_next(t0 + Duration::from_millis(300)),
            Duration::ZERO
        );

        pacer.reset();
        assert!(pacer.should_process_at(t0 + Duration::from_millis(1)));
    }

    #[test]
    fn test_wait_for_next_slot_honours_rate() {
        let mut pacer = FramePacer::new(50.0).unwrap();
        let start = Instant::now();
        pacer.wait_for_next_slot();
        assert!(start.elapsed() < Duration::from_millis(5));

        pacer.wait_for_next_slot();
        pacer.wait_for_next_slot();
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
