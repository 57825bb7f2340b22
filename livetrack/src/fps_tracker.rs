//! Cycle rate statistics

use std::collections::VecDeque;
use std::time::Instant;

/// Samples kept for average/min/max
pub const DEFAULT_HISTORY: usize = 300;

/// Tracks instantaneous and windowed processing rate
#[derive(Debug, Clone)]
pub struct FpsTracker {
    last: Option<Instant>,
    history: VecDeque<f64>,
    capacity: usize,
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

impl FpsTracker {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            last: None,
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Call once per cycle. Returns the instantaneous rate, 0 on the first call.
    pub fn update(&mut self) -> f64 {
        self.update_at(Instant::now())
    }

    pub fn update_at(&mut self, now: Instant) -> f64 {
        let Some(last) = self.last.replace(now) else {
            return 0.0;
        };

        let dt = now.saturating_duration_since(last).as_secs_f64();
        if dt <= 0.0 {
            return 0.0;
        }

        let fps = 1.0 / dt;
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(fps);
        fps
    }

    pub fn current(&self) -> f64 {
        self.history.back().copied().unwrap_or(0.0)
    }

    pub fn average(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().sum::<f64>() / self.history.len() as f64
    }

    pub fn minimum(&self) -> f64 {
        self.history.iter().copied().reduce(f64::min).unwrap_or(0.0)
    }

    pub fn maximum(&self) -> f64 {
        self.history.iter().copied().reduce(f64::max).unwrap_or(0.0)
    }

    pub fn samples(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::time::Duration;

    #[test]
    fn test_statistics() {
        let mut fps = FpsTracker::default();
        assert_eq!(fps.current(), 0.0);
        assert_eq!(fps.average(), 0.0);

        let t0 = Instant::now();
        assert_eq!(fps.update_at(t0), 0.0);
        assert_abs_diff_eq!(fps.update_at(t0 + Duration::from_millis(100)), 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fps.update_at(t0 + Duration::from_millis(150)), 20.0, epsilon = 1e-9);
        // Same instant twice is not a sample
        assert_eq!(fps.update_at(t0 + Duration::from_millis(150)), 0.0);

        assert_eq!(fps.samples(), 2);
        assert_abs_diff_eq!(fps.current(), 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fps.average(), 15.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fps.minimum(), 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fps.maximum(), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut fps = FpsTracker::new(3);
        let t0 = Instant::now();
        for i in 0..10u64 {
            fps.update_at(t0 + Duration::from_millis(i * 10));
        }
        assert_eq!(fps.samples(), 3);
    }
}
