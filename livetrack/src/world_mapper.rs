//! Tracked boxes to smoothed world positions
//!
//! Per observation: footprint -> projector -> smoother -> `WorldPosition`.
//! A failure for one observation (malformed box, point on the horizon,
//! rejected measurement) is logged and skips only that observation.

use crate::types::{TrackObservation, WorldPosition};
use anyhow::Result;
use std::collections::HashMap;
use worldtrack::{Projector, Smoother};

pub struct WorldPositionMapper {
    projector: Projector,
    smoother: Box<dyn Smoother>,
    max_missed_cycles: u32,
    /// Cycle index at which each live track id was last present
    last_seen: HashMap<u32, u64>,
    cycle: u64,
}

impl WorldPositionMapper {
    pub fn new(projector: Projector, smoother: Box<dyn Smoother>, max_missed_cycles: u32) -> Self {
        Self {
            projector,
            smoother,
            max_missed_cycles,
            last_seen: HashMap::new(),
            cycle: 0,
        }
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn smoother(&self) -> &dyn Smoother {
        self.smoother.as_ref()
    }

    /// Number of tracks with live smoother state
    pub fn track_count(&self) -> usize {
        self.smoother.len()
    }

    /// Map one cycle of tracker output taken at `timestamp` (seconds, monotonic)
    pub fn map_tracks(&mut self, tracks: &[TrackObservation], timestamp: f64) -> Vec<WorldPosition> {
        self.cycle += 1;
        let mut positions = Vec::with_capacity(tracks.len());

        for (i, observation) in tracks.iter().enumerate() {
            self.last_seen.insert(observation.track_id, self.cycle);

            match self.map_one(observation, timestamp) {
                Ok(position) => positions.push(position),
                Err(e) => log::warn!(
                    "Skipping track {} (observation {}): {:#}",
                    observation.track_id,
                    i,
                    e
                ),
            }
        }

        self.evict_stale();
        positions
    }

    fn map_one(&mut self, observation: &TrackObservation, timestamp: f64) -> Result<WorldPosition> {
        observation.bbox.validate()?;
        let (foot_x, foot_y) = observation.bbox.footprint();
        let (x_world, y_world) = self.projector.to_world(foot_x, foot_y)?;
        let state = self
            .smoother
            .update(observation.track_id, x_world, y_world, timestamp)?;

        Ok(WorldPosition {
            id: observation.track_id,
            x: state.x,
            y: state.y,
            heading: state.heading,
            speed: state.speed,
            confidence: observation.confidence,
        })
    }

    /// Drop state of tracks absent for more than `max_missed_cycles` cycles
    fn evict_stale(&mut self) {
        let cycle = self.cycle;
        let max_missed = u64::from(self.max_missed_cycles);
        let smoother = &mut self.smoother;

        self.last_seen.retain(|&track_id, &mut seen| {
            let keep = cycle - seen <= max_missed;
            if !keep {
                smoother.remove(track_id);
                log::debug!(
                    "Evicted track {} after {} missed cycles",
                    track_id,
                    cycle - seen
                );
            }
            keep
        });
    }

    /// Forget every track
    pub fn reset(&mut self) {
        self.smoother.clear();
        self.last_seen.clear();
    }
}
