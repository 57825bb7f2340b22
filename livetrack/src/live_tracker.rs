//! Live tracker orchestration
//!
//! Runs the foreground cycle:
//! pace -> latest frame -> detect -> keep people -> track -> world positions
//! -> UDP packet -> optional JSONL line -> statistics.
//!
//! Termination is only checked at cycle boundaries. A running detector or
//! tracker call is never interrupted.

use crate::config::AppSettings;
use crate::detector_trait::{ClassFilter, Detector, IdentityTracker};
use crate::error::{Result, TrackerError};
use crate::fps_tracker::FpsTracker;
use crate::frame_pacer::FramePacer;
use crate::frame_source::{Frame, FrameSource};
use crate::packet::{format_for_receiver, format_live_packet, timestamp_string};
use crate::track_log::TrackLog;
use crate::transport::UdpSender;
use crate::types::WorldPosition;
use crate::world_mapper::WorldPositionMapper;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pause between pacer checks when a cycle is skipped
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Cycles between periodic statistics log lines
const STATS_INTERVAL: u64 = 100;

/// Requests termination of a running `LiveTracker` from another thread
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Counters for one tracker run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleStats {
    /// Cycles that completed detection, tracking and mapping
    pub cycles: u64,
    /// Cycles dropped because the detector or tracker failed
    pub skipped_cycles: u64,
    pub send_failures: u64,
    pub positions_sent: u64,
    /// Frame number of the last processed frame
    pub last_frame_number: u64,
}

pub struct LiveTracker<D: Detector, T: IdentityTracker> {
    source: FrameSource,
    detector: D,
    tracker: T,
    class_filter: ClassFilter,
    mapper: WorldPositionMapper,
    pacer: FramePacer,
    sender: UdpSender,
    track_log: Option<TrackLog>,
    fps: FpsTracker,
    stop_flag: Arc<AtomicBool>,
    stats: CycleStats,
    spin_up_attempts: u32,
    spin_up_interval: Duration,
    running: bool,
}

impl<D: Detector, T: IdentityTracker> LiveTracker<D, T> {
    /// Build a tracker reading from the source named in the settings
    pub fn new(settings: &AppSettings, detector: D, tracker: T) -> Result<Self> {
        let source = FrameSource::open(&settings.video)?;
        Self::with_source(settings, source, detector, tracker)
    }

    /// Build a tracker around an already opened frame source
    pub fn with_source(
        settings: &AppSettings,
        source: FrameSource,
        detector: D,
        tracker: T,
    ) -> Result<Self> {
        settings.validate()?;

        let mapper = WorldPositionMapper::new(
            settings.build_projector(),
            settings.build_smoother()?,
            settings.tracking.max_missed_cycles,
        );
        let track_log = if settings.save_jsonl {
            Some(TrackLog::create(&settings.jsonl_path)?)
        } else {
            None
        };

        log::info!(
            "Live tracker: source={}, detector={}, tracker={}, target {} fps",
            source.name(),
            detector.name(),
            tracker.name(),
            settings.video.target_fps
        );

        Ok(Self {
            source,
            detector,
            tracker,
            class_filter: ClassFilter::new(
                settings.detector.person_class_id,
                settings.detector.confidence_threshold,
            ),
            mapper,
            pacer: FramePacer::new(settings.video.target_fps)?,
            sender: UdpSender::from_settings(&settings.network)?,
            track_log,
            fps: FpsTracker::default(),
            stop_flag: Arc::new(AtomicBool::new(false)),
            stats: CycleStats::default(),
            spin_up_attempts: 5,
            spin_up_interval: Duration::from_secs(1),
            running: false,
        })
    }

    /// Override how long `start()` waits for the first frame
    pub fn with_spin_up(mut self, attempts: u32, interval: Duration) -> Self {
        self.spin_up_attempts = attempts.max(1);
        self.spin_up_interval = interval;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop_flag),
        }
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn fps(&self) -> &FpsTracker {
        &self.fps
    }

    /// Start acquisition and run cycles until stopped or the source ends.
    ///
    /// Fails if the source does not deliver a first frame within the
    /// spin-up window. The source is stopped on every exit path.
    pub fn start(&mut self) -> Result<CycleStats> {
        if self.running {
            log::warn!("LiveTracker::start called while already running");
            return Ok(self.stats.clone());
        }

        log::info!("Starting tracker, sending to {}", self.sender.target());
        if let Err(e) = self.source.start() {
            self.cleanup();
            return Err(e);
        }
        if let Err(e) = self.wait_for_first_frame() {
            self.cleanup();
            return Err(e);
        }

        self.running = true;
        self.run_loop();
        self.cleanup();
        self.running = false;
        Ok(self.stats.clone())
    }

    fn wait_for_first_frame(&self) -> Result<()> {
        for attempt in 0..self.spin_up_attempts {
            if self.source.is_alive() {
                log::info!("Source is providing frames");
                return Ok(());
            }
            log::debug!(
                "Waiting for first frame ({}/{})",
                attempt + 1,
                self.spin_up_attempts
            );
            std::thread::sleep(self.spin_up_interval);
        }
        if self.source.is_alive() {
            return Ok(());
        }
        Err(TrackerError::SourceNotReady(
            self.spin_up_interval * self.spin_up_attempts,
        ))
    }

    fn run_loop(&mut self) {
        let started = Instant::now();
        self.fps.update();

        while !self.stop_flag.load(Ordering::SeqCst) {
            if !self.source.is_alive() {
                log::info!("Frame source ended; leaving the cycle loop");
                break;
            }
            if !self.pacer.should_process() {
                std::thread::sleep(IDLE_SLEEP);
                continue;
            }
            let Some(frame) = self.source.read() else {
                continue;
            };

            let timestamp = started.elapsed().as_secs_f64();
            if self.process_frame(&frame, timestamp).is_none() {
                continue;
            }

            self.fps.update();
            if self.stats.cycles % STATS_INTERVAL == 0 {
                log::info!(
                    "Cycle {}: frame {}, {} tracks, {:.1} fps (avg {:.1}, min {:.1}, max {:.1}), {} skipped, {} send failures",
                    self.stats.cycles,
                    self.stats.last_frame_number,
                    self.mapper.track_count(),
                    self.fps.current(),
                    self.fps.average(),
                    self.fps.minimum(),
                    self.fps.maximum(),
                    self.stats.skipped_cycles,
                    self.stats.send_failures
                );
            }
        }
    }

    /// Run one cycle on `frame`. Returns `None` when the cycle was skipped.
    pub fn process_frame(&mut self, frame: &Frame, timestamp: f64) -> Option<Vec<WorldPosition>> {
        let detections = match self.detector.detect(&frame.image) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("Detection failed on frame {}: {}", frame.frame_number, e);
                self.stats.skipped_cycles += 1;
                return None;
            }
        };
        let people = self.class_filter.apply(detections);

        let tracks = match self.tracker.track(&people) {
            Ok(tracks) => tracks,
            Err(e) => {
                log::warn!("Tracking failed on frame {}: {}", frame.frame_number, e);
                self.stats.skipped_cycles += 1;
                return None;
            }
        };

        let positions = self.mapper.map_tracks(&tracks, timestamp);
        let packet = format_live_packet(&positions, &timestamp_string());

        // Transient network errors never stop the loop
        if let Err(e) = self.sender.send(&format_for_receiver(&packet)) {
            log::warn!("UDP send failed: {}", e);
            self.stats.send_failures += 1;
        }
        if let Some(track_log) = self.track_log.as_mut() {
            if let Err(e) = track_log.write_packet(&packet) {
                log::warn!("Failed to write track log: {}", e);
            }
        }

        self.stats.cycles += 1;
        self.stats.positions_sent += positions.len() as u64;
        self.stats.last_frame_number = frame.frame_number;
        Some(positions)
    }

    fn cleanup(&mut self) {
        log::info!("Shutting down tracker after {} cycles", self.stats.cycles);
        self.source.stop();
        if let Some(track_log) = self.track_log.as_mut() {
            if let Err(e) = track_log.flush() {
                log::warn!("Failed to flush track log: {}", e);
            }
        }
    }
}
