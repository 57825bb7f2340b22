//! Threaded frame acquisition
//!
//! A `FrameSource` owns one background thread that reads frames from a
//! pluggable `FrameBackend` as fast as the backend delivers them and keeps
//! only the most recent one. The foreground cycle picks up that frame with a
//! non-blocking `read()` whenever it is ready for more work, so a slow
//! detector never builds up a queue of stale frames.
//!
//! Lifecycle:
//! - `start()` spawns the acquisition thread (no-op when already running)
//! - the loop ends on stop request, end of stream, or a backend read error
//! - `stop()` clears the run flag and waits up to one second for the loop;
//!   a device read cannot be interrupted, so a thread still blocked after
//!   that is left to finish on its own
//! - the backend is released by the acquisition thread when its loop exits

use crate::config::{VideoSettings, VideoSource};
use crate::error::{Result, TrackerError};
use crate::sequence::ImageSequence;
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long `stop()` waits for the acquisition loop to exit
pub const STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// One captured frame. Immutable once published.
#[derive(Debug, Clone)]
pub struct Frame {
    /// 1-based, strictly increasing per source
    pub frame_number: u64,
    pub image: RgbImage,
    pub captured_at: Instant,
}

/// Blocking frame producer driven by the acquisition thread
pub trait FrameBackend: Send {
    /// Block until the next frame is available.
    ///
    /// `Ok(None)` signals end of stream. Errors also end the stream.
    fn read_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Release device or file handles. Called exactly once.
    fn release(&mut self);

    /// Get the backend name (for logging/debugging)
    fn name(&self) -> &str;
}

struct Shared {
    running: AtomicBool,
    latest: Mutex<Option<Arc<Frame>>>,
}

impl Shared {
    fn publish(&self, frame: Frame) {
        let frame = Arc::new(frame);
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        *latest = Some(frame);
    }

    fn latest(&self) -> Option<Arc<Frame>> {
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Marks the loop as finished even if the backend panics, and tells a
/// waiting `stop()` that the thread is about to exit.
struct ExitGuard {
    shared: Arc<Shared>,
    done_tx: Sender<()>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        // Capacity 1 and a single send, so this never blocks
        let _ = self.done_tx.try_send(());
    }
}

struct Worker {
    handle: JoinHandle<()>,
    done_rx: Receiver<()>,
}

/// Background frame acquisition with a latest-frame snapshot
pub struct FrameSource {
    shared: Arc<Shared>,
    /// Held until `start()` moves it into the acquisition thread
    backend: Option<Box<dyn FrameBackend>>,
    worker: Option<Worker>,
    name: String,
}

impl FrameSource {
    pub fn new(backend: Box<dyn FrameBackend>) -> Self {
        let name = backend.name().to_string();
        Self {
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                latest: Mutex::new(None),
            }),
            backend: Some(backend),
            worker: None,
            name,
        }
    }

    /// Open the backend named by the video settings.
    ///
    /// Failing to open the device or file is fatal and returned to the caller.
    pub fn open(settings: &VideoSettings) -> Result<Self> {
        let backend: Box<dyn FrameBackend> = match settings.video_source() {
            VideoSource::ImageDir(dir) => {
                let sequence = ImageSequence::from_dir(dir)?;
                match settings.capture_fps {
                    Some(fps) => Box::new(sequence.with_fps(fps)),
                    None => Box::new(sequence),
                }
            }
            #[cfg(feature = "opencv")]
            VideoSource::Camera(index) => {
                Box::new(crate::video::OpenCvCapture::camera(index, settings)?)
            }
            #[cfg(feature = "opencv")]
            VideoSource::File(path) => Box::new(crate::video::OpenCvCapture::file(&path)?),
            #[cfg(not(feature = "opencv"))]
            other => {
                return Err(TrackerError::source_open(format!(
                    "{:?} requires the `opencv` feature",
                    other
                )))
            }
        };
        log::info!("Opened frame source: {}", backend.name());
        Ok(Self::new(backend))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the acquisition thread. Calling it again while running does nothing.
    pub fn start(&mut self) -> Result<()> {
        if self.shared.running.load(Ordering::SeqCst) {
            log::debug!("Frame source {} already running", self.name);
            return Ok(());
        }
        let Some(backend) = self.backend.take() else {
            log::warn!(
                "Frame source {} was stopped and its backend released; not restarting",
                self.name
            );
            return Ok(());
        };

        let (done_tx, done_rx) = bounded::<()>(1);
        self.shared.running.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);

        let spawned = thread::Builder::new()
            .name("frame-source".to_string())
            .spawn(move || {
                let guard = ExitGuard {
                    shared: Arc::clone(&shared),
                    done_tx,
                };
                acquisition_loop(backend, &shared);
                drop(guard);
            });

        match spawned {
            Ok(handle) => {
                log::info!("Frame source {} started", self.name);
                self.worker = Some(Worker { handle, done_rx });
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                Err(TrackerError::IoError(e))
            }
        }
    }

    /// Request the acquisition loop to end and wait a bounded time for it.
    ///
    /// Safe to call repeatedly and before `start()`.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);

        if let Some(worker) = self.worker.take() {
            match worker.done_rx.recv_timeout(STOP_TIMEOUT) {
                Ok(()) => {
                    if worker.handle.join().is_err() {
                        log::error!("Frame source {} thread panicked", self.name);
                    }
                    log::info!("Frame source {} stopped", self.name);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    log::error!("Frame source {} thread exited without signalling", self.name);
                    if worker.handle.join().is_err() {
                        log::error!("Frame source {} thread panicked", self.name);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!(
                        "Frame source {} still blocked in a read after {:?}; detaching",
                        self.name,
                        STOP_TIMEOUT
                    );
                }
            }
        }

        // Never started: nothing owns the backend but us
        if let Some(mut backend) = self.backend.take() {
            backend.release();
        }
    }

    /// Most recent frame, or `None` before the first frame arrives.
    /// Never blocks on the backend; repeated calls may return the same frame.
    pub fn read(&self) -> Option<Arc<Frame>> {
        self.shared.latest()
    }

    /// True while the acquisition loop runs and has published at least one frame
    pub fn is_alive(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst) && self.shared.latest().is_some()
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn acquisition_loop(mut backend: Box<dyn FrameBackend>, shared: &Shared) {
    let mut frame_number = 0_u64;

    while shared.running.load(Ordering::SeqCst) {
        match backend.read_frame() {
            Ok(Some(image)) => {
                frame_number += 1;
                shared.publish(Frame {
                    frame_number,
                    image,
                    captured_at: Instant::now(),
                });
                if frame_number % 100 == 0 {
                    log::debug!("{}: captured {} frames", backend.name(), frame_number);
                }
            }
            Ok(None) => {
                log::info!(
                    "{}: end of stream after {} frames",
                    backend.name(),
                    frame_number
                );
                break;
            }
            Err(e) => {
                log::warn!(
                    "{}: read failed after {} frames: {}",
                    backend.name(),
                    frame_number,
                    e
                );
                break;
            }
        }
    }

    shared.running.store(false, Ordering::SeqCst);
    backend.release();
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Test backend producing `limit` small frames, `delay` apart
    pub(crate) struct MockBackend {
        pub limit: Option<u64>,
        pub delay: Duration,
        pub produced: u64,
        pub fail_at: Option<u64>,
        pub releases: Arc<AtomicUsize>,
        /// Set once the acquisition thread is inside `read_frame`
        pub in_read: Arc<AtomicBool>,
    }

    impl MockBackend {
        pub(crate) fn new(limit: Option<u64>, delay: Duration) -> Self {
            Self {
                limit,
                delay,
                produced: 0,
                fail_at: None,
                releases: Arc::new(AtomicUsize::new(0)),
                in_read: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl FrameBackend for MockBackend {
        fn read_frame(&mut self) -> Result<Option<RgbImage>> {
            self.in_read.store(true, Ordering::SeqCst);
            thread::sleep(self.delay);
            if self.fail_at == Some(self.produced) {
                return Err(TrackerError::other("device unplugged"));
            }
            if self.limit.is_some_and(|limit| self.produced >= limit) {
                return Ok(None);
            }
            self.produced += 1;
            Ok(Some(RgbImage::new(4, 4)))
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    #[test]
    fn test_read_before_start_is_none() {
        let mut source = FrameSource::new(Box::new(MockBackend::new(None, Duration::ZERO)));
        assert!(source.read().is_none());
        assert!(!source.is_alive());
        source.stop();
        source.stop();
    }

    #[test]
    fn test_frames_are_published_in_order() {
        let mut source =
            FrameSource::new(Box::new(MockBackend::new(None, Duration::from_millis(1))));
        source.start().unwrap();
        source.start().unwrap();

        assert!(wait_until(Duration::from_secs(2), || source.is_alive()));
        let first = source.read().unwrap();
        assert!(wait_until(Duration::from_secs(2), || {
            source.read().unwrap().frame_number > first.frame_number
        }));
        let later = source.read().unwrap();
        assert!(later.frame_number > first.frame_number);
        assert!(later.captured_at >= first.captured_at);
        source.stop();
    }

    #[test]
    fn test_stop_ends_liveness_and_read_stays_non_blocking() {
        let backend = MockBackend::new(None, Duration::from_millis(1));
        let releases = Arc::clone(&backend.releases);
        let mut source = FrameSource::new(Box::new(backend));
        source.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || source.is_alive()));

        let stopping = Instant::now();
        source.stop();
        // The loop signals its exit well before the stop timeout
        assert!(stopping.elapsed() < STOP_TIMEOUT / 2);
        assert!(!source.is_alive());
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        let started = Instant::now();
        let last = source.read();
        assert!(started.elapsed() < Duration::from_millis(50));
        assert!(last.is_some());

        source.stop();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_end_of_stream_marks_source_dead() {
        let backend = MockBackend::new(Some(3), Duration::ZERO);
        let releases = Arc::clone(&backend.releases);
        let mut source = FrameSource::new(Box::new(backend));
        source.start().unwrap();

        assert!(wait_until(Duration::from_secs(2), || {
            releases.load(Ordering::SeqCst) == 1
        }));
        assert!(!source.is_alive());
        assert_eq!(source.read().unwrap().frame_number, 3);
    }

    #[test]
    fn test_read_error_is_end_of_stream() {
        let mut backend = MockBackend::new(None, Duration::ZERO);
        backend.fail_at = Some(2);
        let releases = Arc::clone(&backend.releases);
        let mut source = FrameSource::new(Box::new(backend));
        source.start().unwrap();

        assert!(wait_until(Duration::from_secs(2), || {
            releases.load(Ordering::SeqCst) == 1
        }));
        assert!(!source.is_alive());
        assert_eq!(source.read().unwrap().frame_number, 2);
    }

    #[test]
    fn test_stop_is_bounded_when_backend_blocks() {
        let backend = MockBackend::new(None, Duration::from_secs(3));
        let in_read = Arc::clone(&backend.in_read);
        let releases = Arc::clone(&backend.releases);
        let mut source = FrameSource::new(Box::new(backend));
        source.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || in_read.load(Ordering::SeqCst)));

        let started = Instant::now();
        source.stop();
        let waited = started.elapsed();
        assert!(waited >= STOP_TIMEOUT);
        assert!(waited < STOP_TIMEOUT + Duration::from_millis(500));
        assert!(!source.is_alive());
        // Detached: the blocked read still owns the backend
        assert_eq!(releases.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_open_image_dir_honours_capture_fps() {
        let dir = crate::sequence::tests::write_sequence(3);
        let settings = VideoSettings {
            source: dir.path().to_string_lossy().into_owned(),
            capture_fps: Some(20.0),
            ..VideoSettings::default()
        };
        let mut source = FrameSource::open(&settings).unwrap();

        let started = Instant::now();
        source.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || {
            source.read().is_some_and(|frame| frame.frame_number == 3)
        }));
        assert!(started.elapsed() >= Duration::from_millis(100));
        source.stop();
    }

    #[test]
    fn test_release_without_start() {
        let backend = MockBackend::new(None, Duration::ZERO);
        let releases = Arc::clone(&backend.releases);
        let mut source = FrameSource::new(Box::new(backend));
        source.stop();
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        // The backend is gone; start is a logged no-op
        source.start().unwrap();
        assert!(!source.is_alive());
    }
}
