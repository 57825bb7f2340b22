//! Image-sequence frame backend
//!
//! Plays back a list of still images as a video stream, optionally paced to
//! a fixed frame rate. Useful for recorded footage exported as frames and for
//! running the pipeline without a camera.

use crate::error::{Result, TrackerError};
use crate::frame_source::FrameBackend;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

pub struct ImageSequence {
    paths: Vec<PathBuf>,
    next: usize,
    frame_interval: Option<Duration>,
    last_read: Option<Instant>,
    name: String,
}

impl ImageSequence {
    /// Sequence over explicit files, played back in the given order
    pub fn new(paths: Vec<PathBuf>) -> Result<Self> {
        if paths.is_empty() {
            return Err(TrackerError::source_open("image sequence is empty"));
        }
        let name = format!("image-sequence({} frames)", paths.len());
        Ok(Self {
            paths,
            next: 0,
            frame_interval: None,
            last_read: None,
            name,
        })
    }

    /// All images in a directory, sorted by file name
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            TrackerError::source_open(format!("cannot read {}: {}", dir.display(), e))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(TrackerError::source_open(format!(
                "no images found in {}",
                dir.display()
            )));
        }
        log::info!("Found {} images in {}", paths.len(), dir.display());
        Self::new(paths)
    }

    /// Deliver frames no faster than `fps`, like a recorded video would
    pub fn with_fps(mut self, fps: f64) -> Self {
        if fps > 0.0 && fps.is_finite() {
            self.frame_interval = Some(Duration::from_secs_f64(1.0 / fps));
        }
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameBackend for ImageSequence {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };

        if let (Some(interval), Some(last)) = (self.frame_interval, self.last_read) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }

        let image = image::open(path)?.to_rgb8();
        self.next += 1;
        self.last_read = Some(Instant::now());
        Ok(Some(image))
    }

    fn release(&mut self) {
        log::debug!("{}: released after {} frames", self.name, self.next);
        self.next = self.paths.len();
    }

    fn name(&self) -> &str {
        &self.name
    }
}
