//! OpenCV capture backend for cameras, video files and network streams

use crate::config::VideoSettings;
use crate::error::{Result, TrackerError};
use crate::frame_source::FrameBackend;
use image::RgbImage;
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, CAP_ANY},
};

/// Frame backend reading from an OpenCV `VideoCapture`
pub struct OpenCvCapture {
    capture: Option<VideoCapture>,
    /// Reused across reads
    frame: Mat,
    name: String,
}

impl OpenCvCapture {
    /// Open a camera by index and request the configured resolution
    pub fn camera(index: i32, settings: &VideoSettings) -> Result<Self> {
        log::info!("Opening camera device: {}", index);
        let mut capture = VideoCapture::new(index, CAP_ANY).map_err(|e| {
            TrackerError::source_open(format!("Failed to open camera {}: {}", index, e))
        })?;
        ensure_opened(&capture, &format!("camera {}", index))?;

        // Drivers may ignore these; the frames report the real size
        let _ = capture.set(videoio::CAP_PROP_FRAME_WIDTH, settings.width as f64);
        let _ = capture.set(videoio::CAP_PROP_FRAME_HEIGHT, settings.height as f64);
        if let Some(fps) = settings.capture_fps {
            let _ = capture.set(videoio::CAP_PROP_FPS, fps);
        }

        Ok(Self::from_capture(capture, format!("camera {}", index)))
    }

    /// Open a video file or stream URL
    pub fn file(path: &str) -> Result<Self> {
        log::info!("Opening video source: {}", path);
        let capture = VideoCapture::from_file(path, CAP_ANY).map_err(|e| {
            TrackerError::source_open(format!("Failed to open video source {}: {}", path, e))
        })?;
        ensure_opened(&capture, path)?;
        Ok(Self::from_capture(capture, path.to_string()))
    }

    fn from_capture(capture: VideoCapture, name: String) -> Self {
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0);
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0);
        let fps = capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);
        log::info!(
            "Video properties: {}x{} @ {:.2} FPS",
            width as i32,
            height as i32,
            fps
        );

        Self {
            capture: Some(capture),
            frame: Mat::default(),
            name,
        }
    }
}

fn ensure_opened(capture: &VideoCapture, what: &str) -> Result<()> {
    let opened = capture
        .is_opened()
        .map_err(|e| TrackerError::source_open(format!("{} check failed: {}", what, e)))?;
    if !opened {
        return Err(TrackerError::source_open(format!("{} is not opened", what)));
    }
    Ok(())
}

/// Convert an OpenCV BGR Mat to an RgbImage
fn mat_to_rgb_image(mat: &Mat) -> Result<RgbImage> {
    let width = mat.cols() as u32;
    let height = mat.rows() as u32;

    let mut rgb_mat = Mat::default();

    // macOS OpenCV requires AlgorithmHint parameter, Linux does not
    #[cfg(target_os = "macos")]
    imgproc::cvt_color(
        mat,
        &mut rgb_mat,
        imgproc::COLOR_BGR2RGB,
        0,
        opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
    )
    .map_err(|e| TrackerError::other(format!("Failed to convert BGR to RGB: {}", e)))?;

    #[cfg(not(target_os = "macos"))]
    imgproc::cvt_color(mat, &mut rgb_mat, imgproc::COLOR_BGR2RGB, 0)
        .map_err(|e| TrackerError::other(format!("Failed to convert BGR to RGB: {}", e)))?;

    let data = rgb_mat
        .data_bytes()
        .map_err(|e| TrackerError::other(format!("Failed to get image data: {}", e)))?
        .to_vec();

    RgbImage::from_vec(width, height, data)
        .ok_or_else(|| TrackerError::other("Failed to create RgbImage"))
}

impl FrameBackend for OpenCvCapture {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(None);
        };

        let ok = capture
            .read(&mut self.frame)
            .map_err(|e| TrackerError::other(format!("Failed to read frame: {}", e)))?;
        if !ok || self.frame.empty() {
            return Ok(None);
        }

        mat_to_rgb_image(&self.frame).map(Some)
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                log::warn!("Failed to release {}: {}", self.name, e);
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
