//! Application settings
//!
//! Every section deserializes with defaults for missing fields, so a settings
//! file only needs to name what differs from a stock camera setup.

use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use worldtrack::{
    EmaSmoother, KalmanNoise, KalmanSmoother, KalmanSmootherParams, Projector, Smoother,
};

/// Detector settings, passed through to whatever `Detector` is plugged in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub model_path: String,
    /// Confidence threshold for detections (0-1)
    pub confidence_threshold: f32,
    /// Non-maximum suppression threshold (0-1)
    pub iou_threshold: f32,
    /// Only detections of this class are handed to the tracker
    pub person_class_id: u32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            model_path: "models/yolov8n.engine".to_string(),
            confidence_threshold: 0.1,
            iou_threshold: 0.5,
            person_class_id: crate::types::PERSON_CLASS_ID,
        }
    }
}

/// Smoothing strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmootherKind {
    #[default]
    Ema,
    Kalman,
}

/// Noise and heading-hold parameters for the Kalman smoother
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanSettings {
    pub process_noise_pos: f64,
    pub process_noise_vel: f64,
    pub measurement_noise: f64,
    pub initial_pos_variance: f64,
    pub initial_vel_variance: f64,
    /// Minimum speed (world units/s) at which the heading is recomputed
    pub heading_speed_threshold: f64,
}

impl Default for KalmanSettings {
    fn default() -> Self {
        let params = KalmanSmootherParams::default();
        Self {
            process_noise_pos: params.noise.process_noise_pos,
            process_noise_vel: params.noise.process_noise_vel,
            measurement_noise: params.noise.measurement_noise,
            initial_pos_variance: params.noise.initial_pos_variance,
            initial_vel_variance: params.noise.initial_vel_variance,
            heading_speed_threshold: params.heading_speed_threshold,
        }
    }
}

impl From<KalmanSettings> for KalmanSmootherParams {
    fn from(s: KalmanSettings) -> Self {
        Self {
            noise: KalmanNoise {
                process_noise_pos: s.process_noise_pos,
                process_noise_vel: s.process_noise_vel,
                measurement_noise: s.measurement_noise,
                initial_pos_variance: s.initial_pos_variance,
                initial_vel_variance: s.initial_vel_variance,
            },
            heading_speed_threshold: s.heading_speed_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSettings {
    pub smoother: SmootherKind,
    /// EMA weight of the previous smoothed value
    pub ema_alpha: f64,
    pub use_homography: bool,
    pub homography_path: PathBuf,
    pub kalman: KalmanSettings,
    /// Cycles a track may be missing from tracker output before its state is dropped
    pub max_missed_cycles: u32,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            smoother: SmootherKind::Ema,
            ema_alpha: 0.6,
            use_homography: true,
            homography_path: PathBuf::from("homography/H.npy"),
            kalman: KalmanSettings::default(),
            max_missed_cycles: 30,
        }
    }
}

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Camera device index
    Camera(i32),
    /// Video file or stream URL
    File(String),
    /// Directory of still images played back in name order
    ImageDir(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    /// Camera index ("0"), video file/URL, or a directory of images
    pub source: String,
    pub width: u32,
    pub height: u32,
    /// Processing rate of the foreground cycle
    pub target_fps: f64,
    /// Rate requested from the capture device, or playback rate for an
    /// image directory
    pub capture_fps: Option<f64>,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            source: "0".to_string(),
            width: 1280,
            height: 720,
            target_fps: 15.0,
            capture_fps: None,
        }
    }
}

impl VideoSettings {
    pub fn video_source(&self) -> VideoSource {
        if let Ok(index) = self.source.trim().parse::<i32>() {
            return VideoSource::Camera(index);
        }
        let path = Path::new(&self.source);
        if path.is_dir() {
            VideoSource::ImageDir(path.to_path_buf())
        } else {
            VideoSource::File(self.source.clone())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub host: String,
    pub port: u16,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9999,
        }
    }
}

impl NetworkSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Top-level settings for the live tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub detector: DetectorSettings,
    pub tracking: TrackingSettings,
    pub video: VideoSettings,
    pub network: NetworkSettings,
    /// Append one JSON line per cycle to `jsonl_path`
    pub save_jsonl: bool,
    pub jsonl_path: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            detector: DetectorSettings::default(),
            tracking: TrackingSettings::default(),
            video: VideoSettings::default(),
            network: NetworkSettings::default(),
            save_jsonl: false,
            jsonl_path: PathBuf::from("tracks.jsonl"),
        }
    }
}

impl AppSettings {
    /// Load settings from a JSON file and validate them
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let settings: AppSettings = serde_json::from_str(&text)?;
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let alpha = self.tracking.ema_alpha;
        if !(0.0..=1.0).contains(&alpha) {
            return Err(TrackerError::config(format!(
                "tracking.ema_alpha must be within [0, 1], got {}",
                alpha
            )));
        }
        let fps = self.video.target_fps;
        if !fps.is_finite() || fps <= 0.0 {
            return Err(TrackerError::config(format!(
                "video.target_fps must be positive, got {}",
                fps
            )));
        }
        if let Some(capture_fps) = self.video.capture_fps {
            if !capture_fps.is_finite() || capture_fps <= 0.0 {
                return Err(TrackerError::config(format!(
                    "video.capture_fps must be positive, got {}",
                    capture_fps
                )));
            }
        }
        let k = &self.tracking.kalman;
        let noise_terms = [
            ("process_noise_pos", k.process_noise_pos),
            ("process_noise_vel", k.process_noise_vel),
            ("measurement_noise", k.measurement_noise),
            ("initial_pos_variance", k.initial_pos_variance),
            ("initial_vel_variance", k.initial_vel_variance),
            ("heading_speed_threshold", k.heading_speed_threshold),
        ];
        for (name, value) in noise_terms {
            if !value.is_finite() || value < 0.0 {
                return Err(TrackerError::config(format!(
                    "tracking.kalman.{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("confidence_threshold", self.detector.confidence_threshold),
            ("iou_threshold", self.detector.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrackerError::config(format!(
                    "detector.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Instantiate the configured smoothing strategy
    pub fn build_smoother(&self) -> Result<Box<dyn Smoother>> {
        let smoother: Box<dyn Smoother> = match self.tracking.smoother {
            SmootherKind::Ema => Box::new(EmaSmoother::new(self.tracking.ema_alpha)?),
            SmootherKind::Kalman => Box::new(KalmanSmoother::new(self.tracking.kalman.into())),
        };
        log::info!("Using {} smoother", smoother.name());
        Ok(smoother)
    }

    pub fn build_projector(&self) -> Projector {
        Projector::from_file(
            &self.tracking.homography_path,
            self.tracking.use_homography,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_file(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        std::fs::write(file.path(), contents).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.tracking.smoother, SmootherKind::Ema);
        assert_eq!(settings.tracking.ema_alpha, 0.6);
        assert_eq!(settings.tracking.homography_path, PathBuf::from("homography/H.npy"));
        assert_eq!(settings.video.width, 1280);
        assert_eq!(settings.video.height, 720);
        assert_eq!(settings.network.address(), "127.0.0.1:9999");
        assert_eq!(settings.jsonl_path, PathBuf::from("tracks.jsonl"));
        assert!(!settings.save_jsonl);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let file = settings_file(r#"{"tracking": {"smoother": "kalman"}, "network": {"port": 5005}}"#);
        let settings = AppSettings::from_file(file.path()).unwrap();

        assert_eq!(settings.tracking.smoother, SmootherKind::Kalman);
        assert_eq!(settings.tracking.ema_alpha, 0.6);
        assert_eq!(settings.network.host, "127.0.0.1");
        assert_eq!(settings.network.port, 5005);
        assert_eq!(settings.build_smoother().unwrap().name(), "kalman");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = AppSettings::default();
        settings.tracking.ema_alpha = 1.5;
        assert!(matches!(
            settings.validate(),
            Err(TrackerError::ConfigError(_))
        ));

        let mut settings = AppSettings::default();
        settings.video.target_fps = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = AppSettings::default();
        settings.tracking.kalman.heading_speed_threshold = -0.1;
        assert!(settings.validate().is_err());

        let file = settings_file(r#"{"tracking": {"ema_alpha": -0.2}}"#);
        assert!(AppSettings::from_file(file.path()).is_err());
    }

    #[test]
    fn test_malformed_file_is_a_serialization_error() {
        let file = settings_file("{ not json");
        assert!(matches!(
            AppSettings::from_file(file.path()),
            Err(TrackerError::SerializationError(_))
        ));
    }

    #[test]
    fn test_video_source_parsing() {
        let mut video = VideoSettings::default();
        assert_eq!(video.video_source(), VideoSource::Camera(0));

        video.source = "Footage/people.mp4".to_string();
        assert_eq!(
            video.video_source(),
            VideoSource::File("Footage/people.mp4".to_string())
        );

        let frames = tempfile::tempdir().unwrap();
        video.source = frames.path().to_string_lossy().into_owned();
        assert_eq!(
            video.video_source(),
            VideoSource::ImageDir(frames.path().to_path_buf())
        );
    }
}
