//! Error types for the live position tracker

use std::time::Duration;
use thiserror::Error;

/// Result type alias for the tracker library
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors that can occur while acquiring frames or mapping positions
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Failed to open frame source: {0}")]
    SourceOpenError(String),

    #[error("Frame source delivered no frame within {0:?}")]
    SourceNotReady(Duration),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Filter error: {0:#}")]
    FilterError(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl TrackerError {
    pub fn source_open<S: Into<String>>(msg: S) -> Self {
        Self::SourceOpenError(msg.into())
    }

    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::TransportError(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }
}
