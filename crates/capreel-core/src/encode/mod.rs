//! Encode adapter boundary
//!
//! # Overview
//!
//! The render pipeline produces overlay events; turning them into an
//! output video is delegated to an [`EncodeAdapter`]. The production
//! adapter shells out to FFmpeg ([`FfmpegEncoder`]); tests substitute a
//! recording stub. Adapter failures surface to callers unchanged.

mod ffmpeg;

pub use ffmpeg::FfmpegEncoder;

use crate::timeline::OverlayEvent;
use crate::types::TimeSec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

// =============================================================================
// Errors
// =============================================================================

/// Errors from the media probe and encode backend
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("FFmpeg not found. Please install FFmpeg to render videos")]
    NotFound,

    #[error("FFmpeg execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("Probe failed: {0}")]
    ProbeError(String),

    #[error("No video stream in {0}")]
    MissingVideoStream(String),

    #[error("Process error: {0}")]
    Process(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type for encode operations
pub type EncodeResult<T> = Result<T, EncodeError>;

// =============================================================================
// Media Info
// =============================================================================

/// Metadata for a probed video file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Duration in seconds
    pub duration_sec: TimeSec,
    /// Frames per second
    pub fps: f64,
    /// Video codec name (e.g., "h264")
    pub video_codec: String,
    /// Audio codec name, if an audio stream exists
    pub audio_codec: Option<String>,
    /// Pixel format (e.g., "yuv420p")
    pub pixel_format: String,
    /// Container format name
    pub format: String,
    /// File size in bytes
    pub size_bytes: u64,
}

impl MediaInfo {
    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }
}

/// A source video path together with its probed metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoHandle {
    pub path: PathBuf,
    pub info: MediaInfo,
}

impl VideoHandle {
    pub fn new(path: impl Into<PathBuf>, info: MediaInfo) -> Self {
        Self {
            path: path.into(),
            info,
        }
    }
}

// =============================================================================
// Encode Settings
// =============================================================================

/// Output quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    /// Parses a preset name. Unrecognized names resolve to `Medium`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }
}

/// Encoder configuration for the output video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeSettings {
    /// Video codec (e.g., "libx264")
    pub video_codec: String,
    /// Audio codec (e.g., "aac")
    pub audio_codec: String,
    /// Target video bitrate (e.g., "1000k"), used when `crf` is unset
    pub video_bitrate: String,
    /// Target audio bitrate (e.g., "128k")
    pub audio_bitrate: String,
    /// Constant rate factor; takes precedence over `video_bitrate`
    pub crf: Option<u8>,
    /// Encoder speed preset (e.g., "medium")
    pub preset: String,
    /// Output pixel format
    pub pixel_format: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self::from_quality(QualityPreset::Medium)
    }
}

impl EncodeSettings {
    /// Settings for a named quality tier
    pub fn from_quality(quality: QualityPreset) -> Self {
        let (video_bitrate, audio_bitrate, crf) = match quality {
            QualityPreset::Low => ("500k", "64k", 28),
            QualityPreset::Medium => ("1000k", "128k", 23),
            QualityPreset::High => ("2000k", "192k", 18),
        };
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            video_bitrate: video_bitrate.to_string(),
            audio_bitrate: audio_bitrate.to_string(),
            crf: Some(crf),
            preset: "medium".to_string(),
            pixel_format: "yuv420p".to_string(),
        }
    }
}

// =============================================================================
// Adapter Trait
// =============================================================================

/// Boundary between caption rendering and the media backend.
///
/// `mux` receives overlay events in paint order and must composite them
/// in that order. `workspace` is a job-scoped scratch directory that the
/// caller cleans up.
#[async_trait]
pub trait EncodeAdapter: Send + Sync {
    /// Reads stream metadata from a video file
    async fn probe(&self, source: &Path) -> EncodeResult<MediaInfo>;

    /// Composites overlays onto the source video and writes `output`
    async fn mux(
        &self,
        source: &VideoHandle,
        events: &[OverlayEvent],
        settings: &EncodeSettings,
        output: &Path,
        workspace: &Path,
    ) -> EncodeResult<PathBuf>;
}

// =============================================================================
// Test Support
// =============================================================================


// =============================================================================
// Tests
// =============================================================================
