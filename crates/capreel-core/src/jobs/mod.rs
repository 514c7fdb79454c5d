//! Caption render jobs
//!
//! # Overview
//!
//! A [`CaptionJob`] bundles everything one render needs: the source
//! video, the transcript segments, the style, the caption mode, and the
//! encode settings. Jobs run inside the [`WorkerPool`];
//! the [`JobProcessor`] drives a single job through probe, render, and
//! encode, reporting coarse progress checkpoints and cleaning up its
//! scratch directory whether it succeeds or fails.

mod worker;

pub use worker::{JobEvent, WorkerPool, WorkerPoolConfig};

use crate::captions::models::{CaptionSegment, CaptionStyle};
use crate::encode::{EncodeAdapter, EncodeSettings, VideoHandle};
use crate::error::RenderResult;
use crate::render::RenderPipeline;
use crate::types::JobId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

// =============================================================================
// Progress Checkpoints
// =============================================================================

/// Progress after the source has been probed
pub const PROGRESS_PREPARING: f32 = 0.1;
/// Progress while captions rasterize
pub const PROGRESS_RENDERING: f32 = 0.4;
/// Progress while the output encodes
pub const PROGRESS_ENCODING: f32 = 0.8;
/// Progress of a finished job
pub const PROGRESS_DONE: f32 = 1.0;

// =============================================================================
// Job Model
// =============================================================================

/// Caption rendering mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CaptionMode {
    /// Whole segments, centered
    Plain,
    /// One caption per word window, with the active word highlighted
    WordHighlighted {
        /// Hex highlight color; defaults to yellow when omitted
        #[serde(default, skip_serializing_if = "Option::is_none")]
        highlight_color: Option<String>,
    },
}

impl Default for CaptionMode {
    fn default() -> Self {
        Self::Plain
    }
}

/// Scheduling priority. Higher values run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    Background = 0,
    #[default]
    Normal = 1,
    UserRequest = 2,
}

/// Lifecycle state of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JobStatus {
    /// Waiting in the queue
    Queued,
    /// Being processed by a worker
    Running {
        /// Fractional progress, 0.0 to 1.0
        progress: f32,
        /// Human-readable stage description
        message: Option<String>,
    },
    /// Finished successfully
    Completed { output_path: String },
    /// Finished with an error
    Failed { error: String },
    /// Cancelled before or during processing
    Cancelled,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Queued
    }
}

/// A queued caption render request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionJob {
    /// Unique job ID (ULID)
    pub id: JobId,
    /// Source video file
    pub video_path: PathBuf,
    /// Transcript segments to render
    pub segments: Vec<CaptionSegment>,
    /// Caption style
    pub style: CaptionStyle,
    /// Rendering mode
    #[serde(default)]
    pub mode: CaptionMode,
    /// Encoder configuration
    #[serde(default)]
    pub settings: EncodeSettings,
    /// Destination for the output video
    pub output_path: PathBuf,
    /// Scheduling priority
    #[serde(default)]
    pub priority: Priority,
    /// Current lifecycle state
    #[serde(default)]
    pub status: JobStatus,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Completion timestamp (RFC 3339), set when the job finishes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl CaptionJob {
    /// Creates a job with a fresh ULID and default mode, settings, and
    /// priority
    pub fn new(
        video_path: impl Into<PathBuf>,
        segments: Vec<CaptionSegment>,
        style: CaptionStyle,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            video_path: video_path.into(),
            segments,
            style,
            mode: CaptionMode::default(),
            settings: EncodeSettings::default(),
            output_path: output_path.into(),
            priority: Priority::default(),
            status: JobStatus::default(),
            created_at: chrono::Utc::now().to_rfc3339(),
            completed_at: None,
        }
    }

    /// Sets the caption mode (builder pattern)
    pub fn with_mode(mut self, mode: CaptionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the encode settings (builder pattern)
    pub fn with_settings(mut self, settings: EncodeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the priority (builder pattern)
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Returns true if the job is currently running
    pub fn is_running(&self) -> bool {
        matches!(self.status, JobStatus::Running { .. })
    }

    /// Returns true if the job has reached a terminal state
    pub fn is_done(&self) -> bool {
        matches!(
            self.status,
            JobStatus::Completed { .. } | JobStatus::Failed { .. } | JobStatus::Cancelled
        )
    }
}

// =============================================================================
// Temp Directory Guard
// =============================================================================

/// Removes a scratch directory on drop.
///
/// Runs on every exit path, including errors and timeouts, so failed
/// jobs leave no partial output behind.
pub struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!(
                    "Failed to clean up temp directory {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

// =============================================================================
// Job Processor
// =============================================================================

/// Drives a single caption job from probe to encoded output
pub struct JobProcessor {
    pipeline: Arc<RenderPipeline>,
    adapter: Arc<dyn EncodeAdapter>,
    temp_root: PathBuf,
    event_tx: mpsc::UnboundedSender<JobEvent>,
}

impl JobProcessor {
    pub fn new(
        pipeline: Arc<RenderPipeline>,
        adapter: Arc<dyn EncodeAdapter>,
        temp_root: PathBuf,
        event_tx: mpsc::UnboundedSender<JobEvent>,
    ) -> Self {
        Self {
            pipeline,
            adapter,
            temp_root,
            event_tx,
        }
    }

    /// Default scratch root: `{system temp}/capreel`
    pub fn default_temp_root() -> PathBuf {
        std::env::temp_dir().join("capreel")
    }

    /// Processes one job to completion.
    ///
    /// The job's scratch directory `{temp_root}/{job_id}/` is created up
    /// front and removed when this returns, on success and on failure.
    pub async fn process(&self, job: &CaptionJob) -> RenderResult<PathBuf> {
        let workspace = self.temp_root.join(&job.id);
        std::fs::create_dir_all(&workspace)?;
        let guard = TempDirGuard::new(workspace);

        self.emit_progress(&job.id, PROGRESS_PREPARING, "Probing source video");
        let info = self.adapter.probe(&job.video_path).await?;
        let video = VideoHandle::new(&job.video_path, info);
        debug!(
            "Job {}: source {}x{}, {:.2}s",
            job.id, video.info.width, video.info.height, video.info.duration_sec
        );

        self.emit_progress(&job.id, PROGRESS_RENDERING, "Rendering captions");
        let timeline = match &job.mode {
            CaptionMode::Plain => {
                self.pipeline
                    .render_captions(&video, &job.segments, &job.style)?
            }
            CaptionMode::WordHighlighted { highlight_color } => {
                self.pipeline.render_word_highlighted_captions(
                    &video,
                    &job.segments,
                    &job.style,
                    highlight_color.as_deref(),
                )?
            }
        };

        self.emit_progress(&job.id, PROGRESS_ENCODING, "Encoding output");
        let output = self
            .adapter
            .mux(
                &video,
                &timeline.into_events(),
                &job.settings,
                &job.output_path,
                guard.path(),
            )
            .await?;

        Ok(output)
    }

    fn emit_progress(&self, job_id: &str, progress: f32, message: &str) {
        let _ = self.event_tx.send(JobEvent::Progress {
            job_id: job_id.to_string(),
            progress,
            message: message.to_string(),
        });
    }
}

// =============================================================================
// Tests
// =============================================================================
