//! FFmpeg-backed encode adapter
//!
//! # Overview
//!
//! Shells out to `ffmpeg`/`ffprobe` found on PATH (or at explicit paths).
//! Probing runs `ffprobe` with JSON output; muxing writes each overlay
//! bitmap to a PNG in the job workspace and composites them with a single
//! `ffmpeg` invocation using a chained `overlay` filter graph, so overlay
//! paint order is the filter chain order.

use crate::encode::{
    EncodeAdapter, EncodeError, EncodeResult, EncodeSettings, MediaInfo, VideoHandle,
};
use crate::timeline::OverlayEvent;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Longest stderr excerpt propagated in error messages
const STDERR_TAIL_CHARS: usize = 800;

/// Runs FFmpeg commands for probing and encoding
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegEncoder {
    /// Uses `ffmpeg` and `ffprobe` from PATH
    pub fn new() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }

    /// Uses explicit binary locations
    pub fn with_paths(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Scales a video. At least one of `width`/`height` must be given;
    /// the missing side keeps the aspect ratio (rounded to even).
    pub async fn resize(
        &self,
        input: &Path,
        output: &Path,
        width: Option<u32>,
        height: Option<u32>,
    ) -> EncodeResult<PathBuf> {
        self.check_input(input)?;
        let scale = scale_spec(width, height)?;

        let args = vec![
            "-i".to_string(),
            input.display().to_string(),
            "-vf".to_string(),
            format!("scale={scale}"),
            "-c:a".to_string(),
            "copy".to_string(),
            "-y".to_string(),
            output.display().to_string(),
        ];

        self.run_ffmpeg(&args).await?;
        Ok(output.to_path_buf())
    }

    /// Re-encodes a video at the bitrates of the given settings
    pub async fn compress(
        &self,
        input: &Path,
        output: &Path,
        settings: &EncodeSettings,
    ) -> EncodeResult<PathBuf> {
        self.check_input(input)?;

        let args = vec![
            "-i".to_string(),
            input.display().to_string(),
            "-c:v".to_string(),
            settings.video_codec.clone(),
            "-b:v".to_string(),
            settings.video_bitrate.clone(),
            "-preset".to_string(),
            settings.preset.clone(),
            "-c:a".to_string(),
            settings.audio_codec.clone(),
            "-b:a".to_string(),
            settings.audio_bitrate.clone(),
            "-y".to_string(),
            output.display().to_string(),
        ];

        self.run_ffmpeg(&args).await?;
        Ok(output.to_path_buf())
    }

    /// Extracts a single frame as a thumbnail image.
    ///
    /// Without an explicit `at_sec`, the frame is taken 1 second in, or
    /// at 10% of the duration for clips shorter than 10 seconds.
    pub async fn thumbnail(
        &self,
        input: &Path,
        output: &Path,
        at_sec: Option<f64>,
    ) -> EncodeResult<PathBuf> {
        self.check_input(input)?;

        let time = match at_sec {
            Some(t) => t,
            None => {
                let info = self.probe(input).await?;
                if info.duration_sec > 10.0 {
                    1.0
                } else {
                    info.duration_sec * 0.1
                }
            }
        };

        let args = vec![
            "-ss".to_string(),
            format!("{time:.3}"),
            "-i".to_string(),
            input.display().to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            "2".to_string(),
            "-y".to_string(),
            output.display().to_string(),
        ];

        self.run_ffmpeg(&args).await?;
        Ok(output.to_path_buf())
    }

    fn check_input(&self, input: &Path) -> EncodeResult<()> {
        if !input.exists() {
            return Err(EncodeError::InvalidInput(format!(
                "Input file does not exist: {}",
                input.display()
            )));
        }
        Ok(())
    }

    /// Runs ffmpeg to completion, mapping a missing binary to `NotFound`
    async fn run_ffmpeg(&self, args: &[String]) -> EncodeResult<()> {
        debug!("Running ffmpeg {}", args.join(" "));
        let output = Command::new(&self.ffmpeg)
            .args(args)
            .output()
            .await
            .map_err(map_spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EncodeError::ExecutionFailed(stderr_tail(&stderr)));
        }
        Ok(())
    }

    /// Runs ffmpeg with `-progress pipe:1`, logging progress against the
    /// expected duration
    async fn run_ffmpeg_with_progress(
        &self,
        args: &[String],
        duration_sec: f64,
    ) -> EncodeResult<()> {
        debug!("Running ffmpeg {}", args.join(" "));
        // stderr is kept to errors only; stdout is drained before waiting,
        // so neither pipe can fill up and stall the encode
        let mut child = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostats", "-progress", "pipe:1"])
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(map_spawn_error)?;

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            let mut current_sec = 0.0_f64;
            while let Ok(Some(line)) = lines.next_line().await {
                // out_time_ms is reported in microseconds
                if let Some(raw) = line.strip_prefix("out_time_ms=") {
                    current_sec = raw.trim().parse::<f64>().unwrap_or(0.0) / 1_000_000.0;
                } else if line.starts_with("progress=") && duration_sec > 0.0 {
                    let percent = (current_sec / duration_sec * 100.0).min(100.0);
                    debug!("Encode progress: {percent:.1}%");
                }
            }
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EncodeError::ExecutionFailed(stderr_tail(&stderr)));
        }
        Ok(())
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EncodeAdapter for FfmpegEncoder {
    async fn probe(&self, source: &Path) -> EncodeResult<MediaInfo> {
        self.check_input(source)?;

        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(source)
            .output()
            .await
            .map_err(map_spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EncodeError::ProbeError(stderr_tail(&stderr)));
        }

        let json = String::from_utf8_lossy(&output.stdout);
        parse_probe_output(&json, &source.display().to_string())
    }

    async fn mux(
        &self,
        source: &VideoHandle,
        events: &[OverlayEvent],
        settings: &EncodeSettings,
        output: &Path,
        workspace: &Path,
    ) -> EncodeResult<PathBuf> {
        self.check_input(&source.path)?;
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EncodeError::OutputError(format!("Failed to create output directory: {e}"))
            })?;
        }

        let overlay_paths = write_overlays(events, workspace)?;
        info!(
            "Muxing {} overlay(s) onto {}",
            overlay_paths.len(),
            source.path.display()
        );

        let mut args: Vec<String> = vec!["-i".to_string(), source.path.display().to_string()];
        for path in &overlay_paths {
            args.push("-i".to_string());
            args.push(path.display().to_string());
        }

        if events.is_empty() {
            args.push("-map".to_string());
            args.push("0:v".to_string());
        } else {
            args.push("-filter_complex".to_string());
            args.push(build_overlay_filter(events));
            args.push("-map".to_string());
            args.push(format!("[v{}]", events.len()));
        }

        // audio is passed through when the source has it
        args.push("-map".to_string());
        args.push("0:a?".to_string());

        args.extend([
            "-c:v".to_string(),
            settings.video_codec.clone(),
            "-preset".to_string(),
            settings.preset.clone(),
        ]);
        match settings.crf {
            Some(crf) => args.extend(["-crf".to_string(), crf.to_string()]),
            None => args.extend(["-b:v".to_string(), settings.video_bitrate.clone()]),
        }
        args.extend([
            "-pix_fmt".to_string(),
            settings.pixel_format.clone(),
            "-c:a".to_string(),
            settings.audio_codec.clone(),
            "-b:a".to_string(),
            settings.audio_bitrate.clone(),
            "-y".to_string(),
            output.display().to_string(),
        ]);

        self.run_ffmpeg_with_progress(&args, source.info.duration_sec)
            .await?;
        Ok(output.to_path_buf())
    }
}

// =============================================================================
// Filter Graph Construction
// =============================================================================

/// Writes each overlay bitmap to `workspace/overlay_NNNN.png`
fn write_overlays(events: &[OverlayEvent], workspace: &Path) -> EncodeResult<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(events.len());
    for (i, event) in events.iter().enumerate() {
        let path = workspace.join(format!("overlay_{i:04}.png"));
        event.image.save(&path).map_err(|e| {
            EncodeError::OutputError(format!(
                "Failed to write overlay {}: {e}",
                path.display()
            ))
        })?;
        paths.push(path);
    }
    Ok(paths)
}

/// Builds the chained overlay filter graph.
///
/// Input 0 is the source video; input `i + 1` is overlay `i`. Each link
/// composites one overlay within its activation window, so events apply
/// in list order.
fn build_overlay_filter(events: &[OverlayEvent]) -> String {
    let mut chains = Vec::with_capacity(events.len());
    for (i, event) in events.iter().enumerate() {
        let input = if i == 0 {
            "[0:v]".to_string()
        } else {
            format!("[v{i}]")
        };
        chains.push(format!(
            "{input}[{overlay}:v]overlay=x={x}:y={y}:enable='between(t,{start},{end})'[v{out}]",
            overlay = i + 1,
            x = event.x,
            y = event.y,
            start = event.interval.start,
            end = event.interval.end,
            out = i + 1,
        ));
    }
    chains.join(";")
}

/// Scale filter argument with `-2` keeping the aspect ratio on a missing side
fn scale_spec(width: Option<u32>, height: Option<u32>) -> EncodeResult<String> {
    match (width, height) {
        (Some(w), Some(h)) => Ok(format!("{w}:{h}")),
        (Some(w), None) => Ok(format!("{w}:-2")),
        (None, Some(h)) => Ok(format!("-2:{h}")),
        (None, None) => Err(EncodeError::InvalidInput(
            "resize requires a width or a height".to_string(),
        )),
    }
}

// =============================================================================
// Probe Output Parsing
// =============================================================================

/// Parses `ffprobe -print_format json` output into [`MediaInfo`]
fn parse_probe_output(json: &str, source: &str) -> EncodeResult<MediaInfo> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| EncodeError::Parse(e.to_string()))?;

    let format = &value["format"];
    let duration_sec = format["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let size_bytes = format["size"]
        .as_str()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);
    let format_name = format["format_name"].as_str().unwrap_or("unknown").to_string();

    let empty = Vec::new();
    let streams = value["streams"].as_array().unwrap_or(&empty);

    let video = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))
        .ok_or_else(|| EncodeError::MissingVideoStream(source.to_string()))?;

    let audio_codec = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("audio"))
        .and_then(|s| s["codec_name"].as_str())
        .map(|s| s.to_string());

    let width = video["width"].as_u64().unwrap_or(0) as u32;
    let height = video["height"].as_u64().unwrap_or(0) as u32;
    if width == 0 || height == 0 {
        warn!("Probe of {} reported zero dimensions", source);
    }

    Ok(MediaInfo {
        width,
        height,
        duration_sec,
        fps: parse_frame_rate(video["r_frame_rate"].as_str()),
        video_codec: video["codec_name"].as_str().unwrap_or("unknown").to_string(),
        audio_codec,
        pixel_format: video["pix_fmt"].as_str().unwrap_or("unknown").to_string(),
        format: format_name,
        size_bytes,
    })
}

/// Parses a frame rate fraction like "30000/1001", defaulting to 30.0
fn parse_frame_rate(raw: Option<&str>) -> f64 {
    raw.and_then(|s| {
        let (num, den) = s.split_once('/')?;
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            Some(num / den)
        } else {
            None
        }
    })
    .unwrap_or(30.0)
}

fn map_spawn_error(e: std::io::Error) -> EncodeError {
    if e.kind() == std::io::ErrorKind::NotFound {
        EncodeError::NotFound
    } else {
        EncodeError::Process(e)
    }
}

/// Last part of an stderr dump, enough to carry the actual failure line
fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.len() <= STDERR_TAIL_CHARS {
        return trimmed.to_string();
    }
    let start = trimmed.len() - STDERR_TAIL_CHARS;
    // avoid splitting a UTF-8 sequence
    let boundary = (start..trimmed.len())
        .find(|&i| trimmed.is_char_boundary(i))
        .unwrap_or(start);
    trimmed[boundary..].to_string()
}

// =============================================================================
// Tests
// =============================================================================
