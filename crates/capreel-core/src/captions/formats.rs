//! Transcript format support
//!
//! # Overview
//!
//! Parses transcripts into caption segments and serializes segments back
//! out. Three formats are supported:
//!
//! - JSON: an array of segments in the crate's camelCase schema
//! - SRT: `HH:MM:SS,mmm` timestamps, tolerant of CRLF line endings and
//!   missing sequence numbers
//! - WebVTT: `.` millisecond separator, optional hours, cue identifiers
//!   accepted and cue settings ignored
//!
//! Parsing is structural only; segment-level validity (positive span,
//! non-empty text) is checked by the render pipeline.

use crate::captions::models::CaptionSegment;
use crate::error::RenderResult;
use std::path::Path;
use thiserror::Error;

/// Errors produced while parsing SRT or WebVTT content
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Unexpected end of input")]
    UnexpectedEnd,
}

// =============================================================================
// Format Detection
// =============================================================================

/// Supported transcript file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptFormat {
    Json,
    Srt,
    Vtt,
}

impl TranscriptFormat {
    /// Detects the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_lowercase()
            .as_str()
        {
            "json" => Some(Self::Json),
            "srt" => Some(Self::Srt),
            "vtt" => Some(Self::Vtt),
            _ => None,
        }
    }
}

/// Parses transcript content in the given format
pub fn parse_transcript(
    content: &str,
    format: TranscriptFormat,
) -> RenderResult<Vec<CaptionSegment>> {
    match format {
        TranscriptFormat::Json => Ok(serde_json::from_str(content)?),
        TranscriptFormat::Srt => Ok(parse_srt(content)?),
        TranscriptFormat::Vtt => Ok(parse_vtt(content)?),
    }
}

// =============================================================================
// SRT
// =============================================================================

/// Parses SRT subtitle content into caption segments.
///
/// Sequence numbers are optional and multi-line cue text is joined with
/// `\n`.
pub fn parse_srt(content: &str) -> Result<Vec<CaptionSegment>, ParseError> {
    let mut segments = Vec::new();
    let mut lines = content.lines().map(|l| l.trim_end_matches('\r'));

    while let Some(line) = lines.next() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // optional sequence number line
        let timestamp_line = if line.parse::<u32>().is_ok() {
            lines.next().ok_or(ParseError::UnexpectedEnd)?.trim()
        } else {
            line
        };

        let (start_raw, end_raw) = timestamp_line.split_once("-->").ok_or_else(|| {
            ParseError::InvalidFormat(format!("expected timestamps, got '{timestamp_line}'"))
        })?;
        let start = parse_srt_timestamp(start_raw.trim())?;
        let end = parse_srt_timestamp(end_raw.trim())?;

        let mut text_lines: Vec<&str> = Vec::new();
        for text in lines.by_ref() {
            let text = text.trim();
            if text.is_empty() {
                break;
            }
            text_lines.push(text);
        }

        segments.push(CaptionSegment::new(start, end, text_lines.join("\n")));
    }

    Ok(segments)
}

/// Parses an SRT timestamp (`HH:MM:SS,mmm`) into seconds.
///
/// A `.` millisecond separator is accepted as well.
fn parse_srt_timestamp(raw: &str) -> Result<f64, ParseError> {
    let normalized = raw.replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();
    if parts.len() != 3 {
        return Err(ParseError::InvalidTimestamp(raw.to_string()));
    }

    let hours: f64 = parts[0]
        .parse()
        .map_err(|_| ParseError::InvalidTimestamp(raw.to_string()))?;
    let minutes: f64 = parts[1]
        .parse()
        .map_err(|_| ParseError::InvalidTimestamp(raw.to_string()))?;
    let seconds: f64 = parts[2]
        .parse()
        .map_err(|_| ParseError::InvalidTimestamp(raw.to_string()))?;

    Ok(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Formats seconds as an SRT timestamp (`HH:MM:SS,mmm`)
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round().max(0.0) as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

/// Serializes segments to SRT
pub fn export_srt(segments: &[CaptionSegment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(segment.start_time),
            format_srt_timestamp(segment.end_time)
        ));
        out.push_str(&segment.text);
        out.push_str("\n\n");
    }
    out.trim_end().to_string()
}

// =============================================================================
// WebVTT
// =============================================================================

/// Parses WebVTT subtitle content into caption segments.
///
/// Cue identifiers are accepted and dropped, cue settings after the end
/// timestamp are ignored, and inline styling tags are stripped from the
/// text.
pub fn parse_vtt(content: &str) -> Result<Vec<CaptionSegment>, ParseError> {
    let mut lines = content.lines().map(|l| l.trim_end_matches('\r'));

    let header = lines.next().ok_or(ParseError::UnexpectedEnd)?;
    if !header.trim_start_matches('\u{feff}').starts_with("WEBVTT") {
        return Err(ParseError::InvalidFormat(
            "missing WEBVTT header".to_string(),
        ));
    }

    // header metadata runs to the first blank line
    for line in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }
    }

    let mut segments = Vec::new();
    while let Some(line) = lines.next() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // a line without an arrow is a cue identifier
        let timestamp_line = if line.contains("-->") {
            line.to_string()
        } else {
            lines
                .next()
                .ok_or(ParseError::UnexpectedEnd)?
                .trim()
                .to_string()
        };

        let (start_raw, rest) = timestamp_line.split_once("-->").ok_or_else(|| {
            ParseError::InvalidFormat(format!("expected timestamps, got '{timestamp_line}'"))
        })?;
        let start = parse_vtt_timestamp(start_raw.trim())?;

        // cue settings after the end timestamp are ignored
        let end_raw = rest
            .split_whitespace()
            .next()
            .ok_or_else(|| ParseError::InvalidTimestamp(rest.trim().to_string()))?;
        let end = parse_vtt_timestamp(end_raw)?;

        let mut text_lines: Vec<String> = Vec::new();
        for text in lines.by_ref() {
            let text = text.trim();
            if text.is_empty() {
                break;
            }
            text_lines.push(strip_vtt_tags(text));
        }

        segments.push(CaptionSegment::new(start, end, text_lines.join("\n")));
    }

    Ok(segments)
}

/// Parses a WebVTT timestamp (`MM:SS.mmm` or `HH:MM:SS.mmm`) into seconds
fn parse_vtt_timestamp(raw: &str) -> Result<f64, ParseError> {
    let parts: Vec<&str> = raw.split(':').collect();
    let err = || ParseError::InvalidTimestamp(raw.to_string());

    match parts.as_slice() {
        [minutes, seconds] => {
            let minutes: f64 = minutes.parse().map_err(|_| err())?;
            let seconds: f64 = seconds.parse().map_err(|_| err())?;
            Ok(minutes * 60.0 + seconds)
        }
        [hours, minutes, seconds] => {
            let hours: f64 = hours.parse().map_err(|_| err())?;
            let minutes: f64 = minutes.parse().map_err(|_| err())?;
            let seconds: f64 = seconds.parse().map_err(|_| err())?;
            Ok(hours * 3600.0 + minutes * 60.0 + seconds)
        }
        _ => Err(err()),
    }
}

/// Removes inline tags like `<b>` or `<c.yellow>` from cue text
fn strip_vtt_tags(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

/// Formats seconds as a WebVTT timestamp (`HH:MM:SS.mmm`)
pub fn format_vtt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round().max(0.0) as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;
    format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
}

/// Serializes segments to WebVTT
pub fn export_vtt(segments: &[CaptionSegment]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in segments {
        out.push_str(&format!(
            "{} --> {}\n",
            format_vtt_timestamp(segment.start_time),
            format_vtt_timestamp(segment.end_time)
        ));
        out.push_str(&segment.text);
        out.push_str("\n\n");
    }
    out.trim_end().to_string()
}

// =============================================================================
// Tests
// =============================================================================
