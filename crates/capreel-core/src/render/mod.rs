//! Caption render pipeline
//!
//! # Overview
//!
//! [`RenderPipeline`] turns validated transcript segments into a
//! [`CompositionTimeline`] of positioned overlay bitmaps, ready for an
//! encode adapter to burn into the video. Two modes exist: plain
//! (one overlay per segment) and word-highlighted (one overlay per word
//! window, with the active word tinted).

use crate::captions::models::{validate_segments, CaptionSegment, CaptionStyle};
use crate::captions::position::resolve_y;
use crate::captions::raster::{CaptionRasterizer, RenderedCaption};
use crate::captions::timing::split_segment;
use crate::encode::VideoHandle;
use crate::error::RenderResult;
use crate::fonts::FontLibrary;
use crate::timeline::CompositionTimeline;
use crate::types::{Rgb, TimeRange};
use std::sync::Arc;
use tracing::debug;

/// Highlight color applied when a word-highlight job does not pick one
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#FFFF00";

// =============================================================================
// Render Pipeline
// =============================================================================

/// Rasterizes caption segments against a source video's geometry
pub struct RenderPipeline {
    fonts: Arc<FontLibrary>,
    rasterizer: CaptionRasterizer,
}

impl RenderPipeline {
    /// Pipeline backed by the platform font directories
    pub fn new() -> Self {
        Self::with_fonts(Arc::new(FontLibrary::new()))
    }

    /// Pipeline backed by a caller-supplied font library
    pub fn with_fonts(fonts: Arc<FontLibrary>) -> Self {
        let rasterizer = CaptionRasterizer::new(Arc::clone(&fonts));
        Self { fonts, rasterizer }
    }

    pub fn fonts(&self) -> &Arc<FontLibrary> {
        &self.fonts
    }

    /// Renders one centered overlay per segment.
    ///
    /// Style and segments are validated before any rasterization, so a
    /// bad request fails without touching the font system.
    pub fn render_captions(
        &self,
        video: &VideoHandle,
        segments: &[CaptionSegment],
        style: &CaptionStyle,
    ) -> RenderResult<CompositionTimeline> {
        style.validate()?;
        validate_segments(segments)?;

        let mut timeline = CompositionTimeline::new(
            video.info.width,
            video.info.height,
            video.info.duration_sec,
        );
        for segment in segments {
            let image = self.rasterizer.render(&segment.text, style, video.info.width)?;
            let y_offset = resolve_y(video.info.height, image.height(), style.position, style.padding);
            timeline.push(RenderedCaption {
                image,
                y_offset,
                interval: TimeRange::new(segment.start_time, segment.end_time),
            });
        }
        debug!(
            "Rendered {} plain caption overlay(s) for {}",
            timeline.len(),
            video.path.display()
        );
        Ok(timeline)
    }

    /// Renders one overlay per word window, tinting the active word.
    ///
    /// Each segment's duration is split evenly across its words; every
    /// window re-renders the whole segment text so lines never shift
    /// while the highlight moves. A missing or malformed highlight color
    /// falls back to [`DEFAULT_HIGHLIGHT_COLOR`].
    pub fn render_word_highlighted_captions(
        &self,
        video: &VideoHandle,
        segments: &[CaptionSegment],
        style: &CaptionStyle,
        highlight_color: Option<&str>,
    ) -> RenderResult<CompositionTimeline> {
        style.validate()?;
        validate_segments(segments)?;

        let highlight = Rgb::from_hex(highlight_color.unwrap_or(DEFAULT_HIGHLIGHT_COLOR));
        let mut timeline = CompositionTimeline::new(
            video.info.width,
            video.info.height,
            video.info.duration_sec,
        );
        for segment in segments {
            for word in split_segment(segment) {
                let image = self.rasterizer.render_highlighted(
                    &segment.text,
                    &word.word,
                    style,
                    video.info.width,
                    highlight,
                )?;
                let y_offset =
                    resolve_y(video.info.height, image.height(), style.position, style.padding);
                timeline.push(RenderedCaption {
                    image,
                    y_offset,
                    interval: TimeRange::new(word.start, word.end),
                });
            }
        }
        debug!(
            "Rendered {} word-highlighted overlay(s) for {}",
            timeline.len(),
            video.path.display()
        );
        Ok(timeline)
    }
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
