//! Composition timeline
//!
//! # Overview
//!
//! Collects rasterized captions into an ordered list of overlay events
//! for the encode stage. Events keep the order in which they were pushed;
//! when activation windows overlap, later events paint over earlier ones.
//! There is no z-index.

use crate::captions::raster::RenderedCaption;
use crate::types::{TimeRange, TimeSec};
use image::RgbaImage;

// =============================================================================
// Overlay Event
// =============================================================================

/// A positioned bitmap with the time window during which it is composited
/// over the video
#[derive(Debug)]
pub struct OverlayEvent {
    /// Transparent RGBA bitmap to composite
    pub image: RgbaImage,
    /// Horizontal offset within the frame
    pub x: i32,
    /// Vertical offset within the frame (may be negative)
    pub y: i32,
    /// Activation window, half-open `[start, end)`
    pub interval: TimeRange,
}

impl OverlayEvent {
    /// Returns true if the overlay is visible at the given time
    pub fn is_active_at(&self, time: TimeSec) -> bool {
        self.interval.contains(time)
    }
}

// =============================================================================
// Composition Timeline
// =============================================================================

/// Ordered collection of overlay events for a single output video
#[derive(Debug)]
pub struct CompositionTimeline {
    video_width: u32,
    video_height: u32,
    duration_sec: TimeSec,
    events: Vec<OverlayEvent>,
}

impl CompositionTimeline {
    pub fn new(video_width: u32, video_height: u32, duration_sec: TimeSec) -> Self {
        Self {
            video_width,
            video_height,
            duration_sec,
            events: Vec::new(),
        }
    }

    /// Appends a rendered caption, centering it horizontally.
    ///
    /// Push order is paint order during encoding.
    pub fn push(&mut self, caption: RenderedCaption) {
        let x = crate::captions::position::center_x(self.video_width, caption.width());
        self.events.push(OverlayEvent {
            image: caption.image,
            x,
            y: caption.y_offset,
            interval: caption.interval,
        });
    }

    /// Overlay events in paint order
    pub fn events(&self) -> &[OverlayEvent] {
        &self.events
    }

    /// Consumes the timeline, yielding the events in paint order
    pub fn into_events(self) -> Vec<OverlayEvent> {
        self.events
    }

    /// Events visible at the given time, still in paint order
    pub fn active_at(&self, time: TimeSec) -> impl Iterator<Item = &OverlayEvent> {
        self.events.iter().filter(move |e| e.is_active_at(time))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn video_width(&self) -> u32 {
        self.video_width
    }

    pub fn video_height(&self) -> u32 {
        self.video_height
    }

    pub fn duration_sec(&self) -> TimeSec {
        self.duration_sec
    }
}

// =============================================================================
// Tests
// =============================================================================
