//! Caption System Module
//!
//! Provides caption synthesis for capreel including:
//! - Caption data models (CaptionSegment, CaptionStyle, WordTiming)
//! - JSON, SRT, and VTT transcript parsing and export
//! - Greedy line wrapping against a pixel width limit
//! - Rasterization of styled text to transparent RGBA bitmaps
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Caption System                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  models.rs     - Data structures (Segment, Style, WordTiming)   │
//! │  formats.rs    - JSON/SRT/VTT parsing and export                │
//! │  timing.rs     - Even per-word timing splits                    │
//! │  layout.rs     - Greedy wrapping against the width limit        │
//! │  position.rs   - Vertical anchor and centering math             │
//! │  raster.rs     - Text to RGBA bitmaps, outline and highlight    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod formats;
pub mod layout;
pub mod models;
pub mod position;
pub mod raster;
pub mod timing;

// Re-export models
pub use models::{
    validate_segments, CaptionSegment, CaptionStyle, VerticalPosition, WordTiming,
};

// Re-export format functions
pub use formats::{
    export_srt, export_vtt, parse_srt, parse_transcript, parse_vtt, ParseError, TranscriptFormat,
};

// Re-export pipeline building blocks
pub use raster::{CaptionRasterizer, RenderedCaption};
pub use timing::{split_segment, split_segments};
