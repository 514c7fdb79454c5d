//! Caption data models
//!
//! Defines transcript segments, per-word timings, and the caption style
//! used by the layout and raster stages.

use crate::error::{RenderError, RenderResult};
use crate::types::TimeSec;
use serde::{Deserialize, Serialize};

// =============================================================================
// Style Bounds
// =============================================================================

/// Minimum allowed font size in pixels
pub const MIN_FONT_SIZE: u32 = 8;
/// Maximum allowed font size in pixels
pub const MAX_FONT_SIZE: u32 = 72;
/// Maximum allowed stroke width in pixels
pub const MAX_STROKE_WIDTH: u32 = 10;
/// Maximum allowed padding in pixels
pub const MAX_PADDING: u32 = 50;

// =============================================================================
// Vertical Position
// =============================================================================

/// Vertical placement of a caption within the video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalPosition {
    Top,
    Center,
    #[default]
    Bottom,
}

impl VerticalPosition {
    /// Parses a position name. Unrecognized names resolve to `Bottom`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "top" => Self::Top,
            "center" => Self::Center,
            _ => Self::Bottom,
        }
    }
}

// =============================================================================
// Caption Style
// =============================================================================

/// Visual style for rendered captions.
///
/// Numeric fields are bounded: `font_size` in `[8, 72]`, `stroke_width` in
/// `[0, 10]`, `padding` in `[0, 50]`. Construction through [`CaptionStyle::new`]
/// or a call to [`CaptionStyle::validate`] rejects out-of-range values before
/// any rendering starts. Colors are hex strings and fail soft at raster time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionStyle {
    /// Font family name (e.g., "Arial")
    pub font_family: String,
    /// Font size in pixels
    pub font_size: u32,
    /// Text fill color as a hex string
    pub font_color: String,
    /// Outline color as a hex string
    pub stroke_color: String,
    /// Outline thickness in pixels; 0 disables the outline pass
    pub stroke_width: u32,
    /// Padding around the caption block in pixels
    pub padding: u32,
    /// Vertical placement within the frame
    #[serde(default)]
    pub position: VerticalPosition,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: 24,
            font_color: "#FFFFFF".to_string(),
            stroke_color: "#000000".to_string(),
            stroke_width: 2,
            padding: 10,
            position: VerticalPosition::Bottom,
        }
    }
}

impl CaptionStyle {
    /// Creates a validated style. Returns `InvalidStyle` if any numeric
    /// field is out of range.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        font_family: impl Into<String>,
        font_size: u32,
        font_color: impl Into<String>,
        stroke_color: impl Into<String>,
        stroke_width: u32,
        padding: u32,
        position: VerticalPosition,
    ) -> RenderResult<Self> {
        let style = Self {
            font_family: font_family.into(),
            font_size,
            font_color: font_color.into(),
            stroke_color: stroke_color.into(),
            stroke_width,
            padding,
            position,
        };
        style.validate()?;
        Ok(style)
    }

    /// Checks all numeric bounds. Deserialized styles must pass through
    /// here before rendering.
    pub fn validate(&self) -> RenderResult<()> {
        if self.font_size < MIN_FONT_SIZE || self.font_size > MAX_FONT_SIZE {
            return Err(RenderError::InvalidStyle(format!(
                "font_size {} out of range [{}, {}]",
                self.font_size, MIN_FONT_SIZE, MAX_FONT_SIZE
            )));
        }
        if self.stroke_width > MAX_STROKE_WIDTH {
            return Err(RenderError::InvalidStyle(format!(
                "stroke_width {} out of range [0, {}]",
                self.stroke_width, MAX_STROKE_WIDTH
            )));
        }
        if self.padding > MAX_PADDING {
            return Err(RenderError::InvalidStyle(format!(
                "padding {} out of range [0, {}]",
                self.padding, MAX_PADDING
            )));
        }
        Ok(())
    }

    /// Sets the font family (builder pattern)
    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    /// Sets the font size (builder pattern)
    pub fn with_font_size(mut self, size: u32) -> Self {
        self.font_size = size;
        self
    }

    /// Sets the fill color (builder pattern)
    pub fn with_font_color(mut self, color: impl Into<String>) -> Self {
        self.font_color = color.into();
        self
    }

    /// Sets the stroke color (builder pattern)
    pub fn with_stroke_color(mut self, color: impl Into<String>) -> Self {
        self.stroke_color = color.into();
        self
    }

    /// Sets the stroke width (builder pattern)
    pub fn with_stroke_width(mut self, width: u32) -> Self {
        self.stroke_width = width;
        self
    }

    /// Sets the padding (builder pattern)
    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    /// Sets the vertical position (builder pattern)
    pub fn with_position(mut self, position: VerticalPosition) -> Self {
        self.position = position;
        self
    }
}

// =============================================================================
// Caption Segment
// =============================================================================

/// A single timed span of transcript text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionSegment {
    /// Start time in seconds
    pub start_time: TimeSec,
    /// End time in seconds (exclusive)
    pub end_time: TimeSec,
    /// Caption text content
    pub text: String,
    /// Optional transcription confidence (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl CaptionSegment {
    /// Creates a new caption segment
    pub fn new(start_time: TimeSec, end_time: TimeSec, text: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time,
            text: text.into(),
            confidence: None,
        }
    }

    /// Duration of the segment in seconds
    pub fn duration(&self) -> TimeSec {
        self.end_time - self.start_time
    }

    /// Returns true if the segment is visible at the given time (`[start, end)`)
    pub fn is_visible_at(&self, time: TimeSec) -> bool {
        time >= self.start_time && time < self.end_time
    }

    /// Checks structural validity: a positive time span and non-empty text.
    pub fn check(&self) -> Result<(), String> {
        if self.end_time <= self.start_time {
            return Err(format!(
                "end_time {} must be greater than start_time {}",
                self.end_time, self.start_time
            ));
        }
        if self.text.trim().is_empty() {
            return Err("text is empty".to_string());
        }
        Ok(())
    }

    /// Sets the confidence score (builder pattern)
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Validates a batch of segments. Any malformed segment fails the whole
/// batch with the index of the first offender.
pub fn validate_segments(segments: &[CaptionSegment]) -> RenderResult<()> {
    for (index, segment) in segments.iter().enumerate() {
        if let Err(reason) = segment.check() {
            return Err(RenderError::MalformedSegment { index, reason });
        }
    }
    Ok(())
}

// =============================================================================
// Word Timing
// =============================================================================

/// A single word with its interpolated time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordTiming {
    /// The word text
    pub word: String,
    /// Start time in seconds
    pub start: TimeSec,
    /// End time in seconds (exclusive)
    pub end: TimeSec,
}

impl WordTiming {
    pub fn new(word: impl Into<String>, start: TimeSec, end: TimeSec) -> Self {
        Self {
            word: word.into(),
            start,
            end,
        }
    }

    /// Duration of the word window in seconds
    pub fn duration(&self) -> TimeSec {
        self.end - self.start
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Style Validation Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_default_style_is_valid() {
        let style = CaptionStyle::default();
        assert!(style.validate().is_ok());
        assert_eq!(style.font_family, "Arial");
        assert_eq!(style.font_size, 24);
        assert_eq!(style.font_color, "#FFFFFF");
        assert_eq!(style.stroke_color, "#000000");
        assert_eq!(style.stroke_width, 2);
        assert_eq!(style.padding, 10);
        assert_eq!(style.position, VerticalPosition::Bottom);
    }

    #[test]
    fn test_font_size_out_of_range() {
        let result = CaptionStyle::new(
            "Arial",
            100,
            "#FFFFFF",
            "#000000",
            2,
            10,
            VerticalPosition::Bottom,
        );
        assert!(matches!(result, Err(RenderError::InvalidStyle(_))));

        let result = CaptionStyle::new(
            "Arial",
            7,
            "#FFFFFF",
            "#000000",
            2,
            10,
            VerticalPosition::Bottom,
        );
        assert!(matches!(result, Err(RenderError::InvalidStyle(_))));
    }

    #[test]
    fn test_font_size_boundaries() {
        for size in [MIN_FONT_SIZE, MAX_FONT_SIZE] {
            let style = CaptionStyle::default().with_font_size(size);
            assert!(style.validate().is_ok());
        }
    }

    #[test]
    fn test_stroke_width_out_of_range() {
        let result = CaptionStyle::new(
            "Arial",
            24,
            "#FFFFFF",
            "#000000",
            15,
            10,
            VerticalPosition::Bottom,
        );
        assert!(matches!(result, Err(RenderError::InvalidStyle(_))));

        let style = CaptionStyle::default().with_stroke_width(0);
        assert!(style.validate().is_ok());
        let style = CaptionStyle::default().with_stroke_width(MAX_STROKE_WIDTH);
        assert!(style.validate().is_ok());
    }

    #[test]
    fn test_padding_out_of_range() {
        let style = CaptionStyle::default().with_padding(51);
        assert!(style.validate().is_err());
        let style = CaptionStyle::default().with_padding(MAX_PADDING);
        assert!(style.validate().is_ok());
        let style = CaptionStyle::default().with_padding(0);
        assert!(style.validate().is_ok());
    }

    #[test]
    fn test_style_builder() {
        let style = CaptionStyle::default()
            .with_font_family("Helvetica")
            .with_font_color("#FF0000")
            .with_position(VerticalPosition::Top);
        assert_eq!(style.font_family, "Helvetica");
        assert_eq!(style.font_color, "#FF0000");
        assert_eq!(style.position, VerticalPosition::Top);
    }

    // -------------------------------------------------------------------------
    // Position Parsing Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_position_parse() {
        assert_eq!(VerticalPosition::parse("top"), VerticalPosition::Top);
        assert_eq!(VerticalPosition::parse("Center"), VerticalPosition::Center);
        assert_eq!(VerticalPosition::parse("bottom"), VerticalPosition::Bottom);
        // unrecognized values default to bottom
        assert_eq!(VerticalPosition::parse("middle"), VerticalPosition::Bottom);
        assert_eq!(VerticalPosition::parse(""), VerticalPosition::Bottom);
    }

    #[test]
    fn test_position_serde() {
        let json = serde_json::to_string(&VerticalPosition::Top).unwrap();
        assert_eq!(json, "\"top\"");
        let pos: VerticalPosition = serde_json::from_str("\"center\"").unwrap();
        assert_eq!(pos, VerticalPosition::Center);
    }

    // -------------------------------------------------------------------------
    // Segment Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_segment_creation() {
        let segment = CaptionSegment::new(1.0, 3.5, "Hello world");
        assert_eq!(segment.duration(), 2.5);
        assert_eq!(segment.text, "Hello world");
        assert!(segment.confidence.is_none());
    }

    #[test]
    fn test_segment_visibility_half_open() {
        let segment = CaptionSegment::new(1.0, 3.0, "Hello");
        assert!(!segment.is_visible_at(0.5));
        assert!(segment.is_visible_at(1.0));
        assert!(segment.is_visible_at(2.9));
        assert!(!segment.is_visible_at(3.0));
    }

    #[test]
    fn test_segment_check() {
        assert!(CaptionSegment::new(0.0, 1.0, "ok").check().is_ok());
        assert!(CaptionSegment::new(1.0, 1.0, "zero span").check().is_err());
        assert!(CaptionSegment::new(2.0, 1.0, "reversed").check().is_err());
        assert!(CaptionSegment::new(0.0, 1.0, "   ").check().is_err());
        assert!(CaptionSegment::new(0.0, 1.0, "").check().is_err());
    }

    #[test]
    fn test_validate_segments_reports_index() {
        let segments = vec![
            CaptionSegment::new(0.0, 1.0, "fine"),
            CaptionSegment::new(1.0, 2.0, "also fine"),
            CaptionSegment::new(3.0, 2.0, "reversed"),
        ];
        match validate_segments(&segments) {
            Err(RenderError::MalformedSegment { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected MalformedSegment, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_validate_segments_empty_is_ok() {
        assert!(validate_segments(&[]).is_ok());
    }

    #[test]
    fn test_segment_serde_camel_case() {
        let segment = CaptionSegment::new(0.5, 2.0, "Hi").with_confidence(0.98);
        let json = serde_json::to_string(&segment).unwrap();
        assert!(json.contains("\"startTime\":0.5"));
        assert!(json.contains("\"endTime\":2.0"));
        assert!(json.contains("\"confidence\":0.98"));

        let parsed: CaptionSegment = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, segment);
    }

    // -------------------------------------------------------------------------
    // Word Timing Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_word_timing() {
        let timing = WordTiming::new("hello", 1.0, 1.5);
        assert_eq!(timing.word, "hello");
        assert_eq!(timing.duration(), 0.5);
    }
}
