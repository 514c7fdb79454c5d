//! Core Type Definitions
//!
//! Shared primitive types used across the caption pipeline.

use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// Type Aliases
// =============================================================================

/// Time in seconds
pub type TimeSec = f64;

/// Unique identifier for a render job (ULID string)
pub type JobId = String;

// =============================================================================
// Color
// =============================================================================

/// Opaque RGB color value (0-255 for each component)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Creates a new color from RGB components
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// White color (the soft-fallback default)
    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Black color
    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }

    /// Yellow color (common for word highlights)
    pub fn yellow() -> Self {
        Self::new(255, 255, 0)
    }

    /// Parses a 6-digit hex color string, with or without a leading `#`.
    ///
    /// Returns `None` for anything that is not exactly six hex digits.
    pub fn try_from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().strip_prefix('#').unwrap_or(hex.trim());

        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

        Some(Self::new(r, g, b))
    }

    /// Parses a hex color string, falling back to white on malformed input.
    ///
    /// The fallback never raises: a bad color yields a readable caption
    /// instead of a failed job.
    pub fn from_hex(hex: &str) -> Self {
        match Self::try_from_hex(hex) {
            Some(color) => color,
            None => {
                warn!("Invalid hex color '{}', falling back to white", hex);
                Self::white()
            }
        }
    }

    /// Converts to hex string (e.g., "#FFFFFF")
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::white()
    }
}

// =============================================================================
// Time Range
// =============================================================================

/// A time range in seconds, half-open: `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    /// Start time in seconds
    pub start: TimeSec,
    /// End time in seconds (exclusive)
    pub end: TimeSec,
}

impl TimeRange {
    /// Creates a new time range. Swaps start/end if reversed.
    pub fn new(start: TimeSec, end: TimeSec) -> Self {
        if start > end {
            warn!("TimeRange created with start > end, swapping: {start} > {end}");
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// Duration of the range in seconds
    pub fn duration(&self) -> TimeSec {
        self.end - self.start
    }

    /// Returns true if the given time falls within `[start, end)`
    pub fn contains(&self, time: TimeSec) -> bool {
        time >= self.start && time < self.end
    }

    /// Returns true if this range overlaps another
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }
}

// =============================================================================
// Tests
// =============================================================================
