//! Capreel Core Engine
//!
//! Caption synthesis and timed-composition engine.
//! Turns transcript segments into styled, word-timed caption overlays
//! and burns them into video through FFmpeg.
//!
//! # Pipeline
//!
//! ```text
//! transcript ──> segments ──> word timing ──> layout ──> raster
//!                                                          │
//! source video ──> probe ──────> composition timeline <────┘
//!                                       │
//!                                    encode ──> output video
//! ```

pub mod captions;
pub mod encode;
pub mod fonts;
pub mod jobs;
pub mod render;
pub mod timeline;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
