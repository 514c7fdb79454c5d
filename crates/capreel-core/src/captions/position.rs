//! Vertical caption placement
//!
//! Maps a position mode to a pixel y offset within the video frame.
//! Results are not clamped: a caption taller than the frame yields a
//! negative offset and the encoder crops whatever falls outside.

use crate::captions::models::VerticalPosition;

/// Resolves the y offset for a caption of `caption_height` pixels inside
/// a frame of `video_height` pixels.
///
/// `Top` sits at `padding`, `Center` at `(video_height - caption_height) / 2`
/// rounded toward negative infinity, `Bottom` at
/// `video_height - caption_height - padding`.
pub fn resolve_y(
    video_height: u32,
    caption_height: u32,
    position: VerticalPosition,
    padding: u32,
) -> i32 {
    let video_height = video_height as i64;
    let caption_height = caption_height as i64;
    let padding = padding as i64;

    let y = match position {
        VerticalPosition::Top => padding,
        VerticalPosition::Center => (video_height - caption_height).div_euclid(2),
        VerticalPosition::Bottom => video_height - caption_height - padding,
    };
    y as i32
}

/// Resolves the x offset that horizontally centers a caption of
/// `caption_width` pixels, rounded toward negative infinity.
pub fn center_x(video_width: u32, caption_width: u32) -> i32 {
    (video_width as i64 - caption_width as i64).div_euclid(2) as i32
}
