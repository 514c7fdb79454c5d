//! Caption rasterization
//!
//! # Overview
//!
//! Draws styled caption text onto transparent RGBA bitmaps sized to the
//! video width. Two modes are supported:
//!
//! - [`CaptionRasterizer::render`]: every line centered, uniform fill
//! - [`CaptionRasterizer::render_highlighted`]: word-by-word drawing with
//!   one word in a highlight color, lines starting at the padding edge
//!
//! The outline is built by stamping the glyph run at every integer offset
//! `(dx, dy)` with `dx^2 + dy^2 <= stroke_width^2` in the stroke color,
//! then drawing the fill run on top. Rendering the same text with a warm
//! font cache is deterministic down to the byte.

use crate::captions::layout::{self, line_height, max_caption_width};
use crate::captions::models::CaptionStyle;
use crate::captions::position::center_x;
use crate::error::RenderResult;
use crate::fonts::{FontFace, FontLibrary};
use crate::types::{Rgb, TimeRange};
use image::{Rgba, RgbaImage};
use std::sync::Arc;
use tracing::debug;

/// Pixels of spacing appended after each word in highlight mode
const WORD_GAP: i32 = 4;

// =============================================================================
// Rendered Caption
// =============================================================================

/// A rasterized caption bitmap with its placement and activation window
pub struct RenderedCaption {
    /// Transparent RGBA bitmap, full video width
    pub image: RgbaImage,
    /// Vertical offset within the video frame (may be negative)
    pub y_offset: i32,
    /// Time window during which the caption is visible
    pub interval: TimeRange,
}

impl RenderedCaption {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

// =============================================================================
// Caption Rasterizer
// =============================================================================

/// Renders caption text to RGBA bitmaps using cached font faces
pub struct CaptionRasterizer {
    fonts: Arc<FontLibrary>,
}

impl CaptionRasterizer {
    pub fn new(fonts: Arc<FontLibrary>) -> Self {
        Self { fonts }
    }

    /// Renders wrapped caption text with every line centered horizontally.
    ///
    /// The bitmap spans the full video width; its height is
    /// `lines * (font_size + 4) + 2 * padding`.
    pub fn render(
        &self,
        text: &str,
        style: &CaptionStyle,
        video_width: u32,
    ) -> RenderResult<RgbaImage> {
        let face = self.fonts.sized(&style.font_family, style.font_size)?;
        Ok(render_with_face(face.as_ref(), text, style, video_width))
    }

    /// Renders caption text with one word drawn in `highlight` color.
    ///
    /// Lines start at the padding edge rather than being centered, and
    /// every word whose text equals `highlight_word` (ignoring case) is
    /// highlighted. A highlighted word keeps the base fill color for its
    /// outline pass while all other words use the configured stroke color.
    pub fn render_highlighted(
        &self,
        text: &str,
        highlight_word: &str,
        style: &CaptionStyle,
        video_width: u32,
        highlight: Rgb,
    ) -> RenderResult<RgbaImage> {
        let face = self.fonts.sized(&style.font_family, style.font_size)?;
        Ok(render_highlighted_with_face(
            face.as_ref(),
            text,
            highlight_word,
            style,
            video_width,
            highlight,
        ))
    }
}

/// Plain-mode drawing against an already resolved face
fn render_with_face(
    face: &dyn FontFace,
    text: &str,
    style: &CaptionStyle,
    video_width: u32,
) -> RgbaImage {
    let fill = Rgb::from_hex(&style.font_color);
    let stroke = Rgb::from_hex(&style.stroke_color);

    let lines = layout::wrap(text, face, max_caption_width(video_width));
    let mut canvas = new_canvas(video_width, lines.len(), style);
    debug!(
        "Rasterizing caption: {} line(s), {}x{}",
        lines.len(),
        canvas.width(),
        canvas.height()
    );

    let row_height = line_height(style.font_size) as i32;
    for (i, line) in lines.iter().enumerate() {
        let x = center_x(video_width, face.text_width(line));
        let y = style.padding as i32 + i as i32 * row_height;
        draw_outlined_run(
            &mut canvas,
            face,
            line,
            x,
            y,
            fill,
            stroke,
            style.stroke_width,
        );
    }

    canvas
}

/// Highlight-mode drawing against an already resolved face
fn render_highlighted_with_face(
    face: &dyn FontFace,
    text: &str,
    highlight_word: &str,
    style: &CaptionStyle,
    video_width: u32,
    highlight: Rgb,
) -> RgbaImage {
    let fill = Rgb::from_hex(&style.font_color);
    let stroke = Rgb::from_hex(&style.stroke_color);
    let needle = highlight_word.to_lowercase();

    let lines = layout::wrap(text, face, max_caption_width(video_width));
    let mut canvas = new_canvas(video_width, lines.len(), style);

    let row_height = line_height(style.font_size) as i32;
    let mut y = style.padding as i32;
    for line in &lines {
        let mut x = style.padding as i32;
        for word in line.split_whitespace() {
            let word_color = if word.to_lowercase() == needle {
                highlight
            } else {
                fill
            };
            // a highlighted word swaps to the base fill for its outline
            let outline_color = if word_color == fill { stroke } else { fill };

            draw_outlined_run(
                &mut canvas,
                face,
                word,
                x,
                y,
                word_color,
                outline_color,
                style.stroke_width,
            );
            x += face.text_width(word) as i32 + WORD_GAP;
        }
        y += row_height;
    }

    canvas
}

/// Transparent canvas sized for `line_count` caption lines
fn new_canvas(video_width: u32, line_count: usize, style: &CaptionStyle) -> RgbaImage {
    let height = line_count as u32 * line_height(style.font_size) + 2 * style.padding;
    RgbaImage::new(video_width, height.max(1))
}

// =============================================================================
// Glyph Drawing
// =============================================================================

/// Integer offsets within a disc of the given radius, `(0, 0)` included
fn stroke_offsets(stroke_width: u32) -> Vec<(i32, i32)> {
    let w = stroke_width as i32;
    let mut offsets = Vec::new();
    for dx in -w..=w {
        for dy in -w..=w {
            if dx * dx + dy * dy <= w * w {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

/// Draws a text run with its outline: the run is stamped in the outline
/// color at every disc offset, then once in the fill color on top. A
/// stroke width of 0 skips the outline pass entirely.
#[allow(clippy::too_many_arguments)]
fn draw_outlined_run(
    canvas: &mut RgbaImage,
    face: &dyn FontFace,
    text: &str,
    x: i32,
    y_top: i32,
    fill: Rgb,
    outline: Rgb,
    stroke_width: u32,
) {
    if stroke_width > 0 {
        for (dx, dy) in stroke_offsets(stroke_width) {
            draw_run(canvas, face, text, x + dx, y_top + dy, outline);
        }
    }
    draw_run(canvas, face, text, x, y_top, fill);
}

/// Draws a single text run with its baseline at `y_top + ascent`.
///
/// Pixels outside the canvas are dropped; the caller may pass negative
/// coordinates.
fn draw_run(
    canvas: &mut RgbaImage,
    face: &dyn FontFace,
    text: &str,
    x: i32,
    y_top: i32,
    color: Rgb,
) {
    let baseline = y_top + face.ascent();
    let mut cursor = x;

    for ch in text.chars() {
        let glyph = face.rasterize(ch);
        let glyph_x = cursor + glyph.xmin;
        let glyph_y = baseline - (glyph.height as i32 + glyph.ymin);

        for row in 0..glyph.height {
            for col in 0..glyph.width {
                let coverage = glyph.coverage[row * glyph.width + col];
                if coverage == 0 {
                    continue;
                }
                let px = glyph_x + col as i32;
                let py = glyph_y + row as i32;
                if px < 0 || py < 0 || px >= canvas.width() as i32 || py >= canvas.height() as i32 {
                    continue;
                }
                blend_pixel(canvas, px as u32, py as u32, color, coverage);
            }
        }

        cursor += glyph.advance;
    }
}

/// Source-over blend of `color` at `alpha` onto the canvas pixel
fn blend_pixel(canvas: &mut RgbaImage, x: u32, y: u32, color: Rgb, alpha: u8) {
    let dst = canvas.get_pixel_mut(x, y);
    let src_a = alpha as f32 / 255.0;
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }

    let src = [color.r as f32, color.g as f32, color.b as f32];
    for i in 0..3 {
        let blended = (src[i] * src_a + dst[i] as f32 * dst_a * (1.0 - src_a)) / out_a;
        dst[i] = blended.round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::models::VerticalPosition;
    use crate::fonts::GlyphBitmap;

    /// Synthetic face: each glyph is a solid block, fully deterministic.
    ///
    /// Non-space characters render as an 8x10 opaque rectangle with a
    /// 10px advance; spaces advance without ink.
    struct BlockFace;

    const BLOCK_W: usize = 8;
    const BLOCK_H: usize = 10;
    const ADVANCE: i32 = 10;

    impl FontFace for BlockFace {
        fn ascent(&self) -> i32 {
            BLOCK_H as i32
        }
        fn advance(&self, _ch: char) -> i32 {
            ADVANCE
        }
        fn rasterize(&self, ch: char) -> GlyphBitmap {
            if ch == ' ' {
                return GlyphBitmap {
                    width: 0,
                    height: 0,
                    xmin: 0,
                    ymin: 0,
                    advance: ADVANCE,
                    coverage: Vec::new(),
                };
            }
            GlyphBitmap {
                width: BLOCK_W,
                height: BLOCK_H,
                xmin: 0,
                ymin: 0,
                advance: ADVANCE,
                coverage: vec![255; BLOCK_W * BLOCK_H],
            }
        }
    }

    fn pixel(canvas: &RgbaImage, x: u32, y: u32) -> [u8; 4] {
        canvas.get_pixel(x, y).0
    }

    fn block_style() -> CaptionStyle {
        CaptionStyle {
            font_family: "Block".to_string(),
            font_size: 24,
            font_color: "#FFFFFF".to_string(),
            stroke_color: "#000000".to_string(),
            stroke_width: 0,
            padding: 10,
            position: VerticalPosition::Bottom,
        }
    }

    // -------------------------------------------------------------------------
    // Stroke Offset Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_stroke_offsets_form_disc() {
        let offsets = stroke_offsets(2);
        assert!(offsets.contains(&(0, 0)));
        assert!(offsets.contains(&(2, 0)));
        assert!(offsets.contains(&(0, -2)));
        assert!(offsets.contains(&(1, 1)));
        // corners of the square are outside the disc
        assert!(!offsets.contains(&(2, 2)));
        assert!(!offsets.contains(&(-2, 2)));
        for (dx, dy) in &offsets {
            assert!(dx * dx + dy * dy <= 4);
        }
    }

    #[test]
    fn test_stroke_offsets_zero_width() {
        assert_eq!(stroke_offsets(0), vec![(0, 0)]);
    }

    // -------------------------------------------------------------------------
    // Drawing Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_draw_run_places_ink_below_line_top() {
        let mut canvas = RgbaImage::new(60, 30);
        draw_run(&mut canvas, &BlockFace, "ab", 5, 3, Rgb::new(255, 0, 0));

        // block glyphs span y = 3..13 (baseline at 3 + ascent 10)
        assert_eq!(pixel(&canvas, 5, 3), [255, 0, 0, 255]);
        assert_eq!(pixel(&canvas, 5, 12), [255, 0, 0, 255]);
        assert_eq!(pixel(&canvas, 5, 13), [0, 0, 0, 0]);
        // second glyph starts one advance later
        assert_eq!(pixel(&canvas, 15, 3), [255, 0, 0, 255]);
        // gap between glyph ink (block is 8 wide, advance 10)
        assert_eq!(pixel(&canvas, 13, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn test_draw_run_clips_out_of_bounds() {
        let mut canvas = RgbaImage::new(10, 10);
        // partially off every edge; must not panic
        draw_run(&mut canvas, &BlockFace, "x", -4, -4, Rgb::white());
        draw_run(&mut canvas, &BlockFace, "x", 8, 8, Rgb::white());
        assert_eq!(pixel(&canvas, 0, 0), [255, 255, 255, 255]);
        assert_eq!(pixel(&canvas, 9, 9), [255, 255, 255, 255]);
    }

    #[test]
    fn test_blend_over_transparent_takes_source() {
        let mut canvas = RgbaImage::new(2, 2);
        blend_pixel(&mut canvas, 0, 0, Rgb::new(10, 20, 30), 255);
        assert_eq!(pixel(&canvas, 0, 0), [10, 20, 30, 255]);
    }

    #[test]
    fn test_blend_opaque_over_opaque_replaces() {
        let mut canvas = RgbaImage::new(2, 2);
        blend_pixel(&mut canvas, 0, 0, Rgb::new(0, 0, 0), 255);
        blend_pixel(&mut canvas, 0, 0, Rgb::new(255, 255, 255), 255);
        assert_eq!(pixel(&canvas, 0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_blend_partial_coverage_mixes() {
        let mut canvas = RgbaImage::new(2, 2);
        blend_pixel(&mut canvas, 0, 0, Rgb::new(0, 0, 0), 255);
        blend_pixel(&mut canvas, 0, 0, Rgb::new(255, 255, 255), 128);
        let px = pixel(&canvas, 0, 0);
        assert_eq!(px[3], 255);
        assert!(px[0] > 100 && px[0] < 160, "got {}", px[0]);
    }

    // -------------------------------------------------------------------------
    // Canvas Geometry Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_canvas_height_formula() {
        let style = block_style();
        let canvas = new_canvas(640, 2, &style);
        // 2 lines * (24 + 4) + 2 * 10
        assert_eq!(canvas.width(), 640);
        assert_eq!(canvas.height(), 76);
    }

    #[test]
    fn test_canvas_never_zero_height() {
        let style = block_style().with_padding(0);
        let canvas = new_canvas(640, 0, &style);
        assert_eq!(canvas.height(), 1);
    }

    #[test]
    fn test_render_fails_without_usable_font() {
        let rasterizer =
            CaptionRasterizer::new(Arc::new(FontLibrary::with_search_dirs(Vec::new())));
        let result = rasterizer.render("Hello", &block_style(), 640);
        assert!(result.is_err());
    }

    // -------------------------------------------------------------------------
    // Plain Mode Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_render_centers_each_line() {
        let style = block_style();
        let canvas = render_with_face(&BlockFace, "a", &style, 200);

        // one 10px-advance glyph in 200px: x = (200 - 10) / 2 = 95
        // ink spans x 95..103, y 10..20
        assert_eq!(pixel(&canvas, 95, 10), [255, 255, 255, 255]);
        assert_eq!(pixel(&canvas, 94, 10), [0, 0, 0, 0]);
        assert_eq!(pixel(&canvas, 102, 19), [255, 255, 255, 255]);
    }

    #[test]
    fn test_render_long_text_wraps_to_multiple_lines() {
        // max width = 0.8 * 200 = 160 = 16 chars; this text cannot fit one line
        let style = block_style();
        let canvas = render_with_face(
            &BlockFace,
            "hello wrapping caption text",
            &style,
            200,
        );

        // 2 lines: "hello wrapping" (14 chars), "caption text" (12 chars)
        assert_eq!(canvas.height(), 2 * 28 + 20);
        // first line at y 10..20, second at y 38..48
        // line 1: width 140, x = 30; line 2: width 120, x = 40
        assert_eq!(pixel(&canvas, 30, 10), [255, 255, 255, 255]);
        assert_eq!(pixel(&canvas, 40, 38), [255, 255, 255, 255]);
    }

    #[test]
    fn test_outline_surrounds_fill() {
        let style = block_style()
            .with_font_color("#FF0000")
            .with_stroke_color("#0000FF")
            .with_stroke_width(2);
        let canvas = render_with_face(&BlockFace, "a", &style, 200);

        // glyph ink spans x 95..103, y 10..20
        assert_eq!(pixel(&canvas, 95, 10), [255, 0, 0, 255]);
        // left of the ink: stroke color from the (-2, 0) stamp
        assert_eq!(pixel(&canvas, 93, 10), [0, 0, 255, 255]);
        // above the ink: stroke color from the (0, -2) stamp
        assert_eq!(pixel(&canvas, 95, 8), [0, 0, 255, 255]);
        // outside the disc radius: untouched
        assert_eq!(pixel(&canvas, 90, 10), [0, 0, 0, 0]);
    }

    #[test]
    fn test_zero_stroke_width_skips_outline() {
        let style = block_style()
            .with_font_color("#FF0000")
            .with_stroke_color("#0000FF")
            .with_stroke_width(0);
        let canvas = render_with_face(&BlockFace, "a", &style, 200);

        assert_eq!(pixel(&canvas, 95, 10), [255, 0, 0, 255]);
        // no stroke pixels anywhere around the glyph
        assert_eq!(pixel(&canvas, 93, 10), [0, 0, 0, 0]);
        assert_eq!(pixel(&canvas, 95, 8), [0, 0, 0, 0]);
    }

    #[test]
    fn test_malformed_colors_fall_back_to_white() {
        let style = block_style().with_font_color("nonsense");
        let canvas = render_with_face(&BlockFace, "a", &style, 200);
        assert_eq!(pixel(&canvas, 95, 10), [255, 255, 255, 255]);
    }

    // -------------------------------------------------------------------------
    // Highlight Mode Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_highlight_colors_target_word_case_insensitive() {
        let style = block_style();
        let canvas = render_highlighted_with_face(
            &BlockFace,
            "Hello WORLD",
            "world",
            &style,
            400,
            Rgb::yellow(),
        );

        // "Hello" starts at x = padding = 10, width 5 * 10 = 50
        assert_eq!(pixel(&canvas, 10, 10), [255, 255, 255, 255]);
        // "WORLD" starts at 10 + 50 + 4 = 64
        assert_eq!(pixel(&canvas, 64, 10), [255, 255, 0, 255]);
    }

    #[test]
    fn test_highlight_lines_start_at_padding_not_centered() {
        let style = block_style();
        let canvas =
            render_highlighted_with_face(&BlockFace, "hi", "", &style, 400, Rgb::yellow());
        // plain mode would center this at x = (400 - 20) / 2 = 190
        assert_eq!(pixel(&canvas, 10, 10), [255, 255, 255, 255]);
        assert_eq!(pixel(&canvas, 190, 10), [0, 0, 0, 0]);
    }

    #[test]
    fn test_highlight_outline_inversion() {
        let style = block_style()
            .with_font_color("#FF0000")
            .with_stroke_color("#0000FF")
            .with_stroke_width(1);
        let canvas = render_highlighted_with_face(
            &BlockFace,
            "one two",
            "two",
            &style,
            400,
            Rgb::yellow(),
        );

        // "one": fill red, outline blue (configured stroke)
        assert_eq!(pixel(&canvas, 10, 10), [255, 0, 0, 255]);
        assert_eq!(pixel(&canvas, 9, 10), [0, 0, 255, 255]);

        // "two" starts at 10 + 30 + 4 = 44: fill yellow, outline takes the
        // base fill color instead of the stroke color
        assert_eq!(pixel(&canvas, 44, 10), [255, 255, 0, 255]);
        assert_eq!(pixel(&canvas, 43, 10), [255, 0, 0, 255]);
    }

    #[test]
    fn test_highlight_matches_repeated_words() {
        let style = block_style();
        let canvas = render_highlighted_with_face(
            &BlockFace,
            "go go go",
            "go",
            &style,
            400,
            Rgb::yellow(),
        );

        // every occurrence highlights: x = 10, 34, 58
        for x in [10u32, 34, 58] {
            assert_eq!(pixel(&canvas, x, 10), [255, 255, 0, 255]);
        }
    }

    #[test]
    fn test_highlight_equal_to_fill_keeps_stroke() {
        // highlight equal to the fill color: the inversion comparison sees
        // the word as base-colored and keeps the configured stroke
        let style = block_style()
            .with_font_color("#FFFF00")
            .with_stroke_color("#0000FF")
            .with_stroke_width(1);
        let canvas =
            render_highlighted_with_face(&BlockFace, "word", "word", &style, 400, Rgb::yellow());

        assert_eq!(pixel(&canvas, 10, 10), [255, 255, 0, 255]);
        assert_eq!(pixel(&canvas, 9, 10), [0, 0, 255, 255]);
    }

    #[test]
    fn test_warm_draw_is_deterministic() {
        let style = block_style().with_stroke_width(2);
        let first = render_with_face(&BlockFace, "same text twice", &style, 300);
        let second = render_with_face(&BlockFace, "same text twice", &style, 300);
        assert_eq!(first.as_raw(), second.as_raw());
    }
}
