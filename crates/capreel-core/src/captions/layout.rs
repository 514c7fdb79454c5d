//! Text layout for captions
//!
//! Greedy word wrapping against a pixel width limit, measured with the
//! active font face. Wrapping never splits or hyphenates within a word;
//! a single word wider than the limit is emitted as its own overflowing
//! line.

use crate::fonts::FontFace;

/// Fraction of the video width available to caption text
pub const MAX_WIDTH_RATIO: f64 = 0.8;

/// Extra pixels added to the font size for each line's height
pub const LINE_HEIGHT_PAD: u32 = 4;

/// Maximum caption text width for a given video width
pub fn max_caption_width(video_width: u32) -> u32 {
    (video_width as f64 * MAX_WIDTH_RATIO) as u32
}

/// Height of one rendered caption line for a given font size
pub fn line_height(font_size: u32) -> u32 {
    font_size + LINE_HEIGHT_PAD
}

/// Wraps text into lines no wider than `max_width` pixels.
///
/// Words are taken greedily: each word joins the current line if the
/// line still fits with it appended, otherwise the line is closed and
/// the word starts a new one. A word that alone exceeds `max_width`
/// becomes its own line, unmodified.
pub fn wrap(text: &str, face: &dyn FontFace, max_width: u32) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        let test_line = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current.join(" "), word)
        };

        if face.text_width(&test_line) <= max_width {
            current.push(word);
        } else if !current.is_empty() {
            lines.push(current.join(" "));
            current = vec![word];
        } else {
            // single word wider than the limit
            lines.push(word.to_string());
        }
    }

    if !current.is_empty() {
        lines.push(current.join(" "));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::GlyphBitmap;

    /// Deterministic face: every character advances exactly 10px
    struct TenPxFace;

    impl FontFace for TenPxFace {
        fn ascent(&self) -> i32 {
            20
        }
        fn advance(&self, _ch: char) -> i32 {
            10
        }
        fn rasterize(&self, _ch: char) -> GlyphBitmap {
            GlyphBitmap {
                width: 0,
                height: 0,
                xmin: 0,
                ymin: 0,
                advance: 10,
                coverage: Vec::new(),
            }
        }
    }

    #[test]
    fn test_short_text_single_line() {
        // "Hi there" = 8 chars = 80px, fits in 100px
        let lines = wrap("Hi there", &TenPxFace, 100);
        assert_eq!(lines, vec!["Hi there"]);
    }

    #[test]
    fn test_wraps_at_limit() {
        // each word 40px; "word word" = 90px > 80px limit
        let lines = wrap("word word word", &TenPxFace, 80);
        assert_eq!(lines, vec!["word", "word", "word"]);
    }

    #[test]
    fn test_greedy_packing() {
        // "aa bb" = 50px fits in 50px; adding " cc" makes 80px > 50px
        let lines = wrap("aa bb cc", &TenPxFace, 50);
        assert_eq!(lines, vec!["aa bb", "cc"]);
    }

    #[test]
    fn test_all_lines_within_limit_except_oversized_words() {
        let text = "one two three incomprehensibilities four five";
        let max_width = 100;
        let lines = wrap(text, &TenPxFace, max_width);

        for line in &lines {
            let is_single_word = !line.contains(' ');
            let width = TenPxFace.text_width(line);
            assert!(
                width <= max_width || is_single_word,
                "line '{line}' is {width}px wide"
            );
        }
        // the oversized word is its own line, unmodified
        assert!(lines.contains(&"incomprehensibilities".to_string()));
    }

    #[test]
    fn test_long_sentence_wraps_within_limit() {
        let text = "This is a very long text that should be wrapped into \
                    multiple lines when the width is limited";
        let lines = wrap(text, &TenPxFace, 200);

        assert_eq!(
            lines,
            vec![
                "This is a very long",
                "text that should be",
                "wrapped into",
                "multiple lines when",
                "the width is limited",
            ]
        );
        for line in &lines {
            assert!(TenPxFace.text_width(line) <= 200);
        }
    }

    #[test]
    fn test_oversized_word_does_not_break_following_words() {
        // 12-char word = 120px > 50px; neighbors still pack normally
        let lines = wrap("aa incomprehensible bb cc", &TenPxFace, 50);
        assert_eq!(lines, vec!["aa", "incomprehensible", "bb cc"]);
    }

    #[test]
    fn test_oversized_word_at_end() {
        let lines = wrap("aa incomprehensible", &TenPxFace, 50);
        assert_eq!(lines, vec!["aa", "incomprehensible"]);
    }

    #[test]
    fn test_empty_text_yields_no_lines() {
        assert!(wrap("", &TenPxFace, 100).is_empty());
        assert!(wrap("   ", &TenPxFace, 100).is_empty());
    }

    #[test]
    fn test_max_caption_width_is_eighty_percent() {
        assert_eq!(max_caption_width(1920), 1536);
        assert_eq!(max_caption_width(1080), 864);
        assert_eq!(max_caption_width(100), 80);
    }

    #[test]
    fn test_line_height() {
        assert_eq!(line_height(24), 28);
        assert_eq!(line_height(48), 52);
    }
}
