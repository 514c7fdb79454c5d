//! Word timing interpolation
//!
//! Splits a caption segment into per-word time windows by linear
//! interpolation across the segment's span. No audio analysis is
//! involved; every word in a segment gets an equal share of its
//! duration.

use crate::captions::models::{CaptionSegment, WordTiming};

/// Splits a segment's text into evenly timed words.
///
/// Word `i` of `n` covers `[start + i*(span/n), start + (i+1)*(span/n))`,
/// so consecutive windows share their boundary exactly. Text with no
/// words yields an empty list.
pub fn split_segment(segment: &CaptionSegment) -> Vec<WordTiming> {
    let words: Vec<&str> = segment.text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let per_word = segment.duration() / words.len() as f64;

    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            WordTiming::new(
                *word,
                segment.start_time + i as f64 * per_word,
                segment.start_time + (i + 1) as f64 * per_word,
            )
        })
        .collect()
}

/// Splits every segment in order and chains the results.
pub fn split_segments(segments: &[CaptionSegment]) -> Vec<WordTiming> {
    segments.iter().flat_map(|s| split_segment(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_three_words_over_ten_seconds() {
        let segment = CaptionSegment::new(0.0, 10.0, "Hello world test");
        let timings = split_segment(&segment);

        assert_eq!(timings.len(), 3);
        assert_eq!(timings[0].word, "Hello");
        assert_eq!(timings[1].word, "world");
        assert_eq!(timings[2].word, "test");

        let expected_starts = [0.0, 10.0 / 3.0, 20.0 / 3.0];
        let expected_ends = [10.0 / 3.0, 20.0 / 3.0, 10.0];
        for (timing, (start, end)) in timings
            .iter()
            .zip(expected_starts.iter().zip(expected_ends.iter()))
        {
            assert!((timing.start - start).abs() < 1e-9);
            assert!((timing.end - end).abs() < 1e-9);
        }
    }

    #[test]
    fn test_windows_are_contiguous() {
        let segment = CaptionSegment::new(1.7, 9.3, "one two three four five six seven");
        let timings = split_segment(&segment);

        assert_eq!(timings.len(), 7);
        for pair in timings.windows(2) {
            // boundaries must match exactly, not approximately
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(timings[0].start, 1.7);
        assert_eq!(timings[6].end, 1.7 + 7.0 * ((9.3 - 1.7) / 7.0));
    }

    #[test]
    fn test_single_word_gets_full_span() {
        let segment = CaptionSegment::new(2.0, 5.0, "Hello");
        let timings = split_segment(&segment);
        assert_eq!(timings.len(), 1);
        assert_eq!(timings[0].start, 2.0);
        assert_eq!(timings[0].end, 5.0);
    }

    #[test]
    fn test_whitespace_only_text_yields_nothing() {
        let segment = CaptionSegment {
            start_time: 0.0,
            end_time: 1.0,
            text: "   ".to_string(),
            confidence: None,
        };
        assert!(split_segment(&segment).is_empty());
    }

    #[test]
    fn test_split_segments_chains_in_order() {
        let segments = vec![
            CaptionSegment::new(0.0, 2.0, "first second"),
            CaptionSegment::new(2.0, 4.0, "third"),
        ];
        let timings = split_segments(&segments);
        assert_eq!(timings.len(), 3);
        assert_eq!(timings[0].word, "first");
        assert_eq!(timings[1].word, "second");
        assert_eq!(timings[2].word, "third");
        assert_eq!(timings[2].start, 2.0);
        assert_eq!(timings[2].end, 4.0);
    }

    #[test]
    fn test_irregular_whitespace_collapses() {
        let segment = CaptionSegment::new(0.0, 3.0, "  a \t b\n c  ");
        let timings = split_segment(&segment);
        assert_eq!(timings.len(), 3);
        assert_eq!(timings[0].word, "a");
        assert_eq!(timings[2].word, "c");
    }
}
