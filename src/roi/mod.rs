//! Field text reconstruction from word-level recognition output.
//!
//! The recognition engine returns whole words with quadrilateral boxes; the
//! field templates are rectangles. This module maps one onto the other at
//! character granularity, assuming horizontally written single-line fields:
//!
//! 1. a word is a candidate only if the vertical center of its bounding box
//!    falls inside the rectangle's vertical band (not a full intersection
//!    test; a word on another text line is discarded entirely);
//! 2. per-character x-centers are approximated by dividing the word's box
//!    width evenly over its character count (the word is treated as a
//!    monospaced strip, accepted as a modeled limitation for proportional
//!    fonts);
//! 3. characters whose x-center falls inside the rectangle are retained;
//! 4. retained characters from all words are sorted by x-center and
//!    concatenated, re-deriving reading order even when the recognizer's
//!    word order is not left-to-right or when one rectangle straddles two
//!    recognized tokens.
//!
//! A rectangle spanning multiple text lines yields only the in-band lines;
//! cross-line merging is intentionally unsupported.

use crate::domain::{RecognizedWord, Rect, Roi};
use std::collections::BTreeMap;

/// Reconstructs the text inside `rect` from recognized words.
///
/// The result is the whitespace-untrimmed concatenation of the retained
/// characters; trimming is the caller's responsibility. An empty word list,
/// or a rectangle that covers no character centers (including out-of-bounds
/// and zero-size rectangles), yields the empty string.
pub fn extract_text(words: &[RecognizedWord], rect: &Rect) -> String {
    let mut matched: Vec<(f32, char)> = Vec::new();

    for word in words {
        if word.content.is_empty() {
            continue;
        }
        if !rect.contains_y(word.center_y()) {
            continue;
        }

        let aabb = word.aabb();
        let char_count = word.content.chars().count();
        let char_width = aabb.w / char_count as f32;

        for (i, ch) in word.content.chars().enumerate() {
            let char_cx = aabb.x + char_width * (i as f32 + 0.5);
            if rect.contains_x(char_cx) {
                matched.push((char_cx, ch));
            }
        }
    }

    // Word order from the recognizer is not assumed reliable; a global sort
    // by x-center restores left-to-right reading order.
    matched.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    matched.into_iter().map(|(_, ch)| ch).collect()
}

/// Extracts one trimmed string per ROI.
///
/// Every input ROI produces an entry; ROIs that match nothing map to the
/// empty string. Duplicate labels keep the last ROI's result.
pub fn extract_many(words: &[RecognizedWord], rois: &[Roi]) -> BTreeMap<String, String> {
    rois.iter()
        .map(|roi| {
            let text = extract_text(words, &roi.rect);
            (roi.label.clone(), text.trim().to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(content: &str, x1: f32, y1: f32, x2: f32, y2: f32) -> RecognizedWord {
        RecognizedWord::new(content, [[x1, y1], [x2, y1], [x2, y2], [x1, y2]])
    }

    #[test]
    fn empty_word_list_yields_empty_string() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(extract_text(&[], &rect), "");
    }

    #[test]
    fn word_inside_rect_is_fully_extracted() {
        let words = vec![word("1,234円", 100.0, 50.0, 220.0, 70.0)];
        let rect = Rect::new(90.0, 45.0, 150.0, 30.0);
        assert_eq!(extract_text(&words, &rect), "1,234円");
    }

    #[test]
    fn vertical_band_excludes_other_lines() {
        // Same horizontal span, but the second word sits on the next line.
        let words = vec![
            word("合計", 100.0, 50.0, 160.0, 70.0),
            word("税込", 100.0, 90.0, 160.0, 110.0),
        ];
        let rect = Rect::new(90.0, 45.0, 100.0, 30.0);
        assert_eq!(extract_text(&words, &rect), "合計");
    }

    #[test]
    fn partial_horizontal_overlap_selects_characters() {
        // Four chars at centers 105, 115, 125, 135; the rect covers the
        // middle two.
        let words = vec![word("abcd", 100.0, 10.0, 140.0, 20.0)];
        let rect = Rect::new(110.0, 5.0, 20.0, 20.0);
        assert_eq!(extract_text(&words, &rect), "bc");
    }

    #[test]
    fn characters_from_two_words_sort_by_x() {
        // The recognizer returned the right-hand token first; the rectangle
        // straddles both.
        let words = vec![
            word("円", 160.0, 50.0, 180.0, 70.0),
            word("500", 100.0, 50.0, 160.0, 70.0),
        ];
        let rect = Rect::new(95.0, 45.0, 100.0, 30.0);
        assert_eq!(extract_text(&words, &rect), "500円");
    }

    #[test]
    fn out_of_bounds_rect_matches_nothing() {
        let words = vec![word("500", 100.0, 50.0, 160.0, 70.0)];
        let rect = Rect::new(-500.0, -500.0, 100.0, 100.0);
        assert_eq!(extract_text(&words, &rect), "");
    }

    #[test]
    fn zero_width_rect_off_center_matches_nothing() {
        // Char centers sit at 110, 130, 150; a zero-width rect between them
        // has no character center inside its (degenerate) span.
        let words = vec![word("500", 100.0, 50.0, 160.0, 70.0)];
        let rect = Rect::new(111.0, 55.0, 0.0, 10.0);
        assert_eq!(extract_text(&words, &rect), "");
    }

    #[test]
    fn extract_many_has_entry_per_roi() {
        let words = vec![word("500円", 100.0, 50.0, 180.0, 70.0)];
        let rois = vec![
            Roi::new("金額", Rect::new(90.0, 45.0, 100.0, 30.0)),
            Roi::new("日付", Rect::new(0.0, 0.0, 10.0, 10.0)),
        ];
        let extractions = extract_many(&words, &rois);
        assert_eq!(extractions["金額"], "500円");
        assert_eq!(extractions["日付"], "");
    }
}
