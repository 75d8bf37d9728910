//! Speech segmentation.
//!
//! Groups word-level timings into short, time-ordered segments that are
//! indexed as audio highlights.

use crate::config::SegmentationSettings;
use crate::models::{AudioSegment, Word};
use tracing::debug;

/// Builds bounded audio segments from recognized words.
#[derive(Debug, Clone)]
pub struct SegmentBuilder {
    max_words: usize,
    max_gap_seconds: f64,
}

impl SegmentBuilder {
    /// Builder with the default limits: 8 words, 2.0 seconds of silence.
    pub fn new() -> Self {
        Self::from_settings(&SegmentationSettings::default())
    }

    pub fn from_settings(settings: &SegmentationSettings) -> Self {
        Self {
            max_words: settings.max_words.max(1),
            max_gap_seconds: settings.max_gap_seconds,
        }
    }

    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words.max(1);
        self
    }

    pub fn with_max_gap(mut self, max_gap_seconds: f64) -> Self {
        self.max_gap_seconds = max_gap_seconds;
        self
    }

    /// Split `words` into segments.
    ///
    /// A segment closes after the last word, before a silence longer than
    /// the gap limit, or once it holds `max_words` words. Every word lands in
    /// exactly one segment.
    pub fn build(&self, words: &[Word]) -> Vec<AudioSegment> {
        let mut segments = Vec::new();
        let mut run: Vec<&Word> = Vec::with_capacity(self.max_words);

        for (i, word) in words.iter().enumerate() {
            run.push(word);

            let closes = match words.get(i + 1) {
                None => true,
                Some(next) => next.start - word.end > self.max_gap_seconds,
            } || run.len() >= self.max_words;

            if closes {
                segments.push(Self::close(&run));
                run.clear();
            }
        }

        debug!("Built {} segments from {} words", segments.len(), words.len());
        segments
    }

    fn close(run: &[&Word]) -> AudioSegment {
        let text = run
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        AudioSegment {
            text,
            start_timestamp: run.first().map(|w| w.start).unwrap_or_default(),
            end_timestamp: run.last().map(|w| w.end).unwrap_or_default(),
            word_count: run.len(),
        }
    }
}

impl Default for SegmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn words(timings: &[(f64, f64)]) -> Vec<Word> {
        timings
            .iter()
            .enumerate()
            .map(|(i, (start, end))| Word::new(format!("w{}", i), *start, *end))
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(SegmentBuilder::new().build(&[]).is_empty());
    }

    #[test]
    fn test_single_word() {
        let segments = SegmentBuilder::new().build(&words(&[(1.0, 1.4)]));
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].word_count, 1);
        assert_eq!(segments[0].start_timestamp, 1.0);
        assert_eq!(segments[0].end_timestamp, 1.4);
    }

    #[test]
    fn test_splits_on_word_limit() {
        let timings: Vec<(f64, f64)> = (0..20).map(|i| (i as f64 * 0.5, i as f64 * 0.5 + 0.4)).collect();
        let segments = SegmentBuilder::new().build(&words(&timings));

        let counts: Vec<usize> = segments.iter().map(|s| s.word_count).collect();
        assert_eq!(counts, vec![8, 8, 4]);
        assert_eq!(segments[1].text, "w8 w9 w10 w11 w12 w13 w14 w15");
        assert_eq!(segments[1].start_timestamp, 4.0);
        assert!((segments[1].end_timestamp - 7.9).abs() < 1e-9);
    }

    #[test]
    fn test_splits_on_long_silence() {
        let segments = SegmentBuilder::new().build(&words(&[
            (0.0, 0.5),
            (0.6, 1.0),
            (3.5, 4.0), // 2.5s of silence before this word
            (4.1, 4.5),
        ]));

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "w0 w1");
        assert_eq!(segments[0].end_timestamp, 1.0);
        assert_eq!(segments[1].text, "w2 w3");
        assert_eq!(segments[1].start_timestamp, 3.5);
    }

    #[test]
    fn test_gap_of_exactly_two_seconds_does_not_split() {
        let segments = SegmentBuilder::new().build(&words(&[(0.0, 1.0), (3.0, 3.5)]));
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_custom_limits() {
        let builder = SegmentBuilder::new().with_max_words(2).with_max_gap(0.5);
        let segments = builder.build(&words(&[(0.0, 0.1), (0.2, 0.3), (0.4, 0.5), (1.5, 1.6)]));
        let counts: Vec<usize> = segments.iter().map(|s| s.word_count).collect();
        assert_eq!(counts, vec![2, 1, 1]);
    }

    fn arb_words() -> impl Strategy<Value = Vec<Word>> {
        prop::collection::vec((0.0f64..4.0, 0.05f64..1.0), 0..60).prop_map(|steps| {
            let mut t = 0.0;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, (gap, len))| {
                    let start = t + gap;
                    let end = start + len;
                    t = end;
                    Word::new(format!("w{}", i), start, end)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_segments_never_exceed_word_limit(ws in arb_words()) {
            for segment in SegmentBuilder::new().build(&ws) {
                prop_assert!(segment.word_count >= 1);
                prop_assert!(segment.word_count <= 8);
            }
        }

        #[test]
        fn prop_every_word_assigned_once(ws in arb_words()) {
            let segments = SegmentBuilder::new().build(&ws);
            let total: usize = segments.iter().map(|s| s.word_count).sum();
            prop_assert_eq!(total, ws.len());
            for pair in segments.windows(2) {
                prop_assert!(pair[0].end_timestamp <= pair[1].start_timestamp);
            }
        }

        #[test]
        fn prop_long_gap_is_always_a_boundary(ws in arb_words()) {
            let segments = SegmentBuilder::new().build(&ws);
            for pair in ws.windows(2) {
                if pair[1].start - pair[0].end > 2.0 {
                    prop_assert!(segments.iter().any(|s| s.end_timestamp == pair[0].end));
                    prop_assert!(segments.iter().any(|s| s.start_timestamp == pair[1].start));
                }
            }
        }
    }
}
