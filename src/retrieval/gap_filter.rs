//! Similarity-gap truncation of ranked audio candidates.
//!
//! Speech segments vary widely in how topical they are, so instead of a fixed
//! top-k the filter keeps the leading cluster of results and stops at the
//! first large drop in similarity.

use crate::config::RetrievalSettings;
use crate::models::RankedResult;
use tracing::debug;

/// Slack added to the threshold so a nominal gap equal to it (0.85 -> 0.80
/// at 0.05) is not cut by `f32` rounding.
const GAP_TOLERANCE: f32 = 1e-6;

/// Keeps a prefix of a ranked list up to the first similarity gap.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveResultFilter {
    gap_threshold: f32,
    max_results: usize,
}

impl AdaptiveResultFilter {
    /// `max_results` is clamped to at least 1.
    pub fn new(gap_threshold: f32, max_results: usize) -> Self {
        Self {
            gap_threshold,
            max_results: max_results.max(1),
        }
    }

    pub fn from_settings(settings: &RetrievalSettings) -> Self {
        Self::new(settings.gap_threshold, settings.max_audio_results)
    }

    pub fn gap_threshold(&self) -> f32 {
        self.gap_threshold
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Truncate `ranked`, which must already be sorted by similarity descending.
    ///
    /// The first result is always kept. Each following result is kept while
    /// its drop from the previous one is at most the threshold and the output
    /// holds fewer than `max_results` entries. A gap equal to the threshold
    /// is kept.
    pub fn filter(&self, ranked: Vec<RankedResult>) -> Vec<RankedResult> {
        let total = ranked.len();
        let mut kept: Vec<RankedResult> = Vec::with_capacity(self.max_results.min(total));

        for candidate in ranked {
            if let Some(previous) = kept.last() {
                if kept.len() >= self.max_results {
                    break;
                }
                let gap = previous.similarity - candidate.similarity;
                if gap > self.gap_threshold + GAP_TOLERANCE {
                    debug!("Similarity gap {:.3} after {} results", gap, kept.len());
                    break;
                }
            }
            kept.push(candidate);
        }

        debug!("Gap filter kept {} of {} results", kept.len(), total);
        kept
    }
}

impl Default for AdaptiveResultFilter {
    fn default() -> Self {
        Self::from_settings(&RetrievalSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Highlight;
    use proptest::prelude::*;

    fn ranked(similarities: &[f32]) -> Vec<RankedResult> {
        similarities
            .iter()
            .enumerate()
            .map(|(i, s)| {
                RankedResult::new(
                    Highlight {
                        id: i as i64,
                        video_id: 1,
                        timestamp: i as f64,
                        end_timestamp: Some(i as f64 + 1.0),
                        description: format!("segment {}", i),
                        embedding: vec![],
                    },
                    "v.mp4".to_string(),
                    *s,
                )
            })
            .collect()
    }

    fn similarities(results: &[RankedResult]) -> Vec<f32> {
        results.iter().map(|r| r.similarity).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(AdaptiveResultFilter::default().filter(vec![]).is_empty());
    }

    #[test]
    fn test_stops_at_large_gap() {
        let kept = AdaptiveResultFilter::default().filter(ranked(&[0.91, 0.88, 0.70, 0.65]));
        assert_eq!(similarities(&kept), vec![0.91, 0.88]);
    }

    #[test]
    fn test_stops_at_max_results() {
        let kept = AdaptiveResultFilter::new(0.05, 2).filter(ranked(&[0.80, 0.78]));
        assert_eq!(similarities(&kept), vec![0.80, 0.78]);

        let kept = AdaptiveResultFilter::new(0.05, 2).filter(ranked(&[0.80, 0.79, 0.78]));
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_gap_equal_to_threshold_is_kept() {
        for pair in [[0.85, 0.80], [0.95, 0.90], [0.30, 0.25]] {
            let kept = AdaptiveResultFilter::new(0.05, 2).filter(ranked(&pair));
            assert_eq!(similarities(&kept), pair.to_vec());
        }

        let kept = AdaptiveResultFilter::new(0.05, 2).filter(ranked(&[0.85, 0.799]));
        assert_eq!(similarities(&kept), vec![0.85]);
    }

    #[test]
    fn test_gap_right_after_first() {
        let kept = AdaptiveResultFilter::default().filter(ranked(&[0.9, 0.5, 0.49]));
        assert_eq!(similarities(&kept), vec![0.9]);
    }

    #[test]
    fn test_wider_cap_follows_cluster() {
        let kept = AdaptiveResultFilter::new(0.05, 5).filter(ranked(&[0.9, 0.87, 0.84, 0.81, 0.6]));
        assert_eq!(similarities(&kept), vec![0.9, 0.87, 0.84, 0.81]);
    }

    #[test]
    fn test_zero_max_results_is_clamped() {
        let filter = AdaptiveResultFilter::new(0.05, 0);
        assert_eq!(filter.max_results(), 1);
        assert_eq!(filter.filter(ranked(&[0.5, 0.5])).len(), 1);
    }

    fn arb_ranked() -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(0.0f32..1.0, 0..12).prop_map(|mut v| {
            v.sort_by(|a, b| b.total_cmp(a));
            v
        })
    }

    proptest! {
        #[test]
        fn prop_output_is_bounded_prefix(sims in arb_ranked(), max in 1usize..6, threshold in 0.0f32..0.3) {
            let kept = AdaptiveResultFilter::new(threshold, max).filter(ranked(&sims));
            let kept_sims = similarities(&kept);

            prop_assert!(kept.len() <= max);
            prop_assert_eq!(kept.is_empty(), sims.is_empty());
            prop_assert_eq!(&kept_sims[..], &sims[..kept.len()]);
        }

        #[test]
        fn prop_kept_gaps_within_threshold(sims in arb_ranked(), max in 1usize..6, threshold in 0.0f32..0.3) {
            let kept = similarities(&AdaptiveResultFilter::new(threshold, max).filter(ranked(&sims)));
            for pair in kept.windows(2) {
                prop_assert!(pair[0] - pair[1] <= threshold + GAP_TOLERANCE);
            }
        }
    }
}
