//! Score thresholding and ranking.
//!
//! The classifier returns a score in [0, 1] for every taxonomy label.
//! This module filters that map against a caller-supplied threshold and
//! orders the survivors: descending score, ties broken by label so the
//! same scores always produce the same listing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw classifier output: one score per taxonomy label.
pub type LabelScoreMap = Vec<(String, f32)>;

/// A topic that survived thresholding, or one row of the full listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTopic {
    pub topic: String,
    pub score: f32,
}

/// Comparison used at the `score == threshold` boundary.
///
/// The trained reference keeps boundary scores (`>=`); the service
/// default drops them (`>`). Explicit so callers never guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdMode {
    /// Keep only scores strictly above the threshold.
    #[default]
    Exclusive,
    /// Keep scores at or above the threshold.
    Inclusive,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("threshold must be in [0, 1], got {0}")]
    OutOfRange(f32),
}

/// Reject thresholds outside [0, 1]. NaN is rejected, never clamped.
pub fn validate_threshold(threshold: f32) -> Result<(), ThresholdError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(ThresholdError::OutOfRange(threshold))
    }
}

/// Filter a score map against a threshold and rank the survivors.
///
/// An empty score map yields an empty result.
pub fn select_topics(
    scores: &[(String, f32)],
    threshold: f32,
    mode: ThresholdMode,
) -> Result<Vec<ScoredTopic>, ThresholdError> {
    validate_threshold(threshold)?;

    let keep = |score: f32| match mode {
        ThresholdMode::Exclusive => score > threshold,
        ThresholdMode::Inclusive => score >= threshold,
    };

    let mut selected: Vec<ScoredTopic> = scores
        .iter()
        .filter(|(_, score)| keep(*score))
        .map(|(topic, score)| ScoredTopic {
            topic: topic.clone(),
            score: *score,
        })
        .collect();
    sort_ranked(&mut selected);
    Ok(selected)
}

/// The complete score listing, ranked the same way as [`select_topics`].
pub fn rank_all(scores: &[(String, f32)]) -> Vec<ScoredTopic> {
    let mut all: Vec<ScoredTopic> = scores
        .iter()
        .map(|(topic, score)| ScoredTopic {
            topic: topic.clone(),
            score: *score,
        })
        .collect();
    sort_ranked(&mut all);
    all
}

fn sort_ranked(topics: &mut [ScoredTopic]) {
    topics.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.topic.cmp(&b.topic))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scores() -> LabelScoreMap {
        vec![
            ("Culture.Literature".into(), 0.92),
            ("Geography.Africa".into(), 0.08),
            ("History_and_Society.Education".into(), 0.5),
            ("STEM.Science".into(), 0.0),
            ("Culture.Media".into(), 0.5),
        ]
    }

    #[test]
    fn selects_and_ranks_descending() {
        let topics = select_topics(&sample_scores(), 0.4, ThresholdMode::Exclusive).unwrap();
        let labels: Vec<&str> = topics.iter().map(|t| t.topic.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Culture.Literature",
                "Culture.Media",
                "History_and_Society.Education",
            ]
        );
    }

    #[test]
    fn ties_break_lexicographically() {
        let topics = select_topics(&sample_scores(), 0.4, ThresholdMode::Exclusive).unwrap();
        // Both at 0.5; Culture.Media sorts before History_and_Society.
        assert_eq!(topics[1].topic, "Culture.Media");
        assert_eq!(topics[2].topic, "History_and_Society.Education");
    }

    #[test]
    fn exclusive_drops_boundary_scores() {
        let topics = select_topics(&sample_scores(), 0.5, ThresholdMode::Exclusive).unwrap();
        let labels: Vec<&str> = topics.iter().map(|t| t.topic.as_str()).collect();
        assert_eq!(labels, vec!["Culture.Literature"]);
    }

    #[test]
    fn inclusive_keeps_boundary_scores() {
        let topics = select_topics(&sample_scores(), 0.5, ThresholdMode::Inclusive).unwrap();
        let labels: Vec<&str> = topics.iter().map(|t| t.topic.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Culture.Literature",
                "Culture.Media",
                "History_and_Society.Education",
            ]
        );
    }

    #[test]
    fn zero_threshold_exclusive_returns_all_nonzero() {
        let topics = select_topics(&sample_scores(), 0.0, ThresholdMode::Exclusive).unwrap();
        assert_eq!(topics.len(), 4);
        assert!(topics.iter().all(|t| t.score > 0.0));
    }

    #[test]
    fn one_threshold_inclusive_keeps_only_exact_ones() {
        let scores = vec![("A".to_string(), 1.0), ("B".to_string(), 0.999)];
        let topics = select_topics(&scores, 1.0, ThresholdMode::Inclusive).unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].topic, "A");

        let topics = select_topics(&scores, 1.0, ThresholdMode::Exclusive).unwrap();
        assert!(topics.is_empty());
    }

    #[test]
    fn higher_threshold_is_subset_of_lower() {
        let scores = sample_scores();
        for mode in [ThresholdMode::Exclusive, ThresholdMode::Inclusive] {
            let low = select_topics(&scores, 0.1, mode).unwrap();
            let high = select_topics(&scores, 0.6, mode).unwrap();
            for topic in &high {
                assert!(low.contains(topic), "{} missing at lower threshold", topic.topic);
            }
        }
    }

    #[test]
    fn empty_score_map_yields_empty_result() {
        let topics = select_topics(&[], 0.5, ThresholdMode::Exclusive).unwrap();
        assert!(topics.is_empty());
    }

    #[test]
    fn out_of_range_thresholds_rejected() {
        for bad in [-0.1, 1.5, f32::NAN] {
            let err = select_topics(&sample_scores(), bad, ThresholdMode::Exclusive).unwrap_err();
            assert!(matches!(err, ThresholdError::OutOfRange(_)), "{bad} accepted");
        }
    }

    #[test]
    fn rank_all_lists_everything_sorted() {
        let all = rank_all(&sample_scores());
        assert_eq!(all.len(), 5);
        for pair in all.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(all[4].topic, "STEM.Science");
    }
}
