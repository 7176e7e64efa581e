//! Per-query min-max normalization of reranker scores

/// Spans at or below this are treated as "all scores equal"
pub const DEGENERATE_SPAN: f32 = 1e-8;

/// Maps one query's raw scores onto [0, 1]
///
/// When the span is negligible (all equal, one score, or no scores) every
/// score maps to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreNormalizer {
    min: f32,
    span: Option<f32>,
}

impl ScoreNormalizer {
    pub fn fit(scores: &[f32]) -> Self {
        let finite = scores.iter().copied().filter(|s| s.is_finite());
        let (min, max) = finite.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s), hi.max(s))
        });

        if min > max {
            return Self { min: 0.0, span: None };
        }
        let span = max - min;
        Self {
            min,
            span: (span > DEGENERATE_SPAN).then_some(span),
        }
    }

    /// Non-finite scores map to 0.0.
    pub fn normalize(&self, score: f32) -> f32 {
        if !score.is_finite() {
            return 0.0;
        }
        match self.span {
            None => 1.0,
            Some(span) => ((score - self.min) / span).clamp(0.0, 1.0),
        }
    }
}

/// Normalize a whole score set
pub fn normalize_scores(scores: &[f32]) -> Vec<f32> {
    let normalizer = ScoreNormalizer::fit(scores);
    scores.iter().map(|&s| normalizer.normalize(s)).collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn normalized_scores_stay_in_unit_range(scores in prop::collection::vec(-50.0f32..50.0, 0..64)) {
            for s in normalize_scores(&scores) {
                prop_assert!((0.0..=1.0).contains(&s));
            }
        }

        #[test]
        fn normalization_is_monotonic(scores in prop::collection::vec(-50.0f32..50.0, 2..64)) {
            let normalized = normalize_scores(&scores);
            for i in 0..scores.len() {
                for j in 0..scores.len() {
                    if scores[i] <= scores[j] {
                        prop_assert!(normalized[i] <= normalized[j]);
                    }
                }
            }
        }
    }
}
