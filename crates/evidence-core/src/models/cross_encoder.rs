//! Cross-encoder relevance scoring

use candle_core::Device;
use tracing::info;

use crate::error::ModelError;
use crate::models::head::SequenceClassifier;
use crate::models::PairScorer;

/// Jointly encodes (query, candidate) and emits one relevance score
///
/// Single-logit checkpoints are passed through a sigmoid so scores land in
/// (0, 1); multi-logit checkpoints report the last logit.
pub struct CrossEncoder {
    classifier: SequenceClassifier,
}

impl CrossEncoder {
    pub fn load(source: &str, max_seq_len: usize, device: &Device) -> Result<Self, ModelError> {
        let classifier = SequenceClassifier::load(source, max_seq_len, device)?;
        info!(
            "Cross-encoder loaded: {} labels",
            classifier.config().num_labels()
        );
        Ok(Self { classifier })
    }
}

impl PairScorer for CrossEncoder {
    fn score_pairs(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>, ModelError> {
        texts
            .iter()
            .map(|text| {
                let logits = self.classifier.logits(query, text)?;
                relevance_from_logits(&logits)
            })
            .collect()
    }
}

fn relevance_from_logits(logits: &[f32]) -> Result<f32, ModelError> {
    match logits {
        [] => Err(ModelError::Output("cross-encoder returned no logits".to_string())),
        [single] => Ok(sigmoid(*single)),
        [.., last] => Ok(*last),
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
