//! Cross-encoder reranking of fused candidates

use std::sync::Arc;
use tracing::debug;

use crate::document::DocumentStore;
use crate::error::ModelError;
use crate::models::PairScorer;
use crate::search::{Candidate, RankedCandidate};

/// Reorders candidates by a jointly encoded (query, document) relevance score
///
/// The retrieval score is carried along as provenance only; the final
/// order depends on the cross-encoder score alone. Equal scores keep the
/// fused candidate order.
#[derive(Clone)]
pub struct Reranker {
    scorer: Arc<dyn PairScorer>,
}

impl Reranker {
    pub fn new(scorer: Arc<dyn PairScorer>) -> Self {
        Self { scorer }
    }

    pub fn rerank(
        &self,
        query: &str,
        candidates: &[Candidate],
        store: &DocumentStore,
        k: usize,
    ) -> Result<Vec<RankedCandidate>, ModelError> {
        let scored: Vec<(&Candidate, &str)> = candidates
            .iter()
            .filter_map(|c| store.get(c.doc_id).map(|doc| (c, doc.text.as_str())))
            .collect();
        if scored.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = scored.iter().map(|(_, text)| *text).collect();
        let scores = self.scorer.score_pairs(query, &texts)?;
        if scores.len() != texts.len() {
            return Err(ModelError::Output(format!(
                "expected {} relevance scores, got {}",
                texts.len(),
                scores.len()
            )));
        }
        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            return Err(ModelError::Output(format!(
                "non-finite relevance score: {}",
                bad
            )));
        }

        let mut ranked: Vec<RankedCandidate> = scored
            .iter()
            .zip(scores)
            .map(|((candidate, _), score)| RankedCandidate {
                doc_id: candidate.doc_id,
                score,
                origin_source: candidate.source,
                origin_score: candidate.raw_score,
            })
            .collect();

        // stable: ties keep fused order
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(k);

        debug!("Reranked {} candidates, kept {}", texts.len(), ranked.len());
        Ok(ranked)
    }
}
