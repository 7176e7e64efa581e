//! Lexical-first candidate fusion for hybrid search
//!
//! The lexical and dense channels are unioned by document id, keeping the
//! first occurrence: every BM25 result in rank order, then the dense
//! results not already present. A document found by both channels keeps its
//! BM25 provenance. No score arithmetic happens here; the cross-encoder
//! decides the final order.

use std::collections::HashSet;

use crate::search::Candidate;

/// Deduplicating union of the two retrieval channels
pub struct CandidateFusion;

impl CandidateFusion {
    /// Union `lexical` then `dense`, first occurrence of each doc id wins
    ///
    /// # Example
    ///
    /// ```
    /// use evidence_core::search::{Candidate, CandidateFusion, RetrievalSource};
    ///
    /// let bm25 = vec![Candidate { doc_id: 2, raw_score: 7.1, source: RetrievalSource::Bm25 }];
    /// let dense = vec![
    ///     Candidate { doc_id: 0, raw_score: 0.8, source: RetrievalSource::Dense },
    ///     Candidate { doc_id: 2, raw_score: 0.6, source: RetrievalSource::Dense },
    /// ];
    ///
    /// let fused = CandidateFusion::fuse(bm25, dense);
    /// assert_eq!(fused.iter().map(|c| c.doc_id).collect::<Vec<_>>(), vec![2, 0]);
    /// assert_eq!(fused[0].source, RetrievalSource::Bm25);
    /// ```
    pub fn fuse(lexical: Vec<Candidate>, dense: Vec<Candidate>) -> Vec<Candidate> {
        let mut seen = HashSet::with_capacity(lexical.len() + dense.len());
        lexical
            .into_iter()
            .chain(dense)
            .filter(|candidate| seen.insert(candidate.doc_id))
            .collect()
    }
}
