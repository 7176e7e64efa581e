//! Search module - Lexical and dense retrieval, fusion, reranking
//!
//! This module provides:
//! - Keyword search using Tantivy (BM25) over a per-claim, in-RAM index
//! - Dense search over sentence embeddings behind the [`VectorIndex`] capability
//! - Lexical-first candidate fusion
//! - Cross-encoder reranking and per-query score normalization

pub mod fusion;
pub mod hybrid;
pub mod indexer;
pub mod keyword;
pub mod normalize;
pub mod rerank;
pub mod vector;

pub use fusion::CandidateFusion;
pub use hybrid::HybridRetriever;
pub use indexer::EvidenceIndex;
pub use keyword::KeywordIndex;
pub use normalize::ScoreNormalizer;
pub use rerank::Reranker;
pub use vector::{build_vector_index, BruteForceIndex, TensorIndex, VectorIndex};

use serde::{Deserialize, Serialize};

/// Retrieval channel that produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalSource {
    Bm25,
    Dense,
}

impl std::fmt::Display for RetrievalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalSource::Bm25 => write!(f, "bm25"),
            RetrievalSource::Dense => write!(f, "dense"),
        }
    }
}

/// A document found by one retrieval channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub doc_id: usize,
    pub raw_score: f32,
    pub source: RetrievalSource,
}

/// A candidate after cross-encoder scoring
///
/// `score` alone decides the order; the retrieval source and score are
/// kept for provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub doc_id: usize,
    pub score: f32,
    pub origin_source: RetrievalSource,
    pub origin_score: f32,
}

/// Indices of `scores` ordered by descending score, ties by index ascending,
/// truncated to `k`.
pub(crate) fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    order.truncate(k);
    order
}
