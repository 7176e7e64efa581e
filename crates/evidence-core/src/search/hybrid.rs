//! Hybrid retrieval: BM25 and dense channels, fused and reranked

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::VectorBackend;
use crate::document::DocumentStore;
use crate::error::EvidenceError;
use crate::models::{ModelServices, TextEmbedder};
use crate::search::fusion::CandidateFusion;
use crate::search::indexer::EvidenceIndex;
use crate::search::rerank::Reranker;
use crate::search::{Candidate, RankedCandidate, RetrievalSource};

/// Queries both indexes of one [`EvidenceIndex`] and reranks the union
pub struct HybridRetriever {
    index: EvidenceIndex,
    embedder: Arc<dyn TextEmbedder>,
    reranker: Reranker,
}

impl HybridRetriever {
    pub fn new(index: EvidenceIndex, services: &ModelServices) -> Self {
        Self {
            index,
            embedder: services.embedder.clone(),
            reranker: Reranker::new(services.scorer.clone()),
        }
    }

    /// Fit the indexes over `store` and wrap them in a retriever
    pub fn fit(
        store: DocumentStore,
        services: &ModelServices,
        backend: VectorBackend,
    ) -> Result<Self, EvidenceError> {
        let index = EvidenceIndex::fit(store, services.embedder.as_ref(), backend, &services.device)?;
        Ok(Self::new(index, services))
    }

    pub fn store(&self) -> &DocumentStore {
        self.index.store()
    }

    /// Top-k by BM25 score, ties by doc id ascending
    pub fn retrieve_bm25(&self, query: &str, k: usize) -> Result<Vec<Candidate>, EvidenceError> {
        let hits = self.index.keyword().search(query, k)?;
        Ok(hits
            .into_iter()
            .map(|(doc_id, raw_score)| Candidate {
                doc_id,
                raw_score,
                source: RetrievalSource::Bm25,
            })
            .collect())
    }

    /// Top-k by cosine similarity to the query embedding
    pub fn retrieve_dense(&self, query: &str, k: usize) -> Result<Vec<Candidate>, EvidenceError> {
        if self.index.vectors().is_empty() {
            return Ok(Vec::new());
        }
        let query_vector = self.embedder.embed(query)?;
        let hits = self.index.vectors().search(&query_vector, k)?;
        Ok(hits
            .into_iter()
            .map(|(doc_id, raw_score)| Candidate {
                doc_id,
                raw_score,
                source: RetrievalSource::Dense,
            })
            .collect())
    }

    /// Deduplicated union of both channels, lexical results first
    pub fn candidates(
        &self,
        query: &str,
        bm25_k: usize,
        dense_k: usize,
    ) -> Result<Vec<Candidate>, EvidenceError> {
        let lexical = self.retrieve_bm25(query, bm25_k)?;
        let dense = self.retrieve_dense(query, dense_k)?;
        debug!(
            "Retrieved {} lexical and {} dense candidates",
            lexical.len(),
            dense.len()
        );
        Ok(CandidateFusion::fuse(lexical, dense))
    }

    /// Fuse both channels, rerank with the cross-encoder and keep the top k
    #[instrument(skip(self, query), fields(documents = self.index.len()))]
    pub fn search(
        &self,
        query: &str,
        k: usize,
        bm25_k: usize,
        dense_k: usize,
    ) -> Result<Vec<RankedCandidate>, EvidenceError> {
        let fused = self.candidates(query, bm25_k, dense_k)?;
        let ranked = self.reranker.rerank(query, &fused, self.store(), k)?;
        Ok(ranked)
    }
}
