//! Per-run lexical and dense indexes over the document store

use candle_core::Device;
use tracing::{info, instrument};

use crate::config::VectorBackend;
use crate::document::DocumentStore;
use crate::error::{EvidenceError, IndexError};
use crate::models::TextEmbedder;
use crate::search::keyword::KeywordIndex;
use crate::search::vector::{build_vector_index, VectorIndex};

/// The document store together with both of its indexes
///
/// Immutable once fitted; a different pool needs a fresh `fit`.
pub struct EvidenceIndex {
    store: DocumentStore,
    keyword: KeywordIndex,
    vectors: Box<dyn VectorIndex>,
}

impl EvidenceIndex {
    /// Tokenize and BM25-index every document, then embed every document
    ///
    /// An empty store produces indexes with zero documents. Embedding
    /// failures are fatal.
    #[instrument(skip_all, fields(documents = store.len(), backend = ?backend))]
    pub fn fit(
        store: DocumentStore,
        embedder: &dyn TextEmbedder,
        backend: VectorBackend,
        device: &Device,
    ) -> Result<Self, EvidenceError> {
        let keyword = KeywordIndex::build(store.documents())?;

        let texts: Vec<&str> = store.documents().iter().map(|d| d.text.as_str()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed_batch(&texts)?
        };
        if embeddings.len() != texts.len() {
            return Err(IndexError::Vector(format!(
                "embedded {} of {} documents",
                embeddings.len(),
                texts.len()
            ))
            .into());
        }

        let vectors = build_vector_index(backend, embeddings, embedder.dimension(), device)?;

        info!(
            "Indexed {} documents (vector backend: {})",
            store.len(),
            vectors.name()
        );

        Ok(Self {
            store,
            keyword,
            vectors,
        })
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn keyword(&self) -> &KeywordIndex {
        &self.keyword
    }

    pub fn vectors(&self) -> &dyn VectorIndex {
        self.vectors.as_ref()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
