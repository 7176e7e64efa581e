//! Evidence Core - Hybrid evidence retrieval and scoring for fact-checking
//!
//! This crate provides:
//! - Per-claim document store and claim identity
//! - BM25 (Tantivy) and dense (Candle) indexes with lexical-first fusion
//! - Cross-encoder reranking and per-query score normalization
//! - Domain credibility, stance and writing-style signals
//! - Bounded-concurrency page enrichment
//! - Evidence assembly and the JSON report
//! - Configuration management

pub mod config;
pub mod credibility;
pub mod document;
pub mod enrich;
pub mod error;
pub mod evidence;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod polarity;
pub mod search;
pub mod style;

// Re-export commonly used types
pub use config::{RetrievalConfig, StanceBackend, VectorBackend};
pub use credibility::CredibilityPolicy;
pub use document::{Claim, Document, DocumentStore, PoolDocument};
pub use enrich::Enricher;
pub use error::{EvidenceError, FetchError, IndexError, ModelError, Result};
pub use evidence::{Evidence, EvidenceMetadata, EvidenceReport};
pub use fetch::{HttpPageFetcher, PageContent, PageFetcher};
pub use models::ModelServices;
pub use pipeline::EvidenceAssembler;
pub use polarity::{Polarity, StanceClassifier};
pub use search::{Candidate, HybridRetriever, RankedCandidate, RetrievalSource};
pub use style::WritingStyle;
