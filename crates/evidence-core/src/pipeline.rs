//! Evidence assembly: retrieval output to the final ranked evidence list
//!
//! Retrieval, reranking, normalization and scoring run synchronously; the
//! only suspension point is page enrichment.

use std::cmp::Ordering;
use tracing::{info, instrument};

use crate::config::RetrievalConfig;
use crate::credibility::CredibilityPolicy;
use crate::document::{Claim, DocumentStore, PoolDocument};
use crate::enrich::Enricher;
use crate::error::Result;
use crate::evidence::{
    evidence_id, Evidence, EvidenceMetadata, EvidenceReport, PublicationHistory, SourceType,
};
use crate::models::ModelServices;
use crate::polarity::Polarity;
use crate::search::{HybridRetriever, RankedCandidate, ScoreNormalizer};
use crate::style;

/// Runs one claim evaluation end to end
pub struct EvidenceAssembler {
    config: RetrievalConfig,
    services: ModelServices,
    credibility: CredibilityPolicy,
    enricher: Option<Enricher>,
}

impl EvidenceAssembler {
    /// Assembler without enrichment; snippets stay as retrieved
    pub fn new(config: RetrievalConfig, services: ModelServices) -> Self {
        Self {
            config,
            services,
            credibility: CredibilityPolicy::default(),
            enricher: None,
        }
    }

    pub fn with_enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_credibility(mut self, credibility: CredibilityPolicy) -> Self {
        self.credibility = credibility;
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Index the pool, retrieve and rank evidence for `claim`
    ///
    /// An empty pool is replaced by the claim text itself, so the report
    /// always holds at least one item. Model and index failures are fatal.
    #[instrument(skip_all, fields(claim_id = %claim.id, pool = pool.len()))]
    pub async fn run(&self, claim: &Claim, pool: Vec<PoolDocument>) -> Result<EvidenceReport> {
        let pool = if self.config.prefetch_pool {
            self.prefetch(pool).await
        } else {
            pool
        };

        let store = DocumentStore::from_pool_or_claim(pool, claim);
        let retriever = HybridRetriever::fit(store, &self.services, self.config.vector_backend)?;

        let ranked = retriever.search(
            &claim.text,
            self.config.final_k,
            self.config.bm25_k,
            self.config.dense_k,
        )?;

        let mut evidences = self.assemble(&ranked, retriever.store());
        self.enrich(&mut evidences).await;
        self.assign_polarity(claim, &mut evidences);

        info!("Assembled {} evidence items", evidences.len());

        Ok(EvidenceReport {
            claim_id: claim.id.clone(),
            claim_text: claim.text.clone(),
            retrieved_evidences: evidences,
        })
    }

    /// Normalize, attach credibility, sort and number the reranked candidates
    ///
    /// The result is ordered by `(relevance_score, credibility_score)`
    /// descending; ties keep reranked order. Polarity is left neutral.
    pub fn assemble(&self, ranked: &[RankedCandidate], store: &DocumentStore) -> Vec<Evidence> {
        let raw_scores: Vec<f32> = ranked.iter().map(|r| r.score).collect();
        let normalizer = ScoreNormalizer::fit(&raw_scores);

        let mut evidences: Vec<Evidence> = ranked
            .iter()
            .filter_map(|candidate| {
                let doc = store.get(candidate.doc_id)?;
                let domain = doc.domain.clone();
                let credibility = round_to(self.credibility.score(domain.as_deref()) as f64, 2);
                let snippet = truncate_chars(&doc.text, self.config.snippet_chars);

                Some(Evidence {
                    evidence_id: String::new(),
                    url: Some(doc.url.clone()).filter(|u| !u.is_empty()),
                    publication_date: None,
                    raw_relevance_score: candidate.score as f64,
                    relevance_score: round_to(normalizer.normalize(candidate.score) as f64, 4),
                    credibility_score: credibility,
                    polarity: Polarity::Neutral,
                    metadata: EvidenceMetadata {
                        source_type: SourceType::classify(&doc.url, &snippet, domain.as_deref()),
                        author: None,
                        publication_history: PublicationHistory::from_credibility(credibility),
                        writing_style_features: style::analyze(&snippet),
                    },
                    domain,
                    snippet,
                })
            })
            .collect();

        sort_evidence(&mut evidences);
        for (rank, evidence) in evidences.iter_mut().enumerate() {
            evidence.evidence_id = evidence_id(rank + 1);
        }
        evidences
    }

    /// Replace snippet, date, author and style with fetched page data for the
    /// top `enrich_top_k` items; failed fetches leave an item untouched.
    pub async fn enrich(&self, evidences: &mut [Evidence]) {
        let Some(enricher) = &self.enricher else {
            return;
        };

        let top = self.config.enrich_top_k.min(evidences.len());
        let urls: Vec<String> = evidences[..top]
            .iter()
            .filter_map(|e| e.url.clone())
            .collect();
        let pages = enricher.fetch_all(&urls).await;

        for evidence in evidences.iter_mut() {
            let Some(page) = evidence.url.as_ref().and_then(|u| pages.get(u)) else {
                continue;
            };
            evidence.snippet = truncate_chars(&page.text, self.config.snippet_chars);
            evidence.publication_date = page.publication_date.clone();
            evidence.metadata.author = page.author.clone();
            evidence.metadata.writing_style_features = style::analyze(&page.text);
        }
    }

    /// Classify every item against the claim, on its current snippet
    pub fn assign_polarity(&self, claim: &Claim, evidences: &mut [Evidence]) {
        for evidence in evidences.iter_mut() {
            evidence.polarity = self.services.stance.classify(&claim.text, &evidence.snippet);
        }
    }

    /// Swap pool text for full page text where a fetch succeeds
    async fn prefetch(&self, pool: Vec<PoolDocument>) -> Vec<PoolDocument> {
        let Some(enricher) = &self.enricher else {
            return pool;
        };

        let mut urls: Vec<String> = Vec::new();
        for doc in &pool {
            if !doc.url.is_empty() && !urls.contains(&doc.url) {
                urls.push(doc.url.clone());
            }
        }
        urls.truncate(self.config.prefetch_limit);

        let pages = enricher.fetch_all(&urls).await;
        pool.into_iter()
            .map(|doc| match pages.get(&doc.url) {
                Some(page) => PoolDocument::new(page.text.clone(), doc.url),
                None => doc,
            })
            .collect()
    }
}

/// Stable sort by relevance, then credibility, both descending
pub fn sort_evidence(evidences: &mut [Evidence]) {
    evidences.sort_by(|a, b| {
        b.relevance_score
            .total_cmp(&a.relevance_score)
            .then_with(|| b.credibility_score.total_cmp(&a.credibility_score))
    });
}

/// True when `evidences` is in final rank order
pub fn is_rank_ordered(evidences: &[Evidence]) -> bool {
    evidences.windows(2).all(|pair| {
        let ordering = pair[0]
            .relevance_score
            .total_cmp(&pair[1].relevance_score)
            .then_with(|| pair[0].credibility_score.total_cmp(&pair[1].credibility_score));
        ordering != Ordering::Less
    })
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
