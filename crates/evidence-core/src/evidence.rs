//! Evidence records and the per-run JSON report

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::EvidenceError;
use crate::polarity::Polarity;
use crate::style::WritingStyle;

const FACT_CHECK_MARKERS: &[&str] = &["fact-check", "politifact", "snopes", "factcheck"];

/// Credibility at or above which a source counts as reputable
pub const REPUTABLE_THRESHOLD: f64 = 0.9;
/// Credibility at or above which a source counts as mixed
pub const MIXED_THRESHOLD: f64 = 0.6;

/// Where an evidence item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    #[serde(rename = "fact-checking organization")]
    FactChecker,
    #[serde(rename = "web")]
    Web,
    #[serde(rename = "local_corpus")]
    LocalCorpus,
}

impl SourceType {
    /// Fact-checkers are recognized from the URL or snippet; anything else
    /// with a domain is `web`, and domainless items came from the local corpus.
    pub fn classify(url: &str, snippet: &str, domain: Option<&str>) -> Self {
        let haystack = format!("{} {}", url, snippet).to_lowercase();
        if FACT_CHECK_MARKERS.iter().any(|m| haystack.contains(m)) {
            SourceType::FactChecker
        } else if domain.is_some() {
            SourceType::Web
        } else {
            SourceType::LocalCorpus
        }
    }
}

/// Trust band derived from the credibility score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationHistory {
    Reputable,
    Mixed,
    Flagged,
}

impl PublicationHistory {
    pub fn from_credibility(score: f64) -> Self {
        if score >= REPUTABLE_THRESHOLD {
            PublicationHistory::Reputable
        } else if score >= MIXED_THRESHOLD {
            PublicationHistory::Mixed
        } else {
            PublicationHistory::Flagged
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceMetadata {
    pub source_type: SourceType,
    pub author: Option<String>,
    pub publication_history: PublicationHistory,
    pub writing_style_features: WritingStyle,
}

/// One ranked evidence item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// `EV-001`, `EV-002`, ... in final rank order
    pub evidence_id: String,
    #[serde(rename = "evidence_snippet")]
    pub snippet: String,
    pub url: Option<String>,
    pub domain: Option<String>,
    pub publication_date: Option<String>,
    /// Cross-encoder score before normalization
    pub raw_relevance_score: f64,
    /// Per-query normalized relevance in [0, 1], 4 decimals
    pub relevance_score: f64,
    /// Domain trust, 2 decimals
    pub credibility_score: f64,
    pub polarity: Polarity,
    pub metadata: EvidenceMetadata,
}

/// `EV-%03d`, 1-based
pub fn evidence_id(rank: usize) -> String {
    format!("EV-{:03}", rank)
}

/// Final output of one claim evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceReport {
    pub claim_id: String,
    pub claim_text: String,
    pub retrieved_evidences: Vec<Evidence>,
}

impl EvidenceReport {
    pub fn to_json_pretty(&self) -> Result<String, EvidenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report, replacing any previous file at `path`
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), EvidenceError> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
