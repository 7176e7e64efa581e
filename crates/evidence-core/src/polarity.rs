//! Stance of an evidence item toward the claim
//!
//! Two interchangeable classifiers share the [`StanceClassifier`] contract:
//! an NLI-backed one and a deterministic keyword fallback. Exactly one is
//! active per pipeline.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::{EntailmentModel, Stance};

/// Evidence stance, serialized as `-1`, `0` or `1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Polarity {
    Refutes,
    #[default]
    Neutral,
    Supports,
}

impl Polarity {
    pub fn as_i8(self) -> i8 {
        match self {
            Polarity::Refutes => -1,
            Polarity::Neutral => 0,
            Polarity::Supports => 1,
        }
    }
}

impl From<Polarity> for i8 {
    fn from(polarity: Polarity) -> Self {
        polarity.as_i8()
    }
}

impl TryFrom<i8> for Polarity {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Polarity::Refutes),
            0 => Ok(Polarity::Neutral),
            1 => Ok(Polarity::Supports),
            other => Err(format!("polarity out of range: {}", other)),
        }
    }
}

impl From<Stance> for Polarity {
    fn from(stance: Stance) -> Self {
        match stance {
            Stance::Entailment => Polarity::Supports,
            Stance::Neutral => Polarity::Neutral,
            Stance::Contradiction => Polarity::Refutes,
        }
    }
}

/// Trait for stance classifiers
pub trait StanceClassifier: Send + Sync {
    /// Classify `evidence_text` against `claim_text`. Never fails.
    fn classify(&self, claim_text: &str, evidence_text: &str) -> Polarity;

    /// Get the name of this classifier
    fn name(&self) -> &str;
}

/// Keywords counted as support by the fallback classifier
pub const SUPPORT_KEYWORDS: &[&str] = &[
    "confirm",
    "confirmed",
    "true",
    "supports",
    "agrees",
    "said",
    "reported",
];

/// Keywords counted as refutation by the fallback classifier
pub const REFUTE_KEYWORDS: &[&str] = &[
    "no",
    "false",
    "denies",
    "disagrees",
    "not true",
    "misleading",
    "debunk",
];

/// Keyword-count fallback used when no NLI model is deployed
///
/// Counts how many keywords of each set appear (as substrings) in the
/// lowercased evidence; the larger count wins and a tie is neutral.
#[derive(Debug, Clone)]
pub struct KeywordStanceClassifier {
    support: Vec<String>,
    refute: Vec<String>,
}

impl Default for KeywordStanceClassifier {
    fn default() -> Self {
        Self::with_keywords(SUPPORT_KEYWORDS, REFUTE_KEYWORDS)
    }
}

impl KeywordStanceClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keywords(support: &[&str], refute: &[&str]) -> Self {
        Self {
            support: support.iter().map(|k| k.to_lowercase()).collect(),
            refute: refute.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn hits(keywords: &[String], text: &str) -> usize {
        keywords.iter().filter(|k| text.contains(k.as_str())).count()
    }
}

impl StanceClassifier for KeywordStanceClassifier {
    fn classify(&self, _claim_text: &str, evidence_text: &str) -> Polarity {
        let text = evidence_text.to_lowercase();
        let support = Self::hits(&self.support, &text);
        let refute = Self::hits(&self.refute, &text);

        match support.cmp(&refute) {
            std::cmp::Ordering::Greater => Polarity::Supports,
            std::cmp::Ordering::Less => Polarity::Refutes,
            std::cmp::Ordering::Equal => Polarity::Neutral,
        }
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// NLI-backed classifier; inference failures degrade to neutral
pub struct NliStanceClassifier {
    model: Arc<dyn EntailmentModel>,
}

impl NliStanceClassifier {
    pub fn new(model: Arc<dyn EntailmentModel>) -> Self {
        Self { model }
    }
}

impl StanceClassifier for NliStanceClassifier {
    fn classify(&self, claim_text: &str, evidence_text: &str) -> Polarity {
        match self.model.infer(claim_text, evidence_text) {
            Ok(stance) => stance.into(),
            Err(e) => {
                tracing::warn!(error = %e, "Stance inference failed, using neutral");
                Polarity::Neutral
            }
        }
    }

    fn name(&self) -> &str {
        "nli"
    }
}
