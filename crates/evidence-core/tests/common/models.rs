//! Deterministic stand-ins for the candle models

use evidence_core::models::{EntailmentModel, PairScorer, Stance, TextEmbedder};
use evidence_core::polarity::{KeywordStanceClassifier, NliStanceClassifier, StanceClassifier};
use evidence_core::{ModelError, ModelServices};
use std::collections::HashSet;
use std::sync::Arc;

pub const HASH_DIM: usize = 64;

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf29ce484222325, |hash, b| {
        (hash ^ b as u64).wrapping_mul(0x100000001b3)
    })
}

/// Feature-hashed bag of words
pub struct HashingEmbedder;

impl TextEmbedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let mut vector = vec![0.0; HASH_DIM];
        for word in words(text) {
            vector[(fnv1a(&word) % HASH_DIM as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        HASH_DIM
    }
}

/// Fraction of distinct query words present in the text
pub struct OverlapScorer;

impl PairScorer for OverlapScorer {
    fn score_pairs(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>, ModelError> {
        let query: HashSet<String> = words(query).into_iter().collect();
        Ok(texts
            .iter()
            .map(|text| {
                let text: HashSet<String> = words(text).into_iter().collect();
                if query.is_empty() {
                    0.0
                } else {
                    query.intersection(&text).count() as f32 / query.len() as f32
                }
            })
            .collect())
    }
}

/// Entailment when the evidence says "approved", contradiction on "denied"
pub struct CueEntailment;

impl EntailmentModel for CueEntailment {
    fn infer(&self, _premise: &str, hypothesis: &str) -> Result<Stance, ModelError> {
        let text = hypothesis.to_lowercase();
        if text.contains("unparseable") {
            return Err(ModelError::Output("no logits".to_string()));
        }
        Ok(if text.contains("approved") {
            Stance::Entailment
        } else if text.contains("denied") {
            Stance::Contradiction
        } else {
            Stance::Neutral
        })
    }
}

pub fn services_with(stance: Arc<dyn StanceClassifier>) -> ModelServices {
    ModelServices::from_parts(Arc::new(HashingEmbedder), Arc::new(OverlapScorer), stance)
}

pub fn keyword_services() -> ModelServices {
    services_with(Arc::new(KeywordStanceClassifier::new()))
}

pub fn nli_services() -> ModelServices {
    services_with(Arc::new(NliStanceClassifier::new(Arc::new(CueEntailment))))
}
