//! Model services: sentence embedding, cross-encoder relevance and NLI stance
//!
//! Each capability is a trait so the pipeline can be driven by the candle
//! implementations in production and by lightweight doubles in tests.
//! Handles are constructed once, shared behind `Arc`, and released with
//! [`ModelServices::shutdown`].

pub mod cross_encoder;
pub mod embedding;
pub mod encoder;
pub mod head;
pub mod loader;
pub mod nli;

pub use cross_encoder::CrossEncoder;
pub use embedding::SentenceEmbedder;
pub use nli::NliModel;

use candle_core::Device;
use std::sync::Arc;
use tracing::info;

use crate::config::{ModelConfig, StanceBackend};
use crate::error::ModelError;
use crate::polarity::{KeywordStanceClassifier, NliStanceClassifier, StanceClassifier};

/// Encodes text into a fixed-dimension vector
pub trait TextEmbedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError>;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ModelError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize;
}

/// Jointly scores (query, text) pairs; higher is more relevant
pub trait PairScorer: Send + Sync {
    fn score_pairs(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>, ModelError>;
}

/// Natural-language-inference label for a (premise, hypothesis) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stance {
    Entailment,
    Neutral,
    Contradiction,
}

/// Scores a (premise, hypothesis) pair as entailment, neutral or contradiction
pub trait EntailmentModel: Send + Sync {
    fn infer(&self, premise: &str, hypothesis: &str) -> Result<Stance, ModelError>;
}

/// The model handles one pipeline needs
#[derive(Clone)]
pub struct ModelServices {
    pub embedder: Arc<dyn TextEmbedder>,
    pub scorer: Arc<dyn PairScorer>,
    pub stance: Arc<dyn StanceClassifier>,
    /// Device the models (and the tensor vector index) run on
    pub device: Device,
}

impl ModelServices {
    /// Load the candle models named by `config`
    ///
    /// Any failure here is fatal: there is no fallback for a missing
    /// embedding or cross-encoder model. The NLI model is only loaded when
    /// `stance_backend` asks for it.
    pub fn load(config: &ModelConfig, stance_backend: StanceBackend) -> Result<Self, ModelError> {
        let device = loader::select_device(config.device)?;
        info!("Loading models on device: {:?}", device);

        let embedder = SentenceEmbedder::load(&config.embedding, config.max_seq_len, &device)?;
        let scorer = CrossEncoder::load(&config.cross_encoder, config.max_seq_len, &device)?;

        let stance: Arc<dyn StanceClassifier> = match stance_backend {
            StanceBackend::Nli => {
                let model = NliModel::load(&config.nli, config.max_seq_len, &device)?;
                Arc::new(NliStanceClassifier::new(Arc::new(model)))
            }
            StanceBackend::Keyword => Arc::new(KeywordStanceClassifier::new()),
        };

        Ok(Self::from_parts(Arc::new(embedder), Arc::new(scorer), stance).with_device(device))
    }

    /// Assemble services from existing handles, on the CPU
    pub fn from_parts(
        embedder: Arc<dyn TextEmbedder>,
        scorer: Arc<dyn PairScorer>,
        stance: Arc<dyn StanceClassifier>,
    ) -> Self {
        Self {
            embedder,
            scorer,
            stance,
            device: Device::Cpu,
        }
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Release the handles. Weights are freed once the last clone is dropped.
    pub fn shutdown(self) {
        info!(
            stance = self.stance.name(),
            embedder_refs = Arc::strong_count(&self.embedder),
            "Shutting down model services"
        );
    }
}
