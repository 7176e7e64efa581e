//! Configuration for the evidence pipeline
//!
//! Every field has a default, so an empty TOML file or an empty
//! environment produces a working configuration.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Hard upper bound on how many evidence items are enriched per run
pub const MAX_ENRICH_TOP_K: usize = 12;

/// Dense similarity backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorBackend {
    /// Normalized matrix on the model device, one matmul per query
    #[default]
    Tensor,
    /// Pure Rust cosine loop
    BruteForce,
}

impl FromStr for VectorBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tensor" | "flat" => Ok(VectorBackend::Tensor),
            "brute_force" | "brute-force" | "bruteforce" => Ok(VectorBackend::BruteForce),
            _ => Err(anyhow!("Unknown vector backend: {}", s)),
        }
    }
}

/// Stance classifier backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StanceBackend {
    Nli,
    #[default]
    Keyword,
}

impl FromStr for StanceBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "nli" => Ok(StanceBackend::Nli),
            "keyword" | "keywords" => Ok(StanceBackend::Keyword),
            _ => Err(anyhow!("Unknown stance backend: {}", s)),
        }
    }
}

/// Device the candle models run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevicePreference {
    /// CUDA, then Metal, then CPU
    #[default]
    Auto,
    Cpu,
    Cuda,
    Metal,
}

impl FromStr for DevicePreference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda),
            "metal" => Ok(DevicePreference::Metal),
            _ => Err(anyhow!("Unknown device: {}", s)),
        }
    }
}

/// Where each model comes from. A value is either a local directory holding
/// `config.json`, `tokenizer.json` and `model.safetensors`, or a hub repo id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub embedding: String,
    pub cross_encoder: String,
    pub nli: String,
    pub max_seq_len: usize,
    pub device: DevicePreference,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            cross_encoder: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            nli: "roberta-large-mnli".to_string(),
            max_seq_len: 512,
            device: DevicePreference::Auto,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Top-k kept after reranking
    pub final_k: usize,
    /// Lexical channel depth
    pub bm25_k: usize,
    /// Dense channel depth
    pub dense_k: usize,
    /// Evidence items eligible for page enrichment (at most 12)
    pub enrich_top_k: usize,
    /// Concurrent page fetches
    pub fetch_workers: usize,
    /// Per-request timeout in seconds
    pub fetch_timeout_secs: u64,
    /// Snippet length in characters
    pub snippet_chars: usize,
    /// Fetch full page text for the pool before indexing
    pub prefetch_pool: bool,
    /// Max distinct URLs fetched by the prefetch
    pub prefetch_limit: usize,
    pub vector_backend: VectorBackend,
    pub stance_backend: StanceBackend,
    pub models: ModelConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            final_k: 200,
            bm25_k: 500,
            dense_k: 500,
            enrich_top_k: MAX_ENRICH_TOP_K,
            fetch_workers: 6,
            fetch_timeout_secs: 8,
            snippet_chars: 1000,
            prefetch_pool: false,
            prefetch_limit: 80,
            vector_backend: VectorBackend::Tensor,
            stance_backend: StanceBackend::Keyword,
            models: ModelConfig::default(),
        }
    }
}

impl RetrievalConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        Ok(config.clamped())
    }

    /// Load configuration from environment variables
    ///
    /// Recognized variables (all optional):
    /// - EVIDENCE_FINAL_K, EVIDENCE_BM25_K, EVIDENCE_DENSE_K
    /// - EVIDENCE_FETCH_WORKERS, EVIDENCE_FETCH_TIMEOUT_SECS
    /// - EVIDENCE_PREFETCH_POOL: "true" or "false"
    /// - EVIDENCE_VECTOR_BACKEND: "tensor" or "brute_force"
    /// - EVIDENCE_STANCE_BACKEND: "nli" or "keyword"
    /// - EVIDENCE_EMBEDDING_MODEL, EVIDENCE_CROSS_ENCODER_MODEL, EVIDENCE_NLI_MODEL
    /// - EVIDENCE_DEVICE: "auto", "cpu", "cuda" or "metal"
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `EVIDENCE_*` environment overrides on top of this configuration
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup on top of the defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_overrides(lookup)
    }

    /// Apply overrides from an arbitrary key lookup on top of this configuration
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_parsed(&lookup, "EVIDENCE_FINAL_K", &mut self.final_k)?;
        override_parsed(&lookup, "EVIDENCE_BM25_K", &mut self.bm25_k)?;
        override_parsed(&lookup, "EVIDENCE_DENSE_K", &mut self.dense_k)?;
        override_parsed(&lookup, "EVIDENCE_FETCH_WORKERS", &mut self.fetch_workers)?;
        override_parsed(&lookup, "EVIDENCE_FETCH_TIMEOUT_SECS", &mut self.fetch_timeout_secs)?;
        override_parsed(&lookup, "EVIDENCE_PREFETCH_POOL", &mut self.prefetch_pool)?;
        override_parsed(&lookup, "EVIDENCE_VECTOR_BACKEND", &mut self.vector_backend)?;
        override_parsed(&lookup, "EVIDENCE_STANCE_BACKEND", &mut self.stance_backend)?;
        override_parsed(&lookup, "EVIDENCE_DEVICE", &mut self.models.device)?;

        if let Some(model) = lookup("EVIDENCE_EMBEDDING_MODEL") {
            self.models.embedding = model;
        }
        if let Some(model) = lookup("EVIDENCE_CROSS_ENCODER_MODEL") {
            self.models.cross_encoder = model;
        }
        if let Some(model) = lookup("EVIDENCE_NLI_MODEL") {
            self.models.nli = model;
        }

        Ok(self.clamped())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    fn clamped(mut self) -> Self {
        self.enrich_top_k = self.enrich_top_k.min(MAX_ENRICH_TOP_K);
        self.fetch_workers = self.fetch_workers.max(1);
        self
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid value for {}: {} ({})", key, raw, e))?;
    }
    Ok(())
}
