//! Model file resolution and checkpoint loading

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use std::path::{Path, PathBuf};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::info;

use crate::config::DevicePreference;
use crate::error::ModelError;
use crate::models::encoder::EncoderConfig;

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

/// Pick the device for inference
pub fn select_device(preference: DevicePreference) -> Result<Device, ModelError> {
    let device = match preference {
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Cuda => Device::new_cuda(0)?,
        DevicePreference::Metal => Device::new_metal(0)?,
        DevicePreference::Auto => {
            if candle_core::utils::cuda_is_available() {
                Device::new_cuda(0)?
            } else if candle_core::utils::metal_is_available() {
                Device::new_metal(0)?
            } else {
                Device::Cpu
            }
        }
    };
    Ok(device)
}

/// Paths of the three files every checkpoint needs
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    /// Resolve `source` as a local directory, or as a hub repo id otherwise
    pub fn resolve(source: &str) -> Result<Self, ModelError> {
        let dir = Path::new(source);
        if dir.is_dir() {
            Self::from_dir(dir)
        } else {
            Self::from_hub(source)
        }
    }

    pub fn from_dir(dir: &Path) -> Result<Self, ModelError> {
        let files = Self {
            config: dir.join(CONFIG_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            weights: dir.join(WEIGHTS_FILE),
        };
        for path in [&files.config, &files.tokenizer, &files.weights] {
            if !path.exists() {
                return Err(ModelError::MissingFile(path.display().to_string()));
            }
        }
        Ok(files)
    }

    pub fn from_hub(repo_id: &str) -> Result<Self, ModelError> {
        use hf_hub::api::sync::Api;

        info!("Resolving {} from Hugging Face Hub...", repo_id);

        let hub_error = |e: hf_hub::api::sync::ApiError| ModelError::Hub {
            repo: repo_id.to_string(),
            message: e.to_string(),
        };
        let api = Api::new().map_err(hub_error)?;
        let repo = api.model(repo_id.to_string());

        Ok(Self {
            config: repo.get(CONFIG_FILE).map_err(hub_error)?,
            tokenizer: repo.get(TOKENIZER_FILE).map_err(hub_error)?,
            weights: repo.get(WEIGHTS_FILE).map_err(hub_error)?,
        })
    }
}

/// A loaded checkpoint: parsed config, tokenizer and weight view
pub struct Checkpoint {
    pub config: EncoderConfig,
    pub tokenizer: Tokenizer,
    pub weights: VarBuilder<'static>,
    pub device: Device,
}

impl Checkpoint {
    pub fn open(source: &str, max_seq_len: usize, device: &Device) -> Result<Self, ModelError> {
        let files = ModelFiles::resolve(source)?;

        let config_str = std::fs::read_to_string(&files.config)?;
        let config: EncoderConfig = serde_json::from_str(&config_str)
            .map_err(|e| ModelError::Config(format!("{}: {}", files.config.display(), e)))?;

        info!(
            "Loaded config for {}: {} layers, {} hidden size, {} attention heads",
            source, config.num_hidden_layers, config.hidden_size, config.num_attention_heads
        );

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| ModelError::Tokenizer(format!("failed to load tokenizer: {}", e)))?;
        // Positions beyond the embedding table would index out of bounds.
        let max_length = max_seq_len
            .min(config.max_position_embeddings.saturating_sub(config.position_offset()));
        tokenizer
            .with_padding(None)
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| ModelError::Tokenizer(e.to_string()))?;

        info!("Loading model weights from {}", files.weights.display());

        // SAFETY: the weight file is mapped read-only and not modified while loaded.
        let weights = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights], DType::F32, device)?
        };

        Ok(Self {
            config,
            tokenizer,
            weights,
            device: device.clone(),
        })
    }

    /// Prefix under which the encoder weights live: `bert`, `roberta`, the
    /// model type, or none for bare sentence-transformer exports.
    pub fn encoder_prefix(&self) -> Option<String> {
        let marker = "embeddings.word_embeddings.weight";
        ["bert", "roberta", self.config.model_type.as_str()]
            .into_iter()
            .filter(|prefix| !prefix.is_empty())
            .find(|prefix| self.weights.contains_tensor(&format!("{}.{}", prefix, marker)))
            .map(str::to_string)
    }

    /// Builder rooted at the encoder
    pub fn encoder_weights(&self) -> VarBuilder<'static> {
        match self.encoder_prefix() {
            Some(prefix) => self.weights.pp(prefix),
            None => self.weights.clone(),
        }
    }
}
