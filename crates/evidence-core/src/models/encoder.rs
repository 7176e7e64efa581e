//! BERT/RoBERTa transformer encoder on candle
//!
//! One encoder serves all three model services; they differ only in the
//! head applied to its output (mean pooling, `[CLS]` classifier).

use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{embedding, layer_norm, linear, Activation, Embedding, LayerNorm, Linear, VarBuilder};
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::ModelError;

/// Model configuration loaded from config.json
#[derive(Debug, Clone, Deserialize)]
pub struct EncoderConfig {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    #[serde(default = "default_hidden_act")]
    pub hidden_act: String,
    pub max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size: usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
    #[serde(default)]
    pub pad_token_id: usize,
    #[serde(default)]
    pub model_type: String,
    #[serde(default)]
    pub id2label: HashMap<String, String>,
}

fn default_hidden_act() -> String {
    "gelu".to_string()
}

fn default_type_vocab_size() -> usize {
    2
}

fn default_layer_norm_eps() -> f64 {
    1e-12
}

impl EncoderConfig {
    pub fn is_roberta(&self) -> bool {
        matches!(self.model_type.as_str(), "roberta" | "xlm-roberta" | "camembert")
    }

    /// RoBERTa positions start after the padding index.
    pub fn position_offset(&self) -> usize {
        if self.is_roberta() {
            self.pad_token_id + 1
        } else {
            0
        }
    }

    pub fn num_labels(&self) -> usize {
        self.id2label.len().max(1)
    }

    /// Label name for a class index, lowercased
    pub fn label(&self, index: usize) -> Option<String> {
        self.id2label.get(&index.to_string()).map(|l| l.to_lowercase())
    }
}

struct EncoderEmbeddings {
    word_embeddings: Embedding,
    position_embeddings: Embedding,
    token_type_embeddings: Embedding,
    layer_norm: LayerNorm,
    position_offset: usize,
}

impl EncoderEmbeddings {
    fn load(vb: VarBuilder, config: &EncoderConfig) -> Result<Self, ModelError> {
        let word_embeddings =
            embedding(config.vocab_size, config.hidden_size, vb.pp("word_embeddings"))?;
        let position_embeddings = embedding(
            config.max_position_embeddings,
            config.hidden_size,
            vb.pp("position_embeddings"),
        )?;
        let token_type_embeddings = embedding(
            config.type_vocab_size,
            config.hidden_size,
            vb.pp("token_type_embeddings"),
        )?;
        let layer_norm = layer_norm(config.hidden_size, config.layer_norm_eps, vb.pp("LayerNorm"))?;

        Ok(Self {
            word_embeddings,
            position_embeddings,
            token_type_embeddings,
            layer_norm,
            position_offset: config.position_offset(),
        })
    }

    fn forward(&self, input_ids: &Tensor, token_type_ids: &Tensor) -> Result<Tensor, ModelError> {
        let seq_len = input_ids.dim(1)?;
        let start = self.position_offset as u32;
        let position_ids =
            Tensor::arange(start, start + seq_len as u32, input_ids.device())?.unsqueeze(0)?;

        let word_embeds = self.word_embeddings.forward(input_ids)?;
        let position_embeds = self.position_embeddings.forward(&position_ids)?;
        let token_type_embeds = self.token_type_embeddings.forward(token_type_ids)?;

        let embeddings = word_embeds
            .broadcast_add(&position_embeds)?
            .broadcast_add(&token_type_embeds)?;
        Ok(self.layer_norm.forward(&embeddings)?)
    }
}

struct SelfAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    num_attention_heads: usize,
    attention_head_size: usize,
}

impl SelfAttention {
    fn load(vb: VarBuilder, config: &EncoderConfig) -> Result<Self, ModelError> {
        let attention_head_size = config.hidden_size / config.num_attention_heads;
        let all_head_size = config.num_attention_heads * attention_head_size;

        Ok(Self {
            query: linear(config.hidden_size, all_head_size, vb.pp("query"))?,
            key: linear(config.hidden_size, all_head_size, vb.pp("key"))?,
            value: linear(config.hidden_size, all_head_size, vb.pp("value"))?,
            num_attention_heads: config.num_attention_heads,
            attention_head_size,
        })
    }

    /// [batch, seq, hidden] -> [batch, heads, seq, head_size]
    fn split_heads(&self, x: &Tensor) -> Result<Tensor, ModelError> {
        let (batch, seq_len, _) = x.dims3()?;
        Ok(x
            .reshape((batch, seq_len, self.num_attention_heads, self.attention_head_size))?
            .transpose(1, 2)?
            .contiguous()?)
    }

    fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor, ModelError> {
        let (batch, seq_len, hidden) = hidden_states.dims3()?;

        let query_layer = self.split_heads(&self.query.forward(hidden_states)?)?;
        let key_layer = self.split_heads(&self.key.forward(hidden_states)?)?;
        let value_layer = self.split_heads(&self.value.forward(hidden_states)?)?;

        let scores = query_layer.matmul(&key_layer.t()?.contiguous()?)?;
        let scores = (scores / (self.attention_head_size as f64).sqrt())?;
        let scores = scores.broadcast_add(attention_mask)?;
        let probs = candle_nn::ops::softmax_last_dim(&scores)?;

        let context = probs.matmul(&value_layer)?;
        Ok(context
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, seq_len, hidden))?)
    }
}

/// Dense + residual + LayerNorm, used after attention and after the FFN
struct ResidualOutput {
    dense: Linear,
    layer_norm: LayerNorm,
}

impl ResidualOutput {
    fn load(vb: VarBuilder, in_dim: usize, config: &EncoderConfig) -> Result<Self, ModelError> {
        Ok(Self {
            dense: linear(in_dim, config.hidden_size, vb.pp("dense"))?,
            layer_norm: layer_norm(config.hidden_size, config.layer_norm_eps, vb.pp("LayerNorm"))?,
        })
    }

    fn forward(&self, hidden_states: &Tensor, input_tensor: &Tensor) -> Result<Tensor, ModelError> {
        let hidden_states = self.dense.forward(hidden_states)?;
        Ok(self.layer_norm.forward(&(hidden_states + input_tensor)?)?)
    }
}

struct EncoderLayer {
    attention: SelfAttention,
    attention_output: ResidualOutput,
    intermediate: Linear,
    activation: Activation,
    output: ResidualOutput,
}

impl EncoderLayer {
    fn load(vb: VarBuilder, config: &EncoderConfig) -> Result<Self, ModelError> {
        let activation = match config.hidden_act.as_str() {
            "relu" => Activation::Relu,
            _ => Activation::Gelu,
        };

        Ok(Self {
            attention: SelfAttention::load(vb.pp("attention").pp("self"), config)?,
            attention_output: ResidualOutput::load(
                vb.pp("attention").pp("output"),
                config.hidden_size,
                config,
            )?,
            intermediate: linear(
                config.hidden_size,
                config.intermediate_size,
                vb.pp("intermediate").pp("dense"),
            )?,
            activation,
            output: ResidualOutput::load(vb.pp("output"), config.intermediate_size, config)?,
        })
    }

    fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> Result<Tensor, ModelError> {
        let attended = self.attention.forward(hidden_states, attention_mask)?;
        let attended = self.attention_output.forward(&attended, hidden_states)?;
        let intermediate = self.activation.forward(&self.intermediate.forward(&attended)?)?;
        self.output.forward(&intermediate, &attended)
    }
}

/// Embeddings + transformer stack
pub struct TransformerEncoder {
    embeddings: EncoderEmbeddings,
    layers: Vec<EncoderLayer>,
    config: EncoderConfig,
}

impl TransformerEncoder {
    /// `vb` must point at the encoder root (the level holding `embeddings`
    /// and `encoder`).
    pub fn load(vb: VarBuilder, config: EncoderConfig) -> Result<Self, ModelError> {
        let embeddings = EncoderEmbeddings::load(vb.pp("embeddings"), &config)?;

        let vb_layers = vb.pp("encoder").pp("layer");
        let layers = (0..config.num_hidden_layers)
            .map(|i| EncoderLayer::load(vb_layers.pp(i), &config))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            embeddings,
            layers,
            config,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Run the encoder over one tokenized sequence
    ///
    /// Inputs are `[1, seq]` u32 tensors; output is `[1, seq, hidden]`.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor, ModelError> {
        let mask = extended_attention_mask(attention_mask)?;
        let mut hidden_states = self.embeddings.forward(input_ids, token_type_ids)?;
        for layer in &self.layers {
            hidden_states = layer.forward(&hidden_states, &mask)?;
        }
        Ok(hidden_states)
    }
}

/// [batch, seq] of 0/1 -> [batch, 1, 1, seq] additive mask (0 attend, -10000 ignore)
fn extended_attention_mask(attention_mask: &Tensor) -> Result<Tensor, ModelError> {
    let (batch, seq_len) = attention_mask.dims2()?;
    let mask = attention_mask.to_dtype(DType::F32)?.affine(-1.0, 1.0)?;
    let mask = (mask * -10000.0)?;
    Ok(mask.reshape((batch, 1, 1, seq_len))?)
}

/// Tensor inputs for one encoding
pub struct EncodedInput {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

impl EncodedInput {
    pub fn from_encoding(
        encoding: &tokenizers::Encoding,
        config: &EncoderConfig,
        device: &Device,
    ) -> Result<Self, ModelError> {
        let ids = encoding.get_ids();
        if ids.is_empty() {
            return Err(ModelError::Tokenizer("empty encoding".to_string()));
        }

        let input_ids = Tensor::new(ids, device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), device)?.unsqueeze(0)?;
        let token_type_ids = if config.type_vocab_size > 1 {
            Tensor::new(encoding.get_type_ids(), device)?.unsqueeze(0)?
        } else {
            Tensor::zeros((1, ids.len()), DType::U32, device)?
        };

        Ok(Self {
            input_ids,
            token_type_ids,
            attention_mask,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_json(model_type: &str, labels: &str) -> String {
        format!(
            r#"{{
                "vocab_size": 100,
                "hidden_size": 8,
                "num_hidden_layers": 1,
                "num_attention_heads": 2,
                "intermediate_size": 16,
                "max_position_embeddings": 64,
                "pad_token_id": 1,
                "model_type": "{}",
                "id2label": {}
            }}"#,
            model_type, labels
        )
    }

    #[test]
    fn test_config_defaults() {
        let config: EncoderConfig = serde_json::from_str(&config_json("bert", "{}")).unwrap();

        assert_eq!(config.hidden_act, "gelu");
        assert_eq!(config.type_vocab_size, 2);
        assert!(!config.is_roberta());
        assert_eq!(config.position_offset(), 0);
        assert_eq!(config.num_labels(), 1);
    }

    #[test]
    fn test_roberta_labels() {
        let config: EncoderConfig = serde_json::from_str(&config_json(
            "roberta",
            r#"{"0": "CONTRADICTION", "1": "NEUTRAL", "2": "ENTAILMENT"}"#,
        ))
        .unwrap();

        assert!(config.is_roberta());
        assert_eq!(config.position_offset(), 2);
        assert_eq!(config.num_labels(), 3);
        assert_eq!(config.label(2).as_deref(), Some("entailment"));
        assert_eq!(config.label(7), None);
    }

    #[test]
    fn test_extended_mask() {
        let mask = Tensor::new(&[[1u32, 1, 0]], &Device::Cpu).unwrap();
        let extended = extended_attention_mask(&mask).unwrap();

        assert_eq!(extended.dims(), &[1, 1, 1, 3]);
        let values = extended.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(values, vec![0.0, 0.0, -10000.0]);
    }

    #[test]
    fn test_forward_with_random_weights() {
        let config: EncoderConfig = serde_json::from_str(&config_json("bert", "{}")).unwrap();
        let varmap = candle_nn::VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let encoder = TransformerEncoder::load(vb, config).unwrap();

        let ids = Tensor::new(&[[3u32, 7, 9, 2]], &Device::Cpu).unwrap();
        let types = Tensor::zeros((1, 4), DType::U32, &Device::Cpu).unwrap();
        let mask = Tensor::ones((1, 4), DType::U32, &Device::Cpu).unwrap();

        let output = encoder.forward(&ids, &types, &mask).unwrap();
        assert_eq!(output.dims(), &[1, 4, 8]);
    }
}
