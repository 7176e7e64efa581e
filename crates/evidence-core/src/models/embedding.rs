//! Sentence embeddings: mean-pooled, L2-normalized encoder output

use candle_core::{DType, Device, Tensor};
use tokenizers::Tokenizer;
use tracing::info;

use crate::error::ModelError;
use crate::models::encoder::{EncodedInput, TransformerEncoder};
use crate::models::loader::Checkpoint;
use crate::models::TextEmbedder;

/// Sentence-transformer style embedding model
pub struct SentenceEmbedder {
    encoder: TransformerEncoder,
    tokenizer: Tokenizer,
    device: Device,
}

impl SentenceEmbedder {
    /// Load from a local directory or hub repo id
    pub fn load(source: &str, max_seq_len: usize, device: &Device) -> Result<Self, ModelError> {
        let checkpoint = Checkpoint::open(source, max_seq_len, device)?;
        let encoder = TransformerEncoder::load(checkpoint.encoder_weights(), checkpoint.config)?;

        info!(
            "Embedding model loaded, dimension: {}",
            encoder.config().hidden_size
        );

        Ok(Self {
            encoder,
            tokenizer: checkpoint.tokenizer,
            device: checkpoint.device,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl TextEmbedder for SentenceEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ModelError::Tokenizer(e.to_string()))?;
        let input = EncodedInput::from_encoding(&encoding, self.encoder.config(), &self.device)?;

        let output = self
            .encoder
            .forward(&input.input_ids, &input.token_type_ids, &input.attention_mask)?;
        let pooled = mean_pooling(&output, &input.attention_mask)?;
        let normalized = l2_normalize(&pooled)?;

        Ok(normalized.squeeze(0)?.to_vec1::<f32>()?)
    }

    fn dimension(&self) -> usize {
        self.encoder.config().hidden_size
    }
}

/// [batch, seq, hidden] averaged over unmasked positions -> [batch, hidden]
pub(crate) fn mean_pooling(output: &Tensor, attention_mask: &Tensor) -> Result<Tensor, ModelError> {
    let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
    let sum = output.broadcast_mul(&mask)?.sum(1)?;
    let count = mask.sum(1)?.clamp(1e-9f32, f32::MAX)?;
    Ok(sum.broadcast_div(&count)?)
}

/// Row-wise L2 normalization of a [batch, hidden] tensor
pub(crate) fn l2_normalize(tensor: &Tensor) -> Result<Tensor, ModelError> {
    let norm = tensor.sqr()?.sum_keepdim(1)?.sqrt()?;
    let norm = (norm + 1e-12)?;
    Ok(tensor.broadcast_div(&norm)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pooling_ignores_padding() {
        let output = Tensor::new(&[[[1.0f32, 2.0], [3.0, 4.0], [100.0, 100.0]]], &Device::Cpu).unwrap();
        let mask = Tensor::new(&[[1u32, 1, 0]], &Device::Cpu).unwrap();

        let pooled = mean_pooling(&output, &mask).unwrap();
        assert_eq!(pooled.to_vec2::<f32>().unwrap(), vec![vec![2.0, 3.0]]);
    }

    #[test]
    fn test_l2_normalize() {
        let tensor = Tensor::new(&[[3.0f32, 4.0]], &Device::Cpu).unwrap();
        let normalized = l2_normalize(&tensor).unwrap().to_vec2::<f32>().unwrap();

        assert!((normalized[0][0] - 0.6).abs() < 1e-6);
        assert!((normalized[0][1] - 0.8).abs() < 1e-6);
    }
}
