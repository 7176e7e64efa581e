//! Sequence-classification heads over the `[CLS]` position

use candle_core::{Device, Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};
use tokenizers::Tokenizer;

use crate::error::ModelError;
use crate::models::encoder::{EncodedInput, EncoderConfig, TransformerEncoder};
use crate::models::loader::Checkpoint;

/// BERT: pooler (dense + tanh) then `classifier`.
/// RoBERTa: `classifier.dense` + tanh then `classifier.out_proj`.
pub enum ClassificationHead {
    Bert { pooler: Linear, classifier: Linear },
    Roberta { dense: Linear, out_proj: Linear },
}

impl ClassificationHead {
    /// `vb` is the checkpoint root, not the encoder root.
    pub fn load(
        vb: &VarBuilder,
        encoder_prefix: Option<&str>,
        config: &EncoderConfig,
    ) -> Result<Self, ModelError> {
        let hidden = config.hidden_size;
        let labels = config.num_labels();

        if config.is_roberta() {
            let head = vb.pp("classifier");
            return Ok(ClassificationHead::Roberta {
                dense: linear(hidden, hidden, head.pp("dense"))?,
                out_proj: linear(hidden, labels, head.pp("out_proj"))?,
            });
        }

        let pooler = match encoder_prefix {
            Some(prefix) => vb.pp(prefix).pp("pooler").pp("dense"),
            None => vb.pp("pooler").pp("dense"),
        };
        Ok(ClassificationHead::Bert {
            pooler: linear(hidden, hidden, pooler)?,
            classifier: linear(hidden, labels, vb.pp("classifier"))?,
        })
    }

    /// [batch, seq, hidden] -> [batch, labels]
    pub fn forward(&self, sequence_output: &Tensor) -> Result<Tensor, ModelError> {
        let cls = sequence_output.narrow(1, 0, 1)?.squeeze(1)?;
        let logits = match self {
            ClassificationHead::Bert { pooler, classifier } => {
                classifier.forward(&pooler.forward(&cls)?.tanh()?)?
            }
            ClassificationHead::Roberta { dense, out_proj } => {
                out_proj.forward(&dense.forward(&cls)?.tanh()?)?
            }
        };
        Ok(logits)
    }
}

/// Encoder + classification head over a (text, text) pair
pub struct SequenceClassifier {
    encoder: TransformerEncoder,
    head: ClassificationHead,
    tokenizer: Tokenizer,
    device: Device,
}

impl SequenceClassifier {
    pub fn load(source: &str, max_seq_len: usize, device: &Device) -> Result<Self, ModelError> {
        let checkpoint = Checkpoint::open(source, max_seq_len, device)?;
        let prefix = checkpoint.encoder_prefix();
        let head =
            ClassificationHead::load(&checkpoint.weights, prefix.as_deref(), &checkpoint.config)?;
        let encoder = TransformerEncoder::load(checkpoint.encoder_weights(), checkpoint.config)?;

        Ok(Self {
            encoder,
            head,
            tokenizer: checkpoint.tokenizer,
            device: checkpoint.device,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        self.encoder.config()
    }

    /// Raw logits for one pair, truncated to the tokenizer's max length
    pub fn logits(&self, first: &str, second: &str) -> Result<Vec<f32>, ModelError> {
        let encoding = self
            .tokenizer
            .encode((first, second), true)
            .map_err(|e| ModelError::Tokenizer(e.to_string()))?;
        let input = EncodedInput::from_encoding(&encoding, self.encoder.config(), &self.device)?;

        let output = self
            .encoder
            .forward(&input.input_ids, &input.token_type_ids, &input.attention_mask)?;
        let logits = self.head.forward(&output)?;

        Ok(logits.flatten_all()?.to_vec1::<f32>()?)
    }
}
