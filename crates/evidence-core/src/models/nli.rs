//! Natural-language-inference model for evidence stance

use candle_core::Device;
use tracing::info;

use crate::error::ModelError;
use crate::models::encoder::EncoderConfig;
use crate::models::head::SequenceClassifier;
use crate::models::{EntailmentModel, Stance};

/// MNLI-style three-way classifier
pub struct NliModel {
    classifier: SequenceClassifier,
    labels: Vec<Stance>,
}

impl NliModel {
    pub fn load(source: &str, max_seq_len: usize, device: &Device) -> Result<Self, ModelError> {
        let classifier = SequenceClassifier::load(source, max_seq_len, device)?;
        let labels = stance_labels(classifier.config())?;
        info!("NLI model loaded: {:?}", labels);
        Ok(Self { classifier, labels })
    }
}

impl EntailmentModel for NliModel {
    fn infer(&self, premise: &str, hypothesis: &str) -> Result<Stance, ModelError> {
        let logits = self.classifier.logits(premise, hypothesis)?;
        let best = argmax(&logits)
            .ok_or_else(|| ModelError::Output("NLI model returned no logits".to_string()))?;
        self.labels
            .get(best)
            .copied()
            .ok_or_else(|| ModelError::Output(format!("label index {} out of range", best)))
    }
}

/// Map class indices to stances by label name, else by MNLI index order
/// (0 contradiction, 1 neutral, 2 entailment).
fn stance_labels(config: &EncoderConfig) -> Result<Vec<Stance>, ModelError> {
    let count = config.num_labels();
    if count != 3 {
        return Err(ModelError::Config(format!(
            "NLI model must have 3 labels, found {}",
            count
        )));
    }

    let default_order = [Stance::Contradiction, Stance::Neutral, Stance::Entailment];
    Ok((0..count)
        .map(|i| match config.label(i) {
            Some(label) if label.starts_with("entail") => Stance::Entailment,
            Some(label) if label.starts_with("contra") => Stance::Contradiction,
            Some(label) if label.starts_with("neutral") => Stance::Neutral,
            _ => default_order[i],
        })
        .collect())
}

fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}
