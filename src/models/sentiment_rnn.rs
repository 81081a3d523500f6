use candle_core::{DType, Device, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use std::path::Path;

use super::config::ModelConfig;
use super::lstm::{load_weight, Mode, SequenceEncoder};
use crate::error::{PipelineError, Result};
use crate::pipelines::sentiment::model::SentenceClassifier;
use crate::vocab::Vocabulary;

/// Linear layer over the sentence vector followed by a sigmoid.
#[derive(Debug, Clone)]
pub struct ClassifierHead {
    fc: Linear,
    span: tracing::Span,
}

impl ClassifierHead {
    /// Load `fc.weight` (1 × 2H) and `fc.bias` (1).
    pub fn load(config: &ModelConfig, vb: &VarBuilder) -> Result<Self> {
        let weight = load_weight(
            vb,
            (config.output_dim, config.representation_dim()),
            "fc.weight",
        )?;
        let bias = load_weight(vb, config.output_dim, "fc.bias")?;
        Ok(Self::new(weight, bias))
    }

    pub(crate) fn new(weight: Tensor, bias: Tensor) -> Self {
        Self {
            fc: Linear::new(weight, Some(bias)),
            span: tracing::span!(tracing::Level::TRACE, "classifier-head"),
        }
    }

    /// Raw logits, (batch, 2H) → (batch).
    pub fn logits(&self, representation: &Tensor) -> Result<Tensor> {
        let _enter = self.span.enter();
        Ok(self.fc.forward(representation)?.squeeze(D::Minus1)?)
    }

    /// Probabilities in [0, 1], (batch, 2H) → (batch).
    pub fn forward(&self, representation: &Tensor) -> Result<Tensor> {
        Ok(candle_nn::ops::sigmoid(&self.logits(representation)?)?)
    }
}

/// Embedding + bidirectional LSTM + linear head, scoring one probability per sentence.
///
/// Immutable once loaded; share it behind an `Arc` between threads.
#[derive(Debug, Clone)]
pub struct SentimentRnn {
    config: ModelConfig,
    encoder: SequenceEncoder,
    head: ClassifierHead,
    device: Device,
}

impl SentimentRnn {
    /// Build from a var builder holding PyTorch-named tensors.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ShapeMismatch`] when the vocabulary size or padding index disagrees
    /// with `config`, or any tensor is missing or has the wrong shape.
    pub fn load(config: &ModelConfig, vocab: &Vocabulary, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        if vocab.len() != config.vocab_size {
            return Err(PipelineError::ShapeMismatch(format!(
                "Vocabulary has {} entries but config declares vocab_size = {}",
                vocab.len(),
                config.vocab_size
            )));
        }
        if let Some(pad_idx) = config.pad_idx {
            if pad_idx != vocab.pad_index() {
                return Err(PipelineError::ShapeMismatch(format!(
                    "Config pad_idx = {pad_idx} but vocabulary maps '{}' to {}",
                    config.pad_token,
                    vocab.pad_index()
                )));
            }
        }

        let encoder = SequenceEncoder::load(config, vocab.pad_index(), &vb)?;
        let head = ClassifierHead::load(config, &vb)?;

        tracing::info!(
            vocab_size = config.vocab_size,
            embedding_dim = config.embedding_dim,
            hidden_dim = config.hidden_dim,
            n_layers = config.n_layers,
            dropout = config.dropout,
            "loaded sentiment rnn"
        );

        Ok(Self {
            config: config.clone(),
            encoder,
            head,
            device: vb.device().clone(),
        })
    }

    /// Load weights from a `.safetensors` file or a PyTorch `state_dict` (`.pt`, `.bin`, `.pth`).
    pub fn from_file(
        config: &ModelConfig,
        vocab: &Vocabulary,
        weights_path: &Path,
        device: &Device,
    ) -> Result<Self> {
        if !weights_path.exists() {
            return Err(PipelineError::Config(format!(
                "Weight file not found: '{}'",
                weights_path.display()
            )));
        }

        let vb = if weights_path.extension().is_some_and(|e| e == "safetensors") {
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)? }
        } else {
            VarBuilder::from_pth(weights_path, DType::F32, device)?
        };

        Self::load(config, vocab, vb)
    }

    /// Hyperparameters the model was loaded with.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Device holding the weights.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Sentence vectors (batch, 2H) for a batch of index sequences.
    pub fn encode(&self, sequences: &[Vec<u32>], mode: Mode) -> Result<Tensor> {
        self.encoder.encode(sequences, mode)
    }

    /// One positive-sentiment probability per sequence.
    pub fn predict(&self, sequences: &[Vec<u32>], mode: Mode) -> Result<Vec<f32>> {
        let representation = self.encode(sequences, mode)?;
        let probabilities = self.head.forward(&representation)?;
        Ok(probabilities.to_dtype(DType::F32)?.to_vec1::<f32>()?)
    }
}

impl SentenceClassifier for SentimentRnn {
    fn score_batch(&self, sequences: &[Vec<u32>]) -> Result<Vec<f32>> {
        self.predict(sequences, Mode::Inference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn tiny_vocab() -> Vocabulary {
        Vocabulary::from_tokens(["<pad>", "<unk>", "great", "awful"], "<unk>", "<pad>").unwrap()
    }

    fn tiny_config() -> ModelConfig {
        ModelConfig {
            embedding_dim: 4,
            hidden_dim: 2,
            n_layers: 1,
            ..ModelConfig::new(4)
        }
    }

    fn zero_weights(config: &ModelConfig, fc_bias: f32) -> HashMap<String, Tensor> {
        let dev = Device::Cpu;
        let gates = 4 * config.hidden_dim;
        let zeros = |shape: &[usize]| Tensor::zeros(shape, DType::F32, &dev).unwrap();
        let mut ts = HashMap::new();
        ts.insert(
            "embedding.weight".into(),
            zeros(&[config.vocab_size, config.embedding_dim]),
        );
        for suffix in ["", "_reverse"] {
            ts.insert(
                format!("rnn.weight_ih_l0{suffix}"),
                zeros(&[gates, config.embedding_dim]),
            );
            ts.insert(
                format!("rnn.weight_hh_l0{suffix}"),
                zeros(&[gates, config.hidden_dim]),
            );
            ts.insert(format!("rnn.bias_ih_l0{suffix}"), zeros(&[gates]));
            ts.insert(format!("rnn.bias_hh_l0{suffix}"), zeros(&[gates]));
        }
        ts.insert("fc.weight".into(), zeros(&[1, 2 * config.hidden_dim]));
        ts.insert(
            "fc.bias".into(),
            Tensor::new(&[fc_bias], &dev).unwrap(),
        );
        ts
    }

    #[test]
    fn head_output_stays_in_unit_interval() {
        let dev = Device::Cpu;
        let weight = Tensor::new(&[[1f32, -2.0, 0.5, 3.0]], &dev).unwrap();
        let bias = Tensor::new(&[0.25f32], &dev).unwrap();
        let head = ClassifierHead::new(weight, bias);

        let inputs = Tensor::new(
            &[
                [0f32, 0.0, 0.0, 0.0],
                [1e4, -1e4, 1e4, 1e4],
                [-1e4, 1e4, -1e4, -1e4],
                [0.3, -0.7, 2.0, -1.1],
            ],
            &dev,
        )
        .unwrap();
        let probs = head.forward(&inputs).unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(probs.len(), 4);
        for p in &probs {
            assert!((0.0..=1.0).contains(p), "{p} outside [0, 1]");
        }
        assert!((probs[0] - 1.0 / (1.0 + (-0.25f32).exp())).abs() < 1e-6);
    }

    #[test]
    fn zero_network_returns_bias_probability() {
        let config = tiny_config();
        let bias = (0.9f32 / 0.1).ln();
        let vb = VarBuilder::from_tensors(zero_weights(&config, bias), DType::F32, &Device::Cpu);
        let model = SentimentRnn::load(&config, &tiny_vocab(), vb).unwrap();

        let probs = model.score_batch(&[vec![2], vec![3, 1, 2]]).unwrap();
        assert_eq!(probs.len(), 2);
        for p in probs {
            assert!((p - 0.9).abs() < 1e-5);
        }
    }

    #[test]
    fn vocabulary_must_match_config() {
        let config = ModelConfig {
            vocab_size: 5,
            ..tiny_config()
        };
        let vb = VarBuilder::from_tensors(zero_weights(&config, 0.0), DType::F32, &Device::Cpu);
        let err = SentimentRnn::load(&config, &tiny_vocab(), vb).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch(_)));

        let config = ModelConfig {
            pad_idx: Some(1),
            ..tiny_config()
        };
        let vb = VarBuilder::from_tensors(zero_weights(&config, 0.0), DType::F32, &Device::Cpu);
        let err = SentimentRnn::load(&config, &tiny_vocab(), vb).unwrap_err();
        assert!(err.to_string().contains("pad_idx"));
    }

    #[test]
    fn head_width_is_checked() {
        let config = tiny_config();
        let mut weights = zero_weights(&config, 0.0);
        weights.insert(
            "fc.weight".into(),
            Tensor::zeros((1, config.hidden_dim), DType::F32, &Device::Cpu).unwrap(),
        );
        let vb = VarBuilder::from_tensors(weights, DType::F32, &Device::Cpu);
        let err = SentimentRnn::load(&config, &tiny_vocab(), vb).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch(_)));
    }
}
