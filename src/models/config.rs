use serde::Deserialize;
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::vocab::{DEFAULT_PAD_TOKEN, DEFAULT_UNK_TOKEN};

/// Hyperparameters of the recurrent sentiment classifier (`config.json`).
///
/// Every weight tensor is shape-checked against these values when the model loads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelConfig {
    /// Rows of the embedding matrix; must equal the vocabulary size.
    pub vocab_size: usize,
    /// Width of each token embedding.
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
    /// Hidden units per direction.
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,
    /// Classifier outputs. Only a single logit is supported.
    #[serde(default = "default_output_dim")]
    pub output_dim: usize,
    /// Stacked recurrent layers.
    #[serde(default = "default_n_layers")]
    pub n_layers: usize,
    /// Must be `true`; the head reads both directions.
    #[serde(default = "default_bidirectional")]
    pub bidirectional: bool,
    /// Dropout probability, applied only in training mode.
    #[serde(default = "default_dropout")]
    pub dropout: f32,
    /// Expected padding index; checked against the vocabulary when present.
    #[serde(default, alias = "pad_index")]
    pub pad_idx: Option<u32>,
    /// Unknown-word token name in the vocabulary.
    #[serde(default = "default_unk_token")]
    pub unk_token: String,
    /// Padding token name in the vocabulary.
    #[serde(default = "default_pad_token")]
    pub pad_token: String,
}

fn default_embedding_dim() -> usize {
    100
}

fn default_hidden_dim() -> usize {
    16
}

fn default_output_dim() -> usize {
    1
}

fn default_n_layers() -> usize {
    2
}

fn default_bidirectional() -> bool {
    true
}

fn default_dropout() -> f32 {
    0.5
}

fn default_unk_token() -> String {
    DEFAULT_UNK_TOKEN.to_string()
}

fn default_pad_token() -> String {
    DEFAULT_PAD_TOKEN.to_string()
}

impl ModelConfig {
    /// Config with the given vocabulary size and default values for everything else.
    pub fn new(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            embedding_dim: default_embedding_dim(),
            hidden_dim: default_hidden_dim(),
            output_dim: default_output_dim(),
            n_layers: default_n_layers(),
            bidirectional: default_bidirectional(),
            dropout: default_dropout(),
            pad_idx: None,
            unk_token: default_unk_token(),
            pad_token: default_pad_token(),
        }
    }

    /// Read and validate a `config.json`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config '{}': {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            PipelineError::Config(format!("Failed to parse config '{}': {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Width of the sentence representation fed to the head.
    pub fn representation_dim(&self) -> usize {
        2 * self.hidden_dim
    }

    /// Reject hyperparameters the encoder cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.bidirectional {
            return Err(PipelineError::Config(
                "Only bidirectional encoders are supported (bidirectional = false)".into(),
            ));
        }
        if self.output_dim != 1 {
            return Err(PipelineError::Config(format!(
                "Classifier must produce a single logit, config declares output_dim = {}",
                self.output_dim
            )));
        }
        for (name, value) in [
            ("vocab_size", self.vocab_size),
            ("embedding_dim", self.embedding_dim),
            ("hidden_dim", self.hidden_dim),
            ("n_layers", self.n_layers),
        ] {
            if value == 0 {
                return Err(PipelineError::Config(format!("{name} must be positive")));
            }
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(PipelineError::Config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }
}
