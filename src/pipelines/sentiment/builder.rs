use std::path::PathBuf;
use std::sync::Arc;

use super::pipeline::{SentimentPipeline, DEFAULT_BATCH_SIZE};
use super::text::{PunctuationSegmenter, SentenceSegmenter, WhitespaceTokenizer, WordTokenizer};
use crate::error::Result;
use crate::loaders::ModelSource;
use crate::models::{ModelConfig, SentimentRnn};
use crate::pipelines::utils::DeviceRequest;
use crate::vocab::Vocabulary;

/// Builder for creating [`SentimentPipeline`] instances.
///
/// Use [`Self::from_dir`] or [`Self::from_hub`] as the entry point. A model directory holds
/// `config.json`, `vocab.json` and `model.safetensors` (or a PyTorch `state_dict`).
///
/// # Examples
///
/// ```rust,no_run
/// # use candle_sentiment::sentiment::{SentimentPipelineBuilder, WhitespaceTokenizer};
/// # fn main() -> candle_sentiment::error::Result<()> {
/// let pipeline = SentimentPipelineBuilder::from_dir("models/sentiment-lstm")
///     .weights_file("sentiment_lstm_glove.pt")
///     .tokenizer(WhitespaceTokenizer::new().lowercase(true))
///     .batch_size(16)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SentimentPipelineBuilder {
    source: ModelSource,
    weights_file: Option<String>,
    device_request: DeviceRequest,
    segmenter: Arc<dyn SentenceSegmenter>,
    tokenizer: Arc<dyn WordTokenizer>,
    batch_size: usize,
}

impl SentimentPipelineBuilder {
    fn new(source: ModelSource) -> Self {
        Self {
            source,
            weights_file: None,
            device_request: DeviceRequest::Cpu,
            segmenter: Arc::new(PunctuationSegmenter),
            tokenizer: Arc::new(WhitespaceTokenizer::default()),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Load the model from a local directory.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(ModelSource::Dir(dir.into()))
    }

    /// Download (or reuse from the local cache) a model repository on the HuggingFace hub.
    pub fn from_hub(repo_id: impl Into<String>) -> Self {
        Self::new(ModelSource::Hub(repo_id.into()))
    }

    /// Weight file name inside the source, instead of `model.safetensors` / `pytorch_model.bin`.
    pub fn weights_file(mut self, name: impl Into<String>) -> Self {
        self.weights_file = Some(name.into());
        self
    }

    /// Use CPU for inference (default).
    pub fn cpu(mut self) -> Self {
        self.device_request = DeviceRequest::Cpu;
        self
    }

    /// Use a specific CUDA GPU for inference.
    pub fn cuda(mut self, index: usize) -> Self {
        self.device_request = DeviceRequest::Cuda(index);
        self
    }

    /// Sentence segmenter (default: [`PunctuationSegmenter`]).
    pub fn segmenter(mut self, segmenter: impl SentenceSegmenter + 'static) -> Self {
        self.segmenter = Arc::new(segmenter);
        self
    }

    /// Word tokenizer (default: [`WhitespaceTokenizer`]).
    pub fn tokenizer(mut self, tokenizer: impl WordTokenizer + 'static) -> Self {
        self.tokenizer = Arc::new(tokenizer);
        self
    }

    /// Maximum sentences per padded encoder batch (default 32, at least 1).
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Builds the pipeline with configured settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a file is missing or unreadable, the download or device
    /// initialization fails, or the weights and vocabulary do not match `config.json`
    /// ([`PipelineError::ShapeMismatch`](crate::error::PipelineError::ShapeMismatch)).
    pub fn build(self) -> Result<SentimentPipeline<SentimentRnn>> {
        let device = self.device_request.resolve()?;
        let files = self.source.resolve(self.weights_file.as_deref())?;

        let config = ModelConfig::from_file(&files.config)?;
        let vocab = Vocabulary::from_file(&files.vocab, &config.unk_token, &config.pad_token)?;
        let model = SentimentRnn::from_file(&config, &vocab, &files.weights, &device)?;

        tracing::info!(
            source = ?self.source,
            weights = %files.weights.display(),
            device = ?device.location(),
            "sentiment pipeline ready"
        );

        Ok(SentimentPipeline {
            model: Arc::new(model),
            vocab: Arc::new(vocab),
            segmenter: self.segmenter,
            tokenizer: self.tokenizer,
            batch_size: self.batch_size,
        })
    }
}
