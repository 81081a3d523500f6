//! Document sentiment pipeline.
//!
//! Splits text into sentences, scores each with a bidirectional LSTM classifier and
//! averages the sentence probabilities into one polarity from -1.0 (negative) to 1.0
//! (positive).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use candle_sentiment::sentiment::SentimentPipelineBuilder;
//!
//! # fn main() -> candle_sentiment::error::Result<()> {
//! let pipeline = SentimentPipelineBuilder::from_dir("models/sentiment-lstm").build()?;
//!
//! let output = pipeline.score_document("What a fantastic film. I would watch it again!")?;
//! println!("sentiment: {:+.2} over {} sentences", output.score, output.sentences.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Model directory
//!
//! | File | Contents |
//! |------|----------|
//! | `config.json` | `vocab_size`, `embedding_dim`, `hidden_dim`, `n_layers`, `dropout`, ... |
//! | `vocab.json` | `{"token": index}` object or `["token", ...]` list |
//! | `model.safetensors` / `pytorch_model.bin` | PyTorch-named weights (`embedding.weight`, `rnn.weight_ih_l0`, `fc.weight`, ...) |
//!
//! Everything is shape-checked while building; a pipeline that builds will not fail on
//! shapes at scoring time.

// ============ Internal API ============

pub(crate) mod builder;
pub(crate) mod model;
pub(crate) mod pipeline;
pub(crate) mod text;

// ============ Public API ============

pub use crate::pipelines::stats::PipelineStats;
pub use builder::SentimentPipelineBuilder;
pub use model::SentenceClassifier;
pub use pipeline::{polarity, DocumentScore, SentenceScore, SentimentPipeline};
pub use text::{PunctuationSegmenter, SentenceSegmenter, WhitespaceTokenizer, WordTokenizer};
