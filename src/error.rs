//! Error types for this crate.
//!
//! All fallible operations return [`Result<T>`] which uses [`PipelineError`] as the error type.

use thiserror::Error;

/// A [`Result`](std::result::Result) alias using [`PipelineError`] as the error type.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The unified error type for all crate errors.
///
/// Load-time problems (`Config`, `Vocabulary`, `ShapeMismatch`, `Download`) surface from
/// [`SentimentPipelineBuilder::build`](crate::sentiment::SentimentPipelineBuilder::build).
/// Scoring only fails on structurally empty input.
///
/// # Example
///
/// ```rust,no_run
/// use candle_sentiment::error::PipelineError;
///
/// fn handle_error(e: PipelineError) {
///     match &e {
///         PipelineError::EmptyDocument(_) => {
///             // Nothing to score - report neutral or reject the request
///         }
///         PipelineError::ShapeMismatch(_) => {
///             // Weights do not match config.json - fix the model directory
///         }
///         PipelineError::Download(_) => {
///             // Network issue - retry with backoff
///         }
///         _ => eprintln!("sentiment error: {e}"),
///     }
/// }
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PipelineError {
    /// Network or download failure. Retry may help.
    #[error("{0}")]
    Download(String),

    /// Word tokenization or sentence segmentation failure.
    #[error("{0}")]
    Tokenization(String),

    /// Device initialization failure. Fall back to CPU.
    #[error("{0}")]
    Device(String),

    /// Invalid or unreadable `config.json`.
    #[error("{0}")]
    Config(String),

    /// Vocabulary file is malformed or misses a special token.
    #[error("{0}")]
    Vocabulary(String),

    /// Loaded weights or vocabulary disagree with the declared hyperparameters.
    #[error("{0}")]
    ShapeMismatch(String),

    /// A sentence produced no tokens, so the encoder has nothing to summarize.
    #[error("{0}")]
    EmptySequence(String),

    /// The document contained no sentences, so there is nothing to average.
    #[error("{0}")]
    EmptyDocument(String),

    /// Caller-supplied input the model cannot consume (e.g. an index outside the vocabulary).
    #[error("{0}")]
    InvalidInput(String),

    /// Internal error. Report if seen.
    #[error("{0}")]
    Unexpected(String),
}

impl From<hf_hub::api::sync::ApiError> for PipelineError {
    fn from(value: hf_hub::api::sync::ApiError) -> Self {
        PipelineError::Download(format!("HuggingFace API error: {}", value))
    }
}

impl From<candle_core::Error> for PipelineError {
    fn from(value: candle_core::Error) -> Self {
        PipelineError::Unexpected(value.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(value: std::io::Error) -> Self {
        PipelineError::Unexpected(value.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(value: serde_json::Error) -> Self {
        PipelineError::Config(value.to_string())
    }
}
