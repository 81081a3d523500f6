use std::sync::Arc;

use super::model::SentenceClassifier;
use super::text::{PunctuationSegmenter, SentenceSegmenter, WhitespaceTokenizer, WordTokenizer};
use crate::error::{PipelineError, Result};
use crate::models::SentimentRnn;
use crate::pipelines::stats::PipelineStats;
use crate::vocab::Vocabulary;

pub(crate) const DEFAULT_BATCH_SIZE: usize = 32;

// ============ Output types ============

/// Score of one sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceScore {
    /// Sentence text as produced by the segmenter.
    pub text: String,
    /// Number of tokens fed to the encoder.
    pub tokens: usize,
    /// Positive-sentiment probability (0.0 to 1.0).
    pub probability: f32,
}

/// Output of [`SentimentPipeline::score_document`].
#[derive(Debug, Clone)]
pub struct DocumentScore {
    /// Polarity from -1.0 (negative) to 1.0 (positive).
    pub score: f32,
    /// Per-sentence breakdown, in document order.
    pub sentences: Vec<SentenceScore>,
    /// Execution statistics.
    pub stats: PipelineStats,
}

impl DocumentScore {
    /// Mean sentence probability the score was rescaled from.
    pub fn mean_probability(&self) -> f32 {
        (self.score + 1.0) / 2.0
    }
}

/// Average sentence probabilities and rescale the mean from [0, 1] to [-1, 1].
///
/// # Errors
///
/// [`PipelineError::EmptyDocument`] when `probabilities` is empty.
///
/// ```
/// use candle_sentiment::sentiment::polarity;
///
/// # fn main() -> candle_sentiment::error::Result<()> {
/// assert!((polarity(&[0.2, 0.8])? - 0.0).abs() < 1e-6);
/// assert!((polarity(&[0.9])? - 0.8).abs() < 1e-6);
/// assert!(polarity(&[]).is_err());
/// # Ok(())
/// # }
/// ```
pub fn polarity(probabilities: &[f32]) -> Result<f32> {
    if probabilities.is_empty() {
        return Err(PipelineError::EmptyDocument(
            "Cannot score a document without sentences".into(),
        ));
    }
    let mean = probabilities.iter().map(|&p| f64::from(p)).sum::<f64>() / probabilities.len() as f64;
    Ok((mean * 2.0 - 1.0) as f32)
}

// ============ Pipeline ============

/// Scores whole documents: segment, tokenize, classify each sentence, average, rescale.
///
/// Construct with [`SentimentPipelineBuilder`](super::SentimentPipelineBuilder) or
/// [`SentimentPipeline::new`]. Cheap to clone; clones share the model and vocabulary.
///
/// # Examples
///
/// ```rust,no_run
/// # use candle_sentiment::sentiment::SentimentPipelineBuilder;
/// # fn main() -> candle_sentiment::error::Result<()> {
/// let pipeline = SentimentPipelineBuilder::from_dir("models/sentiment-lstm").build()?;
///
/// let output = pipeline.score_document("The plot drags. The acting is superb!")?;
/// println!("score: {:+.2}", output.score);
/// for s in &output.sentences {
///     println!("  {:.2}  {}", s.probability, s.text);
/// }
/// # Ok(())
/// # }
/// ```
pub struct SentimentPipeline<M: SentenceClassifier = SentimentRnn> {
    pub(crate) model: Arc<M>,
    pub(crate) vocab: Arc<Vocabulary>,
    pub(crate) segmenter: Arc<dyn SentenceSegmenter>,
    pub(crate) tokenizer: Arc<dyn WordTokenizer>,
    pub(crate) batch_size: usize,
}

impl<M: SentenceClassifier> Clone for SentimentPipeline<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            vocab: Arc::clone(&self.vocab),
            segmenter: Arc::clone(&self.segmenter),
            tokenizer: Arc::clone(&self.tokenizer),
            batch_size: self.batch_size,
        }
    }
}

impl<M: SentenceClassifier> std::fmt::Debug for SentimentPipeline<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentPipeline")
            .field("vocab", &self.vocab)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl<M: SentenceClassifier> SentimentPipeline<M> {
    /// Pipeline over an already loaded model, with the default segmenter and tokenizer.
    pub fn new(model: impl Into<Arc<M>>, vocab: impl Into<Arc<Vocabulary>>) -> Self {
        Self {
            model: model.into(),
            vocab: vocab.into(),
            segmenter: Arc::new(PunctuationSegmenter),
            tokenizer: Arc::new(WhitespaceTokenizer::default()),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Replace the sentence segmenter.
    pub fn with_segmenter(mut self, segmenter: impl SentenceSegmenter + 'static) -> Self {
        self.segmenter = Arc::new(segmenter);
        self
    }

    /// Replace the word tokenizer.
    pub fn with_tokenizer(mut self, tokenizer: impl WordTokenizer + 'static) -> Self {
        self.tokenizer = Arc::new(tokenizer);
        self
    }

    /// Maximum number of sentences encoded in one padded batch (at least 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Score `text` as a single polarity value in [-1, 1].
    ///
    /// Out-of-vocabulary words are looked up as the unknown token and never fail.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::EmptyDocument`] if the segmenter finds no sentences.
    /// - [`PipelineError::EmptySequence`] if a sentence tokenizes to nothing.
    pub fn score_document(&self, text: &str) -> Result<DocumentScore> {
        let stats = PipelineStats::start();

        let sentences = self.segmenter.segment(text)?;
        if sentences.is_empty() {
            return Err(PipelineError::EmptyDocument(format!(
                "No sentences found in input '{}'",
                preview(text)
            )));
        }

        let mut sequences = Vec::with_capacity(sentences.len());
        for sentence in &sentences {
            let tokens = self.tokenizer.tokenize(sentence)?;
            if tokens.is_empty() {
                return Err(PipelineError::EmptySequence(format!(
                    "Sentence '{}' produced no tokens",
                    preview(sentence)
                )));
            }
            sequences.push(self.vocab.encode(&tokens));
        }

        let mut probabilities = Vec::with_capacity(sequences.len());
        for batch in sequences.chunks(self.batch_size) {
            let scores = self.model.score_batch(batch)?;
            if scores.len() != batch.len() {
                return Err(PipelineError::Unexpected(format!(
                    "Classifier returned {} scores for {} sentences",
                    scores.len(),
                    batch.len()
                )));
            }
            probabilities.extend(scores);
        }

        let score = polarity(&probabilities)?;
        let sentences: Vec<SentenceScore> = sentences
            .into_iter()
            .zip(&sequences)
            .zip(&probabilities)
            .map(|((text, sequence), &probability)| SentenceScore {
                text,
                tokens: sequence.len(),
                probability,
            })
            .collect();
        let stats = stats.finish(sentences.len());

        tracing::debug!(
            sentences = sentences.len(),
            score,
            elapsed_ms = stats.total_time.as_secs_f64() * 1000.0,
            "scored document"
        );

        Ok(DocumentScore {
            score,
            sentences,
            stats,
        })
    }

    /// The sentence classifier.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// The vocabulary used for token lookup.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }
}

impl SentimentPipeline<SentimentRnn> {
    /// Returns the device (CPU/GPU) the model is running on.
    pub fn device(&self) -> &candle_core::Device {
        self.model.device()
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}
