use crate::error::Result;

/// Scores batches of vocabulary-index sequences with a positive-sentiment probability.
///
/// Implemented by [`SentimentRnn`](crate::models::SentimentRnn); implement it yourself to
/// put a different sentence model behind the document pipeline.
pub trait SentenceClassifier: Send + Sync {
    /// One probability in [0, 1] per sequence, in input order.
    ///
    /// Implementations must reject empty sequences with
    /// [`PipelineError::EmptySequence`](crate::error::PipelineError::EmptySequence).
    fn score_batch(&self, sequences: &[Vec<u32>]) -> Result<Vec<f32>>;

    /// Probability for a single sequence.
    fn score(&self, sequence: &[u32]) -> Result<f32> {
        self.score_batch(&[sequence.to_vec()])?
            .pop()
            .ok_or_else(|| crate::error::PipelineError::Unexpected("No score returned".into()))
    }
}
