use std::time::{Duration, Instant};

/// Timing attached to every scored document.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Total execution time (segmentation, tokenization and inference).
    pub total_time: Duration,
    /// Number of sentences scored.
    pub items_processed: usize,
}

impl PipelineStats {
    /// Start timing (call at the beginning of an operation).
    pub(crate) fn start() -> PipelineStatsBuilder {
        PipelineStatsBuilder {
            start_time: Instant::now(),
        }
    }

    /// Sentences per second, or zero when nothing measurable elapsed.
    pub fn items_per_second(&self) -> f64 {
        let secs = self.total_time.as_secs_f64();
        if secs > 0.0 {
            self.items_processed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Tracks timing from creation to [`finish`](Self::finish).
pub(crate) struct PipelineStatsBuilder {
    start_time: Instant,
}

impl PipelineStatsBuilder {
    /// Finalize stats with the number of items processed.
    pub fn finish(self, items_processed: usize) -> PipelineStats {
        PipelineStats {
            total_time: self.start_time.elapsed(),
            items_processed,
        }
    }
}
