//! Sentence model: embedding, bidirectional LSTM encoder and classifier head.

mod config;
mod lstm;
mod sentiment_rnn;

pub use config::ModelConfig;
pub use lstm::{Mode, SequenceEncoder};
pub use sentiment_rnn::{ClassifierHead, SentimentRnn};
