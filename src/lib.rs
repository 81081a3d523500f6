//! Document-level sentiment scoring in Rust.
//!
//! Powered by [Candle](https://github.com/huggingface/candle). Each sentence of a document is
//! run through an embedding + bidirectional LSTM + linear classifier, and the sentence
//! probabilities are averaged into a single score in [-1, 1].

#![warn(missing_docs)]

// ============ Internal API ============

pub(crate) mod loaders;
pub(crate) mod pipelines;

// ============ Public API ============

pub mod error;
pub mod models;
pub mod vocab;

pub use pipelines::sentiment;
pub use vocab::Vocabulary;
