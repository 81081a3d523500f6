//! Sentence segmentation and word tokenization ahead of vocabulary lookup.

use once_cell::sync::Lazy;
use regex::Regex;
use tokenizers::pre_tokenizers::whitespace::Whitespace;
use tokenizers::{OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer, Tokenizer};

use crate::error::{PipelineError, Result};

/// Splits a document into ordered sentences.
pub trait SentenceSegmenter: Send + Sync {
    /// Sentences of `text` in reading order. Empty or whitespace-only text yields none.
    fn segment(&self, text: &str) -> Result<Vec<String>>;
}

/// Splits a sentence into ordered word-level tokens.
pub trait WordTokenizer: Send + Sync {
    /// Tokens of `sentence`; may be empty.
    fn tokenize(&self, sentence: &str) -> Result<Vec<String>>;
}

// Terminal punctuation (with trailing closing quotes/brackets) followed by whitespace,
// or a paragraph break.
static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[.!?…]+["'”’)\]]*\s+|\n\s*\n"#).expect("hardcoded regex is valid")
});

/// Rule-based segmenter: breaks after `.`, `!`, `?` runs followed by whitespace and at blank lines.
///
/// Abbreviations such as "Dr." also end a sentence; plug in a trained segmenter through
/// [`SentenceSegmenter`] where that matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationSegmenter;

impl SentenceSegmenter for PunctuationSegmenter {
    fn segment(&self, text: &str) -> Result<Vec<String>> {
        let mut sentences = Vec::new();
        let mut start = 0;
        for boundary in SENTENCE_BREAK.find_iter(text) {
            push_trimmed(&mut sentences, &text[start..boundary.end()]);
            start = boundary.end();
        }
        push_trimmed(&mut sentences, &text[start..]);
        Ok(sentences)
    }
}

fn push_trimmed(sentences: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        sentences.push(piece.to_string());
    }
}

/// Word tokenizer built on the `tokenizers` whitespace pre-tokenizer (`\w+|[^\w\s]+`).
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer {
    lowercase: bool,
}

impl WhitespaceTokenizer {
    /// Tokenizer that keeps the original casing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowercase tokens before lookup, for vocabularies built from lowercased text.
    pub fn lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }
}

impl WordTokenizer for WhitespaceTokenizer {
    fn tokenize(&self, sentence: &str) -> Result<Vec<String>> {
        let mut pretokenized = if self.lowercase {
            PreTokenizedString::from(sentence.to_lowercase())
        } else {
            PreTokenizedString::from(sentence)
        };
        Whitespace::default()
            .pre_tokenize(&mut pretokenized)
            .map_err(|e| {
                PipelineError::Tokenization(format!(
                    "Tokenization failed on '{}': {}",
                    sentence.chars().take(50).collect::<String>(),
                    e
                ))
            })?;

        Ok(pretokenized
            .get_splits(OffsetReferential::Original, OffsetType::Byte)
            .into_iter()
            .map(|(token, _, _)| token.to_string())
            .collect())
    }
}

/// Use a `tokenizer.json` model's token strings as words.
impl WordTokenizer for Tokenizer {
    fn tokenize(&self, sentence: &str) -> Result<Vec<String>> {
        let encoding = self.encode(sentence, false).map_err(|e| {
            PipelineError::Tokenization(format!(
                "Tokenization failed on '{}': {}",
                sentence.chars().take(50).collect::<String>(),
                e
            ))
        })?;
        Ok(encoding.get_tokens().to_vec())
    }
}
