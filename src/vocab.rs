//! Token to embedding-row mapping.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokenizers::Tokenizer;

use crate::error::{PipelineError, Result};

/// Default name of the unknown-word token.
pub const DEFAULT_UNK_TOKEN: &str = "<unk>";
/// Default name of the padding token.
pub const DEFAULT_PAD_TOKEN: &str = "<pad>";

/// Immutable token → index mapping with reserved padding and unknown entries.
///
/// Indices need not be contiguous, but each is unique and [`len`](Self::len) is the
/// highest index + 1, so every index addresses a row of an embedding matrix of that size.
///
/// ```
/// use candle_sentiment::Vocabulary;
/// use std::collections::HashMap;
///
/// # fn main() -> candle_sentiment::error::Result<()> {
/// let stoi: HashMap<String, u32> = [("<pad>", 0), ("<unk>", 1), ("good", 5), ("bad", 6)]
///     .into_iter()
///     .map(|(t, i)| (t.to_string(), i))
///     .collect();
/// let vocab = Vocabulary::new(stoi, "<unk>", "<pad>")?;
///
/// assert_eq!(vocab.index_of("good"), 5);
/// assert_eq!(vocab.index_of("splendid"), vocab.unk_index());
/// assert_eq!(vocab.len(), 7);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Vocabulary {
    stoi: HashMap<String, u32>,
    itos: HashMap<u32, String>,
    size: usize,
    unk_index: u32,
    pad_index: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VocabularyFile {
    Map(HashMap<String, u32>),
    List(Vec<String>),
}

impl Vocabulary {
    /// Build from a token → index map.
    ///
    /// # Errors
    ///
    /// Fails if two tokens share an index or either special token is missing.
    pub fn new(stoi: HashMap<String, u32>, unk_token: &str, pad_token: &str) -> Result<Self> {
        let size = stoi.values().max().map(|&max| max as usize + 1).unwrap_or(0);
        let mut itos = HashMap::with_capacity(stoi.len());

        for (token, &index) in &stoi {
            if let Some(existing) = itos.insert(index, token.clone()) {
                return Err(PipelineError::Vocabulary(format!(
                    "Tokens '{existing}' and '{token}' both map to index {index}"
                )));
            }
        }

        let special = |name: &str, role: &str| {
            stoi.get(name).copied().ok_or_else(|| {
                PipelineError::Vocabulary(format!("Vocabulary has no {role} token '{name}'"))
            })
        };
        let unk_index = special(unk_token, "unknown")?;
        let pad_index = special(pad_token, "padding")?;

        Ok(Self {
            stoi,
            itos,
            size,
            unk_index,
            pad_index,
        })
    }

    /// Build from an ordered token list; a token's index is its position.
    ///
    /// Repeated tokens keep their first position, matching how `itos` lists are written.
    pub fn from_tokens<I, S>(tokens: I, unk_token: &str, pad_token: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut stoi = HashMap::new();
        for (index, token) in tokens.into_iter().enumerate() {
            let index = u32::try_from(index).map_err(|_| {
                PipelineError::Vocabulary("Vocabulary exceeds u32::MAX entries".into())
            })?;
            stoi.entry(token.into()).or_insert(index);
        }
        Self::new(stoi, unk_token, pad_token)
    }

    /// Load from a JSON file holding either a `{"token": index}` object or a `["token", ...]` list.
    pub fn from_file(path: impl AsRef<Path>, unk_token: &str, pad_token: &str) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Vocabulary(format!("Failed to read vocabulary '{}': {e}", path.display()))
        })?;
        let file: VocabularyFile = serde_json::from_str(&content).map_err(|e| {
            PipelineError::Vocabulary(format!(
                "Failed to parse vocabulary '{}': {e}",
                path.display()
            ))
        })?;

        let vocab = match file {
            VocabularyFile::Map(stoi) => Self::new(stoi, unk_token, pad_token)?,
            VocabularyFile::List(itos) => Self::from_tokens(itos, unk_token, pad_token)?,
        };
        tracing::info!(
            path = %path.display(),
            size = vocab.len(),
            unk_index = vocab.unk_index,
            pad_index = vocab.pad_index,
            "loaded vocabulary"
        );
        Ok(vocab)
    }

    /// Reuse the vocabulary of a `tokenizers` tokenizer (added tokens included).
    pub fn from_tokenizer(tokenizer: &Tokenizer, unk_token: &str, pad_token: &str) -> Result<Self> {
        Self::new(tokenizer.get_vocab(true), unk_token, pad_token)
    }

    /// Index of `token`, or the unknown index when it is not mapped.
    pub fn index_of(&self, token: &str) -> u32 {
        self.get(token).unwrap_or(self.unk_index)
    }

    /// Strict lookup: `None` for unmapped tokens.
    pub fn get(&self, token: &str) -> Option<u32> {
        self.stoi.get(token).copied()
    }

    /// Token stored at `index`, if any.
    pub fn token(&self, index: u32) -> Option<&str> {
        self.itos.get(&index).map(String::as_str)
    }

    /// Map a token sequence to indices.
    pub fn encode<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<u32> {
        tokens.iter().map(|t| self.index_of(t.as_ref())).collect()
    }

    /// Index of the padding token.
    pub fn pad_index(&self) -> u32 {
        self.pad_index
    }

    /// Index of the unknown-word token.
    pub fn unk_index(&self) -> u32 {
        self.unk_index
    }

    /// Number of embedding rows this vocabulary addresses.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Always `false` for a constructed vocabulary (it holds both special tokens).
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}
