use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PipelineError, Result};

pub const CONFIG_FILE: &str = "config.json";
pub const VOCAB_FILE: &str = "vocab.json";
pub const WEIGHT_FILES: [&str; 2] = ["model.safetensors", "pytorch_model.bin"];

#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub filename: String,
}

impl HfLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        Self {
            repo: repo.into(),
            filename: filename.into(),
        }
    }

    pub fn load(&self) -> Result<PathBuf> {
        let hf_api = hf_hub::api::sync::ApiBuilder::new()
            .with_progress(false)
            .build()
            .map_err(|e| {
                PipelineError::Download(format!("Failed to initialize HuggingFace API: {e}"))
            })?;
        let hf_api = hf_api.model(self.repo.clone());

        let max_retries = 3;
        let mut attempts = 0u32;

        for attempt in 0..max_retries {
            match hf_api.get(self.filename.as_str()) {
                Ok(path) => return Ok(path),
                Err(e) => {
                    let error_msg = e.to_string();
                    attempts = attempt + 1;
                    if error_msg.contains("Lock acquisition failed") && attempt < max_retries - 1 {
                        let wait_time = Duration::from_millis(100 * (1 << attempt));
                        tracing::debug!(
                            repo = %self.repo,
                            file = %self.filename,
                            ?wait_time,
                            "hub cache locked, retrying"
                        );
                        std::thread::sleep(wait_time);
                        continue;
                    }
                    return Err(PipelineError::Download(format!(
                        "Failed to download '{}' from '{}': {}",
                        self.filename, self.repo, error_msg
                    )));
                }
            }
        }

        Err(PipelineError::Download(format!(
            "Download timed out for '{}' from '{}' after {} attempt(s)",
            self.filename, self.repo, attempts
        )))
    }
}

/// Where the config, vocabulary and weights come from.
#[derive(Debug, Clone)]
pub enum ModelSource {
    Dir(PathBuf),
    Hub(String),
}

/// Resolved local paths of everything a sentiment model needs.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub vocab: PathBuf,
    pub weights: PathBuf,
}

impl ModelSource {
    /// Resolve (downloading if needed) the three model files.
    ///
    /// `weights_file` overrides the default lookup of `model.safetensors` then `pytorch_model.bin`.
    pub fn resolve(&self, weights_file: Option<&str>) -> Result<ModelFiles> {
        match self {
            ModelSource::Dir(dir) => Self::resolve_dir(dir, weights_file),
            ModelSource::Hub(repo) => Self::resolve_hub(repo, weights_file),
        }
    }

    fn resolve_dir(dir: &Path, weights_file: Option<&str>) -> Result<ModelFiles> {
        let existing = |name: &str| {
            let path = dir.join(name);
            if path.is_file() {
                Ok(path)
            } else {
                Err(PipelineError::Config(format!(
                    "Missing '{}' in model directory '{}'",
                    name,
                    dir.display()
                )))
            }
        };

        let weights = match weights_file {
            Some(name) => existing(name)?,
            None => WEIGHT_FILES
                .iter()
                .map(|name| dir.join(name))
                .find(|path| path.is_file())
                .ok_or_else(|| {
                    PipelineError::Config(format!(
                        "No weights in '{}' (looked for {})",
                        dir.display(),
                        WEIGHT_FILES.join(", ")
                    ))
                })?,
        };

        Ok(ModelFiles {
            config: existing(CONFIG_FILE)?,
            vocab: existing(VOCAB_FILE)?,
            weights,
        })
    }

    fn resolve_hub(repo: &str, weights_file: Option<&str>) -> Result<ModelFiles> {
        let config = HfLoader::new(repo, CONFIG_FILE).load()?;
        let vocab = HfLoader::new(repo, VOCAB_FILE).load()?;
        let weights = match weights_file {
            Some(name) => HfLoader::new(repo, name).load()?,
            None => match HfLoader::new(repo, WEIGHT_FILES[0]).load() {
                Ok(path) => path,
                Err(first) => HfLoader::new(repo, WEIGHT_FILES[1])
                    .load()
                    .map_err(|second| weights_unavailable(repo, &first, &second))?,
            },
        };
        Ok(ModelFiles {
            config,
            vocab,
            weights,
        })
    }
}

fn weights_unavailable(repo: &str, first: &PipelineError, second: &PipelineError) -> PipelineError {
    PipelineError::Download(format!(
        "No weights could be fetched from '{repo}': {first}; {second}"
    ))
}
