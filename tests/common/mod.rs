#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use tempfile::TempDir;

pub const VOCAB: [&str; 12] = [
    "<pad>", "<unk>", "the", "movie", "was", "good", "great", "bad", "awful", "plot", "acting", ".",
];

pub const EMBEDDING_DIM: usize = 8;
pub const HIDDEN_DIM: usize = 4;
pub const N_LAYERS: usize = 2;

pub fn config_json() -> String {
    serde_json::json!({
        "vocab_size": VOCAB.len(),
        "embedding_dim": EMBEDDING_DIM,
        "hidden_dim": HIDDEN_DIM,
        "output_dim": 1,
        "n_layers": N_LAYERS,
        "bidirectional": true,
        "dropout": 0.5,
        "pad_idx": 0
    })
    .to_string()
}

/// Random PyTorch-named weights for the fixture architecture.
pub fn weights() -> anyhow::Result<HashMap<String, Tensor>> {
    let dev = Device::Cpu;
    let gates = 4 * HIDDEN_DIM;
    let randn = |shape: &[usize]| Tensor::randn(0f32, 0.5, shape, &dev);

    let mut ts = HashMap::new();
    ts.insert("embedding.weight".to_string(), randn(&[VOCAB.len(), EMBEDDING_DIM])?);
    for layer in 0..N_LAYERS {
        let in_dim = if layer == 0 { EMBEDDING_DIM } else { 2 * HIDDEN_DIM };
        for suffix in ["", "_reverse"] {
            ts.insert(format!("rnn.weight_ih_l{layer}{suffix}"), randn(&[gates, in_dim])?);
            ts.insert(format!("rnn.weight_hh_l{layer}{suffix}"), randn(&[gates, HIDDEN_DIM])?);
            ts.insert(format!("rnn.bias_ih_l{layer}{suffix}"), randn(&[gates])?);
            ts.insert(format!("rnn.bias_hh_l{layer}{suffix}"), randn(&[gates])?);
        }
    }
    ts.insert("fc.weight".to_string(), randn(&[1, 2 * HIDDEN_DIM])?);
    ts.insert("fc.bias".to_string(), Tensor::zeros(1, DType::F32, &dev)?);
    Ok(ts)
}

pub fn write_model_dir(dir: &Path, weights: &HashMap<String, Tensor>) -> anyhow::Result<()> {
    std::fs::write(dir.join("config.json"), config_json())?;
    std::fs::write(dir.join("vocab.json"), serde_json::to_string(&VOCAB)?)?;
    candle_core::safetensors::save(weights, dir.join("model.safetensors"))?;
    Ok(())
}

/// Temporary model directory with `config.json`, `vocab.json` and `model.safetensors`.
pub fn model_dir() -> anyhow::Result<TempDir> {
    let dir = tempfile::tempdir()?;
    write_model_dir(dir.path(), &weights()?)?;
    Ok(dir)
}
