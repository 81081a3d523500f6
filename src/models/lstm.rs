//! Bidirectional multi-layer LSTM sentence encoder.
//!
//! Weight names and gate layout follow PyTorch's `nn.LSTM` (`weight_ih_l{k}`,
//! `weight_hh_l{k}`, `bias_ih_l{k}`, `bias_hh_l{k}`, `_reverse` for the backward
//! direction; gates stacked as input, forget, cell, output), so a `state_dict` exported
//! from a trained `nn.LSTM` loads without renaming.
//!
//! Batches are right-padded and masked. At a padded step the recurrent state is carried
//! over unchanged and the step output is zero, which gives the same final states as
//! running each sequence on its own (PyTorch's packed sequences).

use candle_core::{Device, IndexOp, Shape, Tensor, D};
use candle_nn::ops::sigmoid;
use candle_nn::{Embedding, Module, VarBuilder};

use super::config::ModelConfig;
use crate::error::{PipelineError, Result};

/// Selects between the stochastic training path and the deterministic serving path.
///
/// Dropout only runs in [`Mode::Training`]. Serving always uses [`Mode::Inference`],
/// where every dropout site is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Dropout disabled; outputs are reproducible.
    #[default]
    Inference,
    /// Dropout enabled at the embedding, between layers and on the final state.
    Training,
}

pub(crate) fn dropout(xs: &Tensor, rate: f32, mode: Mode) -> Result<Tensor> {
    match mode {
        Mode::Inference => Ok(xs.clone()),
        Mode::Training if rate > 0.0 => Ok(candle_nn::ops::dropout(xs, rate)?),
        Mode::Training => Ok(xs.clone()),
    }
}

/// Fetch a named tensor, turning missing or mis-shaped weights into [`PipelineError::ShapeMismatch`].
pub(crate) fn load_weight<S: Into<Shape>>(vb: &VarBuilder, shape: S, name: &str) -> Result<Tensor> {
    vb.get(shape, name).map_err(|e| {
        PipelineError::ShapeMismatch(format!("Weight '{name}' does not match the config: {e}"))
    })
}

#[derive(Debug, Clone)]
struct LstmDirection {
    // Stored transposed: (in, 4H) and (H, 4H).
    w_ih: Tensor,
    w_hh: Tensor,
    // b_ih + b_hh, (4H)
    bias: Tensor,
    hidden_dim: usize,
    reverse: bool,
}

impl LstmDirection {
    fn load(
        vb: &VarBuilder,
        in_dim: usize,
        hidden_dim: usize,
        layer_idx: usize,
        reverse: bool,
    ) -> Result<Self> {
        let suffix = if reverse { "_reverse" } else { "" };
        let gates = 4 * hidden_dim;

        let w_ih = load_weight(vb, (gates, in_dim), &format!("rnn.weight_ih_l{layer_idx}{suffix}"))?;
        let w_hh =
            load_weight(vb, (gates, hidden_dim), &format!("rnn.weight_hh_l{layer_idx}{suffix}"))?;
        let b_ih = load_weight(vb, gates, &format!("rnn.bias_ih_l{layer_idx}{suffix}"))?;
        let b_hh = load_weight(vb, gates, &format!("rnn.bias_hh_l{layer_idx}{suffix}"))?;

        Ok(Self {
            w_ih: w_ih.t()?.contiguous()?,
            w_hh: w_hh.t()?.contiguous()?,
            bias: (b_ih + b_hh)?,
            hidden_dim,
            reverse,
        })
    }

    /// `xs` is (batch, seq, in), `mask` is (batch, seq) with 1.0 on real tokens.
    ///
    /// Returns the per-step outputs (batch, seq, H), zero on padding, and the final
    /// hidden state (batch, H).
    fn forward(&self, xs: &Tensor, mask: &Tensor) -> Result<(Tensor, Tensor)> {
        let (batch, seq_len, in_dim) = xs.dims3()?;
        let gates_dim = 4 * self.hidden_dim;

        // Input projections for every step at once; only the recurrent term is sequential.
        let projected = xs
            .reshape((batch * seq_len, in_dim))?
            .matmul(&self.w_ih)?
            .broadcast_add(&self.bias)?
            .reshape((batch, seq_len, gates_dim))?;

        let mut h = Tensor::zeros((batch, self.hidden_dim), xs.dtype(), xs.device())?;
        let mut c = h.clone();
        let mut outputs = Vec::with_capacity(seq_len);

        for i in 0..seq_len {
            let t = if self.reverse { seq_len - 1 - i } else { i };
            let step_mask = mask.i((.., t))?.unsqueeze(1)?;
            let carry = step_mask.affine(-1.0, 1.0)?;

            let gates = (projected.i((.., t, ..))? + h.matmul(&self.w_hh)?)?;
            let chunks = gates.chunk(4, D::Minus1)?;
            let input_gate = sigmoid(&chunks[0])?;
            let forget_gate = sigmoid(&chunks[1])?;
            let candidate = chunks[2].tanh()?;
            let output_gate = sigmoid(&chunks[3])?;

            let c_next = ((forget_gate * &c)? + (input_gate * candidate)?)?;
            let h_next = (output_gate * c_next.tanh()?)?;

            let h_step = h_next.broadcast_mul(&step_mask)?;
            c = (c_next.broadcast_mul(&step_mask)? + c.broadcast_mul(&carry)?)?;
            h = (&h_step + h.broadcast_mul(&carry)?)?;
            outputs.push(h_step);
        }

        if self.reverse {
            outputs.reverse();
        }
        Ok((Tensor::stack(&outputs, 1)?, h))
    }
}

#[derive(Debug, Clone)]
struct BiLstmLayer {
    fwd: LstmDirection,
    bwd: LstmDirection,
    span: tracing::Span,
}

impl BiLstmLayer {
    /// Returns (outputs (batch, seq, 2H), forward final state, backward final state).
    fn forward(&self, xs: &Tensor, mask: &Tensor) -> Result<(Tensor, Tensor, Tensor)> {
        let _enter = self.span.enter();
        let (fwd_out, fwd_h) = self.fwd.forward(xs, mask)?;
        let (bwd_out, bwd_h) = self.bwd.forward(xs, mask)?;
        let outputs = Tensor::cat(&[&fwd_out, &bwd_out], D::Minus1)?;
        Ok((outputs, fwd_h, bwd_h))
    }
}

/// Embedding + stacked bidirectional LSTM producing one `2 * hidden_dim` vector per sentence.
#[derive(Debug, Clone)]
pub struct SequenceEncoder {
    embedding: Embedding,
    layers: Vec<BiLstmLayer>,
    vocab_size: usize,
    hidden_dim: usize,
    pad_index: u32,
    dropout: f32,
    device: Device,
    span: tracing::Span,
}

impl SequenceEncoder {
    /// Load `embedding.weight` and the `rnn.*` tensors described by `config`.
    pub fn load(config: &ModelConfig, pad_index: u32, vb: &VarBuilder) -> Result<Self> {
        let embeddings = load_weight(
            vb,
            (config.vocab_size, config.embedding_dim),
            "embedding.weight",
        )?;
        let embedding = Embedding::new(embeddings, config.embedding_dim);

        let mut layers = Vec::with_capacity(config.n_layers);
        for layer_idx in 0..config.n_layers {
            let in_dim = if layer_idx == 0 {
                config.embedding_dim
            } else {
                config.representation_dim()
            };
            layers.push(BiLstmLayer {
                fwd: LstmDirection::load(vb, in_dim, config.hidden_dim, layer_idx, false)?,
                bwd: LstmDirection::load(vb, in_dim, config.hidden_dim, layer_idx, true)?,
                span: tracing::span!(tracing::Level::TRACE, "lstm-layer", layer = layer_idx),
            });
        }

        Ok(Self {
            embedding,
            layers,
            vocab_size: config.vocab_size,
            hidden_dim: config.hidden_dim,
            pad_index,
            dropout: config.dropout,
            device: vb.device().clone(),
            span: tracing::span!(tracing::Level::TRACE, "encoder"),
        })
    }

    /// Width of the produced sentence vectors.
    pub fn output_dim(&self) -> usize {
        2 * self.hidden_dim
    }

    /// Index used to right-pad shorter sequences in a batch.
    pub fn pad_index(&self) -> u32 {
        self.pad_index
    }

    /// Encode a batch of index sequences into a (batch, 2H) tensor.
    ///
    /// # Errors
    ///
    /// [`PipelineError::EmptySequence`] if any sequence has no tokens,
    /// [`PipelineError::InvalidInput`] for an empty batch or an index outside the vocabulary.
    pub fn encode(&self, sequences: &[Vec<u32>], mode: Mode) -> Result<Tensor> {
        let (ids, mask) = self.pad_batch(sequences)?;
        self.forward(&ids, &mask, mode)
    }

    /// Run on already padded `ids` (batch, seq) with a float `mask` (batch, seq).
    pub fn forward(&self, ids: &Tensor, mask: &Tensor, mode: Mode) -> Result<Tensor> {
        let _enter = self.span.enter();
        let embedded = self.embedding.forward(ids)?;
        let mut xs = dropout(&embedded, self.dropout, mode)?;

        let mut final_states = None;
        let last = self.layers.len().saturating_sub(1);
        for (idx, layer) in self.layers.iter().enumerate() {
            let (outputs, fwd_h, bwd_h) = layer.forward(&xs, mask)?;
            final_states = Some((fwd_h, bwd_h));
            xs = if idx < last {
                dropout(&outputs, self.dropout, mode)?
            } else {
                outputs
            };
        }

        let (fwd_h, bwd_h) = final_states
            .ok_or_else(|| PipelineError::Unexpected("Encoder has no recurrent layers".into()))?;
        let hidden = Tensor::cat(&[&fwd_h, &bwd_h], D::Minus1)?;
        dropout(&hidden, self.dropout, mode)
    }

    fn pad_batch(&self, sequences: &[Vec<u32>]) -> Result<(Tensor, Tensor)> {
        if sequences.is_empty() {
            return Err(PipelineError::InvalidInput(
                "Cannot encode an empty batch".into(),
            ));
        }
        if let Some(position) = sequences.iter().position(|s| s.is_empty()) {
            return Err(PipelineError::EmptySequence(format!(
                "Sequence {position} has no tokens; the encoder needs at least one"
            )));
        }
        if let Some(&index) = sequences
            .iter()
            .flatten()
            .find(|&&index| index as usize >= self.vocab_size)
        {
            return Err(PipelineError::InvalidInput(format!(
                "Token index {index} is outside the vocabulary of {} entries",
                self.vocab_size
            )));
        }

        let batch = sequences.len();
        let max_len = sequences.iter().map(Vec::len).max().unwrap_or(0);
        let mut ids = Vec::with_capacity(batch * max_len);
        let mut mask = Vec::with_capacity(batch * max_len);
        for sequence in sequences {
            let padding = max_len - sequence.len();
            ids.extend_from_slice(sequence);
            ids.extend(std::iter::repeat(self.pad_index).take(padding));
            mask.extend(std::iter::repeat(1f32).take(sequence.len()));
            mask.extend(std::iter::repeat(0f32).take(padding));
        }

        let ids = Tensor::from_vec(ids, (batch, max_len), &self.device)?;
        let mask = Tensor::from_vec(mask, (batch, max_len), &self.device)?;
        Ok((ids, mask))
    }
}
