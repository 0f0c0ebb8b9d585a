//! Model wiring: embeddings, the context recurrence, both branches and the
//! fused next-token distribution.
//!
//! The forward pass is plain function composition over the components, in
//! this order:
//!
//! ```text
//! ids -> slow embeddings -> ContextCell -> SlowBranch (bias + logits)
//!     -> fast embeddings + bias -> FastBranch -> logits
//!     -> fuse -> softmax
//! ```
//!
//! A forward pass is a pure read of the parameters: identical input and
//! identical weights always produce an identical distribution. The only
//! randomness in the crate lives in the decoder's sampling policy.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::core::context_cell::ContextCell;
use crate::core::fast_branch::FastBranch;
use crate::core::fusion;
use crate::core::init::fan_scaled_matrix;
use crate::core::slow_branch::SlowBranch;
use crate::error::{Result, TidalError};
use crate::vocab::PAD_ID;

/// A token embedding table.
#[derive(Clone, Serialize, Deserialize)]
pub struct Embedding {
    /// Embedding matrix: [vocab, width]
    pub weight: Array2<f32>,
}

impl Embedding {
    pub fn zeros(vocab: usize, width: usize) -> Self {
        Self {
            weight: Array2::zeros((vocab, width)),
        }
    }

    pub fn init(vocab: usize, width: usize, rng: &mut StdRng) -> Self {
        Self {
            weight: fan_scaled_matrix(vocab, width, rng),
        }
    }

    /// Look up one row per id. Ids must already be validated.
    pub fn sequence(&self, ids: &[usize]) -> Array2<f32> {
        let mut out = Array2::zeros((ids.len(), self.weight.ncols()));
        for (t, &id) in ids.iter().enumerate() {
            out.row_mut(t).assign(&self.weight.row(id));
        }
        out
    }
}

/// The complete two-timescale model.
#[derive(Clone, Serialize, Deserialize)]
pub struct TidalModel {
    pub config: ModelConfig,

    /// Slow-path embedding table: [vocab, context_width]
    pub slow_embedding: Embedding,

    /// Fast-path embedding table: [vocab, fast_width]
    pub fast_embedding: Embedding,

    /// The decay-averaged context recurrence.
    pub context_cell: ContextCell,

    pub slow_branch: SlowBranch,

    pub fast_branch: FastBranch,
}

impl TidalModel {
    /// Zero-weight model. Useful as a fixture: the fused distribution is
    /// uniform until weights are set.
    pub fn zeros(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        let context_cell = ContextCell::new(config.decay_alpha, config.context_width)?;
        Ok(Self {
            slow_embedding: Embedding::zeros(config.vocab_size, config.context_width),
            fast_embedding: Embedding::zeros(config.vocab_size, config.fast_embedding_width),
            context_cell,
            slow_branch: SlowBranch::zeros(
                config.context_width,
                config.fast_embedding_width,
                config.vocab_size,
            ),
            fast_branch: FastBranch::zeros(
                config.fast_embedding_width,
                config.hidden_width,
                config.vocab_size,
            ),
            config,
        })
    }

    /// Randomly initialised model.
    pub fn init(config: ModelConfig, rng: &mut StdRng) -> Result<Self> {
        config.validate()?;
        let context_cell = ContextCell::new(config.decay_alpha, config.context_width)?;
        Ok(Self {
            slow_embedding: Embedding::init(config.vocab_size, config.context_width, rng),
            fast_embedding: Embedding::init(config.vocab_size, config.fast_embedding_width, rng),
            context_cell,
            slow_branch: SlowBranch::init(
                config.context_width,
                config.fast_embedding_width,
                config.vocab_size,
                rng,
            ),
            fast_branch: FastBranch::init(
                config.fast_embedding_width,
                config.hidden_width,
                config.vocab_size,
                rng,
            ),
            config,
        })
    }

    /// Full forward pass: history of token ids to next-token distribution.
    ///
    /// The history is left-padded to `max_sequence_length`; when longer, only
    /// the most recent tokens are kept. Ids outside `[0, vocab)` and weights
    /// whose shapes drifted from the configuration are reported as
    /// `DimensionMismatch`.
    pub fn forward(&self, ids: &[usize]) -> Result<Array1<f32>> {
        self.validate_shapes()?;
        for &id in ids {
            if id >= self.config.vocab_size {
                return Err(TidalError::DimensionMismatch(format!(
                    "token id {} is outside the vocabulary of size {}",
                    id, self.config.vocab_size
                )));
            }
        }

        let window = left_pad(ids, self.config.max_sequence_length);

        let slow_embedded = self.slow_embedding.sequence(&window);
        let contexts = self.context_cell.run(&slow_embedded);

        let bias = self.slow_branch.bias_sequence(&contexts);
        let c_last = contexts.row(contexts.nrows() - 1).to_owned();
        let slow_logits = self.slow_branch.final_logits(&c_last);

        let fast_embedded = self.fast_embedding.sequence(&window);
        let inputs = &fast_embedded + &bias;
        let h_last = self.fast_branch.final_hidden(&inputs);
        let fast_logits = self.fast_branch.output_logits(&h_last);

        Ok(fusion::next_token_distribution(&slow_logits, &fast_logits))
    }

    /// Check every weight shape against the configuration.
    fn validate_shapes(&self) -> Result<()> {
        let c = &self.config;
        let checks = [
            ("slow_embedding", self.slow_embedding.weight.dim(), (c.vocab_size, c.context_width)),
            ("fast_embedding", self.fast_embedding.weight.dim(), (c.vocab_size, c.fast_embedding_width)),
            ("w_bias", self.slow_branch.w_bias.dim(), (c.fast_embedding_width, c.context_width)),
            ("w_vocab", self.slow_branch.w_vocab.dim(), (c.vocab_size, c.context_width)),
            ("w_input", self.fast_branch.w_input.dim(), (c.hidden_width, c.fast_embedding_width)),
            ("w_hidden", self.fast_branch.w_hidden.dim(), (c.hidden_width, c.hidden_width)),
            ("w_out", self.fast_branch.w_out.dim(), (c.vocab_size, c.hidden_width)),
        ];
        for (name, got, want) in checks {
            if got != want {
                return Err(TidalError::DimensionMismatch(format!(
                    "{} has shape {:?}, configuration requires {:?}",
                    name, got, want
                )));
            }
        }
        if self.context_cell.width() != c.context_width {
            return Err(TidalError::DimensionMismatch(format!(
                "context cell width {} does not match context_width {}",
                self.context_cell.width(),
                c.context_width
            )));
        }
        Ok(())
    }

    pub fn param_count(&self) -> usize {
        self.slow_embedding.weight.len()
            + self.fast_embedding.weight.len()
            + self.slow_branch.param_count()
            + self.fast_branch.param_count()
    }

    /// Serialise all weights and the configuration.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialise a model and re-validate it before use.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let model: Self = bincode::deserialize(bytes)?;
        model.config.validate()?;
        model.validate_shapes()?;
        Ok(model)
    }
}

/// Left-pad with the pad id to `len`, keeping the most recent tokens when the
/// history is longer than the window.
fn left_pad(ids: &[usize], len: usize) -> Vec<usize> {
    if ids.len() >= len {
        return ids[ids.len() - len..].to_vec();
    }
    let mut window = vec![PAD_ID; len - ids.len()];
    window.extend_from_slice(ids);
    window
}
