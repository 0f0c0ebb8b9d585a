//! Model configuration.
//!
//! Every recognised option is an explicit field on [`ModelConfig`], validated
//! once at construction. There is no free-form keyword plumbing: a model is
//! built from a config value or not at all.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TidalError};

/// Number of reserved sentinel ids (pad, start, end).
pub const N_SENTINELS: usize = 3;

/// Dimensions and constants of the two-timescale model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Width of the decay-averaged context state.
    pub context_width: usize,

    /// Width of the fast recurrence's hidden state.
    pub hidden_width: usize,

    /// Width of the slow-path token embedding. The context update is
    /// elementwise, so this must equal `context_width`.
    pub slow_embedding_width: usize,

    /// Width of the fast-path token embedding (and of the per-timestep bias
    /// added to it).
    pub fast_embedding_width: usize,

    /// Fixed window length. Shorter histories are left-padded to this length,
    /// longer histories keep only their most recent tokens.
    pub max_sequence_length: usize,

    /// Decay constant of the context state, in `[0, 1]`. `0` admits only the
    /// current input, `1` admits nothing.
    ///
    /// Tunable coupling: histories are left-padded, so leading pad positions
    /// enter the context arithmetic. Their influence on the final context
    /// shrinks with each real token but never reaches exactly zero; pick
    /// `decay_alpha` against `max_sequence_length` so that it is negligible.
    pub decay_alpha: f32,

    /// Vocabulary size, sentinels included.
    pub vocab_size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            context_width: 64,
            hidden_width: 128,
            slow_embedding_width: 64,
            fast_embedding_width: 64,
            max_sequence_length: 80,
            decay_alpha: 0.97,
            vocab_size: 128,
        }
    }
}

impl ModelConfig {
    /// Validate the configuration. Called by every model constructor before
    /// any parameter is allocated.
    pub fn validate(&self) -> Result<()> {
        if !self.decay_alpha.is_finite() || !(0.0..=1.0).contains(&self.decay_alpha) {
            return Err(TidalError::InvalidConfiguration(format!(
                "decay_alpha must lie in [0, 1], got {}",
                self.decay_alpha
            )));
        }
        if self.slow_embedding_width != self.context_width {
            return Err(TidalError::InvalidConfiguration(format!(
                "slow_embedding_width ({}) must equal context_width ({}): the context update is elementwise",
                self.slow_embedding_width, self.context_width
            )));
        }
        if self.context_width == 0
            || self.hidden_width == 0
            || self.fast_embedding_width == 0
            || self.max_sequence_length == 0
        {
            return Err(TidalError::InvalidConfiguration(
                "all widths and the sequence length must be nonzero".into(),
            ));
        }
        if self.vocab_size <= N_SENTINELS {
            return Err(TidalError::InvalidConfiguration(format!(
                "vocab_size ({}) must exceed the {} reserved sentinels",
                self.vocab_size, N_SENTINELS
            )));
        }
        Ok(())
    }
}
