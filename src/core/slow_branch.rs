//! Slow branch: projections out of the context-state sequence.
//!
//! Two independent learned projections share the context sequence as input:
//!
//! - a time-distributed affine map `context_width -> fast_width`, applied
//!   with the same weights to every timestep, producing the per-timestep
//!   bias injected into the fast recurrence;
//! - an affine map `context_width -> vocab` applied to the final context
//!   only, producing this branch's vocabulary logits.
//!
//! No weight tying between the two.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::init::fan_scaled_matrix;

/// Weights of the slow branch.
#[derive(Clone, Serialize, Deserialize)]
pub struct SlowBranch {
    /// Time-distributed bias projection: W_bias in R^{fast_width x context_width}
    pub w_bias: Array2<f32>,

    /// Bias term of the time-distributed projection.
    pub b_bias: Array1<f32>,

    /// Final-context vocabulary projection: W_vocab in R^{vocab x context_width}
    pub w_vocab: Array2<f32>,

    /// Bias term of the vocabulary projection.
    pub b_vocab: Array1<f32>,
}

impl SlowBranch {
    /// Zero-initialised weights.
    pub fn zeros(context_width: usize, fast_width: usize, vocab: usize) -> Self {
        Self {
            w_bias: Array2::zeros((fast_width, context_width)),
            b_bias: Array1::zeros(fast_width),
            w_vocab: Array2::zeros((vocab, context_width)),
            b_vocab: Array1::zeros(vocab),
        }
    }

    /// Randomly initialised weights; bias terms start at zero.
    pub fn init(context_width: usize, fast_width: usize, vocab: usize, rng: &mut StdRng) -> Self {
        Self {
            w_bias: fan_scaled_matrix(fast_width, context_width, rng),
            b_bias: Array1::zeros(fast_width),
            w_vocab: fan_scaled_matrix(vocab, context_width, rng),
            b_vocab: Array1::zeros(vocab),
        }
    }

    /// Apply the shared bias projection to every timestep.
    ///
    /// `contexts` is `[T, context_width]`; the result is `[T, fast_width]`.
    /// The map is stateless per timestep, so rows are computed in parallel;
    /// the result is identical to a sequential map.
    pub fn bias_sequence(&self, contexts: &Array2<f32>) -> Array2<f32> {
        assert_eq!(contexts.ncols(), self.w_bias.ncols());

        let t_len = contexts.nrows();
        let rows: Vec<Array1<f32>> = (0..t_len)
            .into_par_iter()
            .map(|t| {
                let c_t = contexts.row(t).to_owned();
                self.w_bias.dot(&c_t) + &self.b_bias
            })
            .collect();

        let mut bias = Array2::zeros((t_len, self.w_bias.nrows()));
        for (t, row) in rows.into_iter().enumerate() {
            bias.row_mut(t).assign(&row);
        }
        bias
    }

    /// This branch's vocabulary logits, computed from the final context.
    pub fn final_logits(&self, c_last: &Array1<f32>) -> Array1<f32> {
        self.w_vocab.dot(c_last) + &self.b_vocab
    }

    pub fn param_count(&self) -> usize {
        self.w_bias.len() + self.b_bias.len() + self.w_vocab.len() + self.b_vocab.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_bias_sequence_shape() {
        let branch = SlowBranch::zeros(3, 5, 7);
        let contexts = Array2::zeros((4, 3));
        assert_eq!(branch.bias_sequence(&contexts).dim(), (4, 5));
    }

    #[test]
    fn test_bias_weights_are_shared_across_time() {
        let mut branch = SlowBranch::zeros(2, 2, 4);
        branch.w_bias = array![[1.0, 2.0], [3.0, -1.0]];
        branch.b_bias = array![0.5, 0.0];

        // Identical context rows must yield identical bias rows.
        let contexts = array![[1.0, -1.0], [0.0, 2.0], [1.0, -1.0]];
        let bias = branch.bias_sequence(&contexts);
        assert_eq!(bias.row(0), bias.row(2));
        assert_eq!(bias.row(0), array![-0.5, 4.0].view());
    }

    #[test]
    fn test_final_logits() {
        let mut branch = SlowBranch::zeros(2, 2, 3);
        branch.w_vocab = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        branch.b_vocab = array![0.0, 0.0, 1.0];
        let logits = branch.final_logits(&array![2.0, -1.0]);
        assert_eq!(logits, array![2.0, -1.0, 2.0]);
    }

    #[test]
    fn test_projections_are_independent() {
        use rand::SeedableRng;
        let mut rng = StdRng::seed_from_u64(3);
        let branch = SlowBranch::init(4, 4, 8, &mut rng);
        // Same input width, but the two weight matrices are distinct draws.
        let top = branch.w_vocab.slice(ndarray::s![..4, ..]).to_owned();
        assert_ne!(branch.w_bias, top);
    }

    #[test]
    fn test_param_count() {
        let branch = SlowBranch::zeros(3, 5, 7);
        assert_eq!(branch.param_count(), 5 * 3 + 5 + 7 * 3 + 7);
    }
}
