//! Fast branch: a conventional single-layer tanh recurrence.
//!
//! The input at each step is the elementwise sum of the fast-path token
//! embedding and the slow branch's per-timestep bias, so the context signal
//! modulates the recurrence's effective input at every step instead of only
//! seeding it. Only the final hidden state is kept; it is projected to this
//! branch's vocabulary logits.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::core::init::fan_scaled_matrix;

/// Weights of the fast recurrence.
#[derive(Clone, Serialize, Deserialize)]
pub struct FastBranch {
    /// Input projection: W_x in R^{hidden x fast_width}
    pub w_input: Array2<f32>,

    /// Hidden projection: W_h in R^{hidden x hidden}
    pub w_hidden: Array2<f32>,

    /// Hidden bias.
    pub b_hidden: Array1<f32>,

    /// Output projection: W_o in R^{vocab x hidden}
    pub w_out: Array2<f32>,

    /// Output bias.
    pub b_out: Array1<f32>,
}

impl FastBranch {
    pub fn zeros(fast_width: usize, hidden: usize, vocab: usize) -> Self {
        Self {
            w_input: Array2::zeros((hidden, fast_width)),
            w_hidden: Array2::zeros((hidden, hidden)),
            b_hidden: Array1::zeros(hidden),
            w_out: Array2::zeros((vocab, hidden)),
            b_out: Array1::zeros(vocab),
        }
    }

    pub fn init(fast_width: usize, hidden: usize, vocab: usize, rng: &mut StdRng) -> Self {
        Self {
            w_input: fan_scaled_matrix(hidden, fast_width, rng),
            w_hidden: fan_scaled_matrix(hidden, hidden, rng),
            b_hidden: Array1::zeros(hidden),
            w_out: fan_scaled_matrix(vocab, hidden, rng),
            b_out: Array1::zeros(vocab),
        }
    }

    /// One recurrence step: `h' = tanh(W_x x + W_h h + b)`.
    fn step(&self, x_t: &Array1<f32>, h_prev: &Array1<f32>) -> Array1<f32> {
        let pre = self.w_input.dot(x_t) + self.w_hidden.dot(h_prev) + &self.b_hidden;
        pre.mapv(f32::tanh)
    }

    /// Run the recurrence over `[T, fast_width]` inputs and return `h_T`.
    ///
    /// Earlier hidden states are not exposed. Zero for an empty sequence.
    pub fn final_hidden(&self, inputs: &Array2<f32>) -> Array1<f32> {
        assert_eq!(inputs.ncols(), self.w_input.ncols());

        let mut h = Array1::zeros(self.w_hidden.nrows());
        for t in 0..inputs.nrows() {
            let x_t = inputs.row(t).to_owned();
            h = self.step(&x_t, &h);
        }
        h
    }

    /// This branch's vocabulary logits, computed from the final hidden state.
    pub fn output_logits(&self, h_last: &Array1<f32>) -> Array1<f32> {
        self.w_out.dot(h_last) + &self.b_out
    }

    pub fn param_count(&self) -> usize {
        self.w_input.len()
            + self.w_hidden.len()
            + self.b_hidden.len()
            + self.w_out.len()
            + self.b_out.len()
    }
}
