//! Decay-averaged context recurrence.
//!
//! The cell maintains a slow-changing summary of the input sequence via a
//! per-element exponential moving average:
//!
//! ```text
//! c_0 = 0
//! c_t = (1 - alpha) * e_t + alpha * c_{t-1}
//! ```
//!
//! The mixing coefficient `alpha` is a single scalar fixed at construction.
//! It is not learned and not data-dependent, which is the defining structural
//! constraint of this architecture: the context moves at a rate chosen up
//! front, regardless of what the sequence contains.
//!
//! Each step is a convex combination of the current input and the prior
//! state, so the state never grows beyond its inputs. Padded leading
//! positions participate in the arithmetic like any other position; with
//! left padding and `alpha` near 1 their influence on the final context is
//! minor but never exactly zero. That residue is an accepted approximation.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TidalError};

/// The exponential-smoothing recurrence over a slow-embedding sequence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContextCell {
    alpha: f32,
    width: usize,
}

impl ContextCell {
    /// Create a cell with the given decay constant and state width.
    ///
    /// Fails with `InvalidConfiguration` when `alpha` is outside `[0, 1]`.
    /// The update itself cannot fail at runtime: it is pure elementwise
    /// arithmetic with no division.
    pub fn new(alpha: f32, width: usize) -> Result<Self> {
        if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
            return Err(TidalError::InvalidConfiguration(format!(
                "decay constant must lie in [0, 1], got {}",
                alpha
            )));
        }
        Ok(Self { alpha, width })
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Run the recurrence over the full sequence.
    ///
    /// `embeddings` is `[T, width]`; the result holds `c_1..c_T` row per row.
    pub fn run(&self, embeddings: &Array2<f32>) -> Array2<f32> {
        assert_eq!(embeddings.ncols(), self.width);

        let t_len = embeddings.nrows();
        let mut contexts = Array2::zeros((t_len, self.width));
        let mut prev: Array1<f32> = Array1::zeros(self.width);

        for t in 0..t_len {
            let e_t = embeddings.row(t);
            let c_t = &e_t.to_owned() * (1.0 - self.alpha) + &prev * self.alpha;
            contexts.row_mut(t).assign(&c_t);
            prev = c_t;
        }

        contexts
    }

    /// Only the final context `c_T`. Zero for an empty sequence.
    pub fn final_context(&self, embeddings: &Array2<f32>) -> Array1<f32> {
        let contexts = self.run(embeddings);
        match contexts.nrows() {
            0 => Array1::zeros(self.width),
            n => contexts.row(n - 1).to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sequence() -> Array2<f32> {
        array![[1.0, -2.0], [0.5, 4.0], [-3.0, 0.25]]
    }

    #[test]
    fn test_alpha_validation() {
        assert!(ContextCell::new(-0.01, 4).is_err());
        assert!(ContextCell::new(1.01, 4).is_err());
        assert!(ContextCell::new(f32::NAN, 4).is_err());
        assert!(ContextCell::new(0.0, 4).is_ok());
        assert!(ContextCell::new(1.0, 4).is_ok());
    }

    #[test]
    fn test_alpha_zero_is_identity() {
        // alpha = 0 admits only the current input: c_t == e_t exactly.
        let cell = ContextCell::new(0.0, 2).unwrap();
        let input = sequence();
        let contexts = cell.run(&input);
        assert_eq!(contexts, input);
    }

    #[test]
    fn test_alpha_one_is_zero() {
        // alpha = 1 admits nothing: the state stays at its zero init.
        let cell = ContextCell::new(1.0, 2).unwrap();
        let contexts = cell.run(&sequence());
        assert_eq!(contexts, Array2::<f32>::zeros((3, 2)));
    }

    #[test]
    fn test_update_rule() {
        let cell = ContextCell::new(0.5, 2).unwrap();
        let contexts = cell.run(&sequence());
        // c_1 = 0.5 * e_1
        assert_eq!(contexts.row(0), array![0.5, -1.0].view());
        // c_2 = 0.5 * e_2 + 0.5 * c_1
        assert_eq!(contexts.row(1), array![0.5, 1.5].view());
    }

    #[test]
    fn test_convex_combination_bound() {
        // Each step is convex in (e_t, c_{t-1}): |c_t| <= max(|e_t|, |c_{t-1}|)
        // per element, for any alpha.
        for alpha in [0.0, 0.25, 0.5, 0.9, 1.0] {
            let cell = ContextCell::new(alpha, 2).unwrap();
            let input = sequence();
            let contexts = cell.run(&input);
            let mut prev = Array1::zeros(2);
            for t in 0..input.nrows() {
                for j in 0..2 {
                    let bound = input[[t, j]].abs().max(prev[j]);
                    assert!(
                        contexts[[t, j]].abs() <= bound + 1e-6,
                        "alpha={} t={} j={}",
                        alpha,
                        t,
                        j
                    );
                }
                prev = contexts.row(t).mapv(f32::abs);
            }
        }
    }

    #[test]
    fn test_final_context_matches_last_row() {
        let cell = ContextCell::new(0.7, 2).unwrap();
        let input = sequence();
        let contexts = cell.run(&input);
        assert_eq!(cell.final_context(&input), contexts.row(2).to_owned());
    }

    #[test]
    fn test_final_context_empty_sequence() {
        let cell = ContextCell::new(0.7, 3).unwrap();
        let empty = Array2::<f32>::zeros((0, 3));
        assert_eq!(cell.final_context(&empty), Array1::<f32>::zeros(3));
    }

    #[test]
    fn test_leading_pad_influence_decays() {
        // A large value at position 0 is attenuated by alpha^(T-1) relative
        // to the same value at the final position.
        let cell = ContextCell::new(0.9, 1).unwrap();
        let mut input = Array2::zeros((10, 1));
        input[[0, 0]] = 100.0;
        let early = cell.final_context(&input)[0];

        let mut input = Array2::zeros((10, 1));
        input[[9, 0]] = 100.0;
        let late = cell.final_context(&input)[0];

        assert!(early.abs() < late.abs() * 0.5);
        assert!(early.abs() > 0.0); // attenuated, never exactly eliminated
    }
}
