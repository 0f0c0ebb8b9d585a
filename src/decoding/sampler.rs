//! Token selection policies.
//!
//! Randomness enters the crate only here, and only through an explicit
//! generator handle passed by the caller; there is no process-wide RNG.

use ndarray::Array1;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;

use crate::error::{Result, TidalError};

/// How the next token is selected from the distribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Argmax of the raw distribution. Deterministic.
    Greedy,

    /// One categorical draw from the distribution with the pad symbol's mass
    /// removed and the remainder renormalised. Pad is structurally
    /// unreachable under this policy.
    Sample,
}

/// Argmax index of a probability vector.
pub fn argmax(probs: &Array1<f32>) -> usize {
    probs
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Draw one token, never the pad symbol.
///
/// Fails with `DegenerateDistribution` when the non-pad mass is numerically
/// zero instead of dividing by it.
pub fn sample_non_pad(probs: &Array1<f32>, pad_id: usize, rng: &mut StdRng) -> Result<usize> {
    let mut weights = probs.to_vec();
    if pad_id < weights.len() {
        weights[pad_id] = 0.0;
    }

    let total: f32 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(TidalError::DegenerateDistribution);
    }

    let categorical =
        WeightedIndex::new(&weights).map_err(|_| TidalError::DegenerateDistribution)?;
    Ok(categorical.sample(rng))
}

/// Select the next token under the given policy.
pub fn select(probs: &Array1<f32>, policy: Policy, pad_id: usize, rng: &mut StdRng) -> Result<usize> {
    match policy {
        Policy::Greedy => Ok(argmax(probs)),
        Policy::Sample => sample_non_pad(probs, pad_id, rng),
    }
}
