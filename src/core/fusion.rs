//! Fusion of the two branches into one next-token distribution.
//!
//! The branches are summed with equal, fixed weight; there is no learned
//! fusion parameter. This is the architecture's second structural
//! constraint, distinguishing it from a generic weighted ensemble.

use ndarray::Array1;

/// Equal-weight elementwise sum of the two logit vectors.
pub fn fuse(slow_logits: &Array1<f32>, fast_logits: &Array1<f32>) -> Array1<f32> {
    assert_eq!(slow_logits.len(), fast_logits.len());
    slow_logits + fast_logits
}

/// Numerically stable softmax: subtract the max before exponentiating.
pub fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp: Array1<f32> = logits.mapv(|v| (v - max).exp());
    let sum: f32 = exp.sum();
    if sum > 0.0 {
        exp / sum
    } else {
        Array1::from_vec(vec![1.0 / logits.len() as f32; logits.len()])
    }
}

/// The fused next-token distribution.
pub fn next_token_distribution(
    slow_logits: &Array1<f32>,
    fast_logits: &Array1<f32>,
) -> Array1<f32> {
    softmax(&fuse(slow_logits, fast_logits))
}
