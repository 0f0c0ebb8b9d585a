//! Random parameter initialisation.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

/// Gaussian matrix with fan-scaled deviation: sigma = sqrt(2 / (rows + cols)).
pub(crate) fn fan_scaled_matrix(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<f32> {
    let sigma = (2.0 / (rows + cols) as f32).sqrt();
    let normal = Normal::new(0.0, sigma).expect("sigma is positive");
    Array2::from_shape_fn((rows, cols), |_| normal.sample(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_init_is_seeded() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        assert_eq!(
            fan_scaled_matrix(4, 3, &mut a),
            fan_scaled_matrix(4, 3, &mut b)
        );
    }

    #[test]
    fn test_init_scale_shrinks_with_fan() {
        let mut rng = StdRng::seed_from_u64(0);
        let wide = fan_scaled_matrix(256, 256, &mut rng);
        let max = wide.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        // sigma = sqrt(2/512) ~ 0.0625; values beyond 10 sigma would be absurd
        assert!(max < 0.625, "max |w| = {}", max);
    }
}
