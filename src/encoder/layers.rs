//! Forward-only numeric building blocks for the geometric encoder.
//!
//! Weights are plain `ndarray` matrices initialized from a seeded RNG so
//! that two encoders built with the same configuration and seed are
//! bit-identical. Gradient computation and weight updates belong to the
//! external training engine, never to these layers.

use ndarray::{Array1, Array2};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Dense affine map `y = x W + b`.
#[derive(Debug, Clone)]
pub struct Linear {
    weight: Array2<f64>,
    bias: Array1<f64>,
}

impl Linear {
    /// Xavier-uniform initialization over `[-sqrt(6 / (in + out)), +...]`.
    pub fn init(input_dim: usize, output_dim: usize, rng: &mut ChaCha8Rng) -> Self {
        let bound = (6.0 / (input_dim + output_dim) as f64).sqrt();
        let weight = Array2::from_shape_fn((input_dim, output_dim), |_| {
            rng.gen_range(-bound..bound)
        });
        Self {
            weight,
            bias: Array1::zeros(output_dim),
        }
    }

    pub fn forward(&self, input: &Array2<f64>) -> Array2<f64> {
        input.dot(&self.weight) + &self.bias
    }

    pub fn forward_vec(&self, input: &Array1<f64>) -> Array1<f64> {
        input.dot(&self.weight) + &self.bias
    }

    pub fn output_dim(&self) -> usize {
        self.weight.ncols()
    }
}

/// Per-row layer normalization with learned scale and shift.
#[derive(Debug, Clone)]
pub struct LayerNorm {
    gamma: Array1<f64>,
    beta: Array1<f64>,
    eps: f64,
}

impl LayerNorm {
    pub fn new(dim: usize) -> Self {
        Self {
            gamma: Array1::ones(dim),
            beta: Array1::zeros(dim),
            eps: 1e-5,
        }
    }

    pub fn forward(&self, input: &Array2<f64>) -> Array2<f64> {
        let mut output = input.clone();
        for mut row in output.rows_mut() {
            let mean = row.mean().unwrap_or(0.0);
            let var = row.mapv(|v| (v - mean).powi(2)).mean().unwrap_or(0.0);
            let denom = (var + self.eps).sqrt();
            row.zip_mut_with(&self.gamma, |v, &g| *v = (*v - mean) / denom * g);
            row += &self.beta;
        }
        output
    }
}

/// SiLU activation applied elementwise.
pub fn silu(input: &Array2<f64>) -> Array2<f64> {
    input.mapv(|v| v / (1.0 + (-v).exp()))
}

/// In-place stable softmax over a slice of logits.
pub fn softmax_in_place(logits: &mut [f64]) {
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for logit in logits.iter_mut() {
        *logit = (*logit - max).exp();
        sum += *logit;
    }
    if sum > 0.0 {
        for logit in logits.iter_mut() {
            *logit /= sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn linear_init_is_seed_deterministic() {
        let mut rng_a = ChaCha8Rng::seed_from_u64(9);
        let mut rng_b = ChaCha8Rng::seed_from_u64(9);
        let a = Linear::init(4, 3, &mut rng_a);
        let b = Linear::init(4, 3, &mut rng_b);
        let input = Array2::from_shape_fn((2, 4), |(i, j)| (i + j) as f64);
        assert_eq!(a.forward(&input), b.forward(&input));
    }

    #[test]
    fn linear_maps_shapes() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let layer = Linear::init(4, 7, &mut rng);
        let output = layer.forward(&Array2::zeros((3, 4)));
        assert_eq!(output.dim(), (3, 7));
        assert_eq!(layer.output_dim(), 7);
    }

    #[test]
    fn layer_norm_centers_and_scales_rows() {
        let norm = LayerNorm::new(4);
        let input = Array2::from_shape_fn((2, 4), |(i, j)| (i * 4 + j) as f64);
        let output = norm.forward(&input);
        for row in output.rows() {
            assert!(row.mean().unwrap().abs() < 1e-9);
        }
    }

    #[test]
    fn softmax_normalizes() {
        let mut logits = vec![1.0, 2.0, 3.0];
        softmax_in_place(&mut logits);
        let sum: f64 = logits.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(logits[2] > logits[1] && logits[1] > logits[0]);
    }

    #[test]
    fn softmax_survives_large_logits() {
        let mut logits = vec![1000.0, 1000.0];
        softmax_in_place(&mut logits);
        assert!((logits[0] - 0.5).abs() < 1e-12);
    }
}
