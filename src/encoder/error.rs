use thiserror::Error;

/// Errors from encoder construction and the forward pass.
#[derive(Debug, Error)]
pub enum Error {
    /// Hidden width must be positive and divisible by the head count.
    #[error("hidden_dim {hidden_dim} must be positive and divisible by heads {heads}")]
    InvalidWidth {
        /// Hidden width as configured.
        hidden_dim: usize,
        /// Attention head count as configured.
        heads: usize,
    },

    /// Layer count, FFN width, and expansion width must be positive.
    #[error("{field} must be positive")]
    NonPositive {
        /// Name of the offending configuration field.
        field: &'static str,
    },

    /// A per-edge feature matrix does not match the graph it came from.
    #[error("edge feature shape mismatch: expected {expected} rows x {expected_dim} cols, got {got} x {got_dim}")]
    FeatureShape {
        expected: usize,
        expected_dim: usize,
        got: usize,
        got_dim: usize,
    },

    /// A warm-start or frozen-encoder reference did not resolve.
    #[error("checkpoint reference does not resolve: {path}")]
    UnresolvedReference {
        /// The configured path.
        path: std::path::PathBuf,
    },
}
