use thiserror::Error;

/// Errors from neighbor-graph construction and radial featurization.
#[derive(Debug, Error)]
pub enum Error {
    /// Graph construction requires at least one atom.
    #[error("structure has no atoms: neighbor graph construction requires at least one")]
    EmptyStructure,

    /// Cutoff radii must satisfy `0 <= lower < upper`.
    #[error("invalid cutoff radii: lower {lower} must be non-negative and below upper {upper}")]
    InvalidCutoffs {
        /// Lower cutoff as configured.
        lower: f64,
        /// Upper cutoff as configured.
        upper: f64,
    },

    /// The hydrogen cutoff must be positive and no larger than the upper cutoff.
    #[error("invalid hydrogen cutoff {cutoff_h}: must be in (0, {upper}]")]
    InvalidHydrogenCutoff {
        /// Hydrogen cutoff as configured.
        cutoff_h: f64,
        /// Upper cutoff as configured.
        upper: f64,
    },

    /// `k_neighbors` must be positive.
    #[error("k_neighbors must be positive")]
    InvalidNeighborCount,

    /// The radial basis needs at least one basis function.
    #[error("rbf_dim must be positive")]
    InvalidBasisSize,
}
