//! Error type for the training loop.
//!
//! Dataset and graph errors abort the run; non-finite losses and metrics
//! are propagated upward for the external engine's owner to handle, never
//! recovered here. Early stopping is a normal return path, not an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Dataset registry or batch assembler failure.
    #[error(transparent)]
    Data(#[from] crate::data::Error),

    /// Neighbor graph construction or radial featurization failure.
    #[error(transparent)]
    Graph(#[from] crate::graph::Error),

    /// Encoder construction or forward failure.
    #[error(transparent)]
    Encoder(#[from] crate::encoder::Error),

    /// The engine produced a non-finite training loss.
    #[error("non-finite loss at epoch {epoch}, step {step}")]
    NonFiniteLoss {
        /// Epoch index when the loss diverged.
        epoch: usize,
        /// Global step when the loss diverged.
        step: usize,
    },

    /// The engine produced a non-finite validation metric.
    #[error("non-finite validation metric at epoch {epoch}")]
    NonFiniteMetric {
        /// Epoch index when the metric diverged.
        epoch: usize,
    },

    /// The external training engine failed.
    #[error("training engine error: {0}")]
    Engine(String),

    /// The external checkpoint sink failed.
    #[error("checkpoint sink error: {0}")]
    Checkpoint(String),

    /// A prefetch worker disappeared without delivering its batch.
    #[error("prefetch worker terminated unexpectedly")]
    PrefetchWorkerLost,
}
