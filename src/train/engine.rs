//! The external autodiff collaborator's contract.
//!
//! The training loop never computes gradients itself: it drives an
//! [`Engine`] through forward/backward, reads the gradient norm to apply
//! clipping, and hands over the learning rate for the update. Divergence
//! (non-finite losses or metrics) is the loop's to detect and propagate,
//! the engine's owner's to handle.

use super::checkpoint::ModelSnapshot;
use super::prefetch::GraphBatch;

/// External training-step engine driven by the [`Trainer`](super::Trainer).
pub trait Engine: Send {
    /// Runs forward and backward on one batch, accumulating gradients, and
    /// returns the scalar loss.
    fn forward_backward(&mut self, batch: &GraphBatch) -> Result<f64, String>;

    /// Global L2 norm of the currently accumulated gradients.
    fn gradient_norm(&self) -> f64;

    /// Scales every accumulated gradient by `factor` (used for clipping).
    fn scale_gradients(&mut self, factor: f64);

    /// Applies one optimizer update at `lr` and clears the gradients.
    fn apply_update(&mut self, lr: f64) -> Result<(), String>;

    /// Mean validation metric over one batch (no gradient side effects).
    fn validate(&mut self, batch: &GraphBatch) -> Result<f64, String>;

    /// Serialized model state for the checkpoint sink.
    fn snapshot(&self) -> ModelSnapshot;
}
