//! Output heads for the two encoder variants.
//!
//! The pretraining variant (`ekernel`) and the fine-tuning variant (`bm`)
//! share all graph and attention machinery and differ only here: what is
//! produced from the final atom states, and how the backbone may be
//! initialized. Variants are selected once at construction through a
//! capability interface, not through inheritance.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use thiserror::Error;

use super::layers::Linear;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid model_type: '{0}' (expected 'ekernel' or 'bm')")]
pub struct ParseModelTypeError(String);

/// Which encoder variant to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ModelType {
    /// Energy-kernel pretraining head.
    #[serde(rename = "ekernel")]
    EKernel,
    /// Backmapping fine-tuning head.
    #[serde(rename = "bm")]
    Backmapping,
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::EKernel => write!(f, "ekernel"),
            ModelType::Backmapping => write!(f, "bm"),
        }
    }
}

impl FromStr for ModelType {
    type Err = ParseModelTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ekernel" => Ok(ModelType::EKernel),
            "bm" => Ok(ModelType::Backmapping),
            other => Err(ParseModelTypeError(other.to_string())),
        }
    }
}

/// How the backbone weights start out.
///
/// Resolved once at startup from the optional `encoder` / `ckpt`
/// configuration references; the actual weight loading is the training
/// engine's job, the policy only records what it must do.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InitPolicy {
    /// Random seeded initialization.
    #[default]
    Fresh,
    /// Resume every weight from a full checkpoint.
    WarmStart(PathBuf),
    /// Reuse a pretrained encoder backbone and keep it fixed.
    FrozenBackbone(PathBuf),
}

impl InitPolicy {
    pub fn is_frozen(&self) -> bool {
        matches!(self, InitPolicy::FrozenBackbone(_))
    }
}

/// What a variant head produced for one structure.
#[derive(Debug, Clone)]
pub struct HeadOutput {
    /// Pooled per-structure embedding, when the variant produces one.
    pub structure_embedding: Option<Array1<f64>>,
    /// Per-atom outputs (e.g. backmapping displacements), when produced.
    pub atom_outputs: Option<Array2<f64>>,
}

/// Capability interface implemented by each variant's head.
pub trait VariantHead: Send + Sync {
    fn produces_embedding(&self) -> bool;

    fn produces_energy_kernel(&self) -> bool;

    /// Maps final atom states and their pooled mean to the variant output.
    fn forward(&self, atom_states: &Array2<f64>, pooled: &Array1<f64>) -> HeadOutput;

    /// Kernel value between two structure embeddings; `None` unless the
    /// variant produces an energy kernel.
    fn energy_kernel(&self, _a: &Array1<f64>, _b: &Array1<f64>) -> Option<f64> {
        None
    }
}

/// Pretraining head: projects the pooled state to a unit-norm embedding
/// whose pairwise exponentiated inner products form the energy kernel.
pub struct EnergyKernelHead {
    proj: Linear,
    temperature: f64,
}

impl EnergyKernelHead {
    pub fn init(hidden_dim: usize, temperature: f64, rng: &mut ChaCha8Rng) -> Self {
        Self {
            proj: Linear::init(hidden_dim, hidden_dim, rng),
            temperature,
        }
    }
}

impl VariantHead for EnergyKernelHead {
    fn produces_embedding(&self) -> bool {
        true
    }

    fn produces_energy_kernel(&self) -> bool {
        true
    }

    fn forward(&self, _atom_states: &Array2<f64>, pooled: &Array1<f64>) -> HeadOutput {
        let mut embedding = self.proj.forward_vec(pooled);
        let norm = embedding.dot(&embedding).sqrt();
        if norm > 0.0 {
            embedding /= norm;
        }
        HeadOutput {
            structure_embedding: Some(embedding),
            atom_outputs: None,
        }
    }

    fn energy_kernel(&self, a: &Array1<f64>, b: &Array1<f64>) -> Option<f64> {
        Some((a.dot(b) / self.temperature).exp())
    }
}

/// Fine-tuning head: predicts a 3-D displacement per atom, alongside the
/// pooled embedding for downstream use.
pub struct BackmappingHead {
    proj: Linear,
}

impl BackmappingHead {
    pub fn init(hidden_dim: usize, rng: &mut ChaCha8Rng) -> Self {
        Self {
            proj: Linear::init(hidden_dim, 3, rng),
        }
    }
}

impl VariantHead for BackmappingHead {
    fn produces_embedding(&self) -> bool {
        true
    }

    fn produces_energy_kernel(&self) -> bool {
        false
    }

    fn forward(&self, atom_states: &Array2<f64>, pooled: &Array1<f64>) -> HeadOutput {
        HeadOutput {
            structure_embedding: Some(pooled.clone()),
            atom_outputs: Some(self.proj.forward(atom_states)),
        }
    }
}
