//! Error types for dataset access and batch assembly.
//!
//! Configuration problems (unresolvable paths, empty datasets, invalid
//! budgets) are surfaced when the registry or assembler is built, before any
//! epoch runs. Data problems (empty structures, malformed positions) are
//! fatal for the run: skipping them silently would corrupt the batch cost
//! accounting.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A named dataset path did not resolve to a readable directory.
    #[error("dataset '{name}' does not resolve: {path} ({detail})")]
    UnresolvedDataset {
        /// Dataset name as configured.
        name: String,
        /// The path that failed to resolve.
        path: PathBuf,
        /// Description of the problem.
        detail: String,
    },

    /// A dataset resolved but contains no structures.
    #[error("dataset '{name}' is empty")]
    EmptyDataset {
        /// Dataset name as configured.
        name: String,
    },

    /// The registry admits no structures after tier filtering.
    #[error("no structures admitted by complexity selector across {dataset_count} dataset(s)")]
    NothingAdmitted {
        /// Number of registered datasets.
        dataset_count: usize,
    },

    /// A structure with zero atoms was yielded by a source.
    #[error("structure {index} of dataset '{origin}' has no atoms")]
    EmptyStructure {
        /// Dataset the structure came from.
        origin: String,
        /// Index of the structure within its dataset.
        index: usize,
    },

    /// A structure contains a non-finite atom position.
    #[error("structure {index} of dataset '{origin}' has a non-finite position at atom {atom}")]
    NonFinitePosition {
        /// Dataset the structure came from.
        origin: String,
        /// Index of the structure within its dataset.
        index: usize,
        /// Index of the offending atom.
        atom: usize,
    },

    /// A source failed to decode one of its entries.
    #[error("failed to decode entry {index} of dataset '{origin}': {detail}")]
    Decode {
        /// Dataset the entry belongs to.
        origin: String,
        /// Index of the entry within its dataset.
        index: usize,
        /// Description of the decode failure.
        detail: String,
    },

    /// The per-batch cost budget must be positive.
    #[error("ubound_per_batch must be positive (got {0})")]
    InvalidBudget(usize),

    /// Filesystem enumeration failed.
    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    pub fn unresolved_dataset(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        detail: impl Into<String>,
    ) -> Self {
        Self::UnresolvedDataset {
            name: name.into(),
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn decode(origin: impl Into<String>, index: usize, detail: impl Into<String>) -> Self {
        Self::Decode {
            origin: origin.into(),
            index,
            detail: detail.into(),
        }
    }
}
