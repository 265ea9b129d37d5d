//! Budget-bounded batch assembly.
//!
//! A streaming, first-fit packer: structures are drawn in the epoch order
//! and accumulated into the open batch while the running cost stays within
//! the budget. This is deliberately not optimal bin packing — the upstream
//! sequence is lazy, so future sizes are unknown and an O(1) amortized
//! accept/seal decision is the right trade-off.

use std::sync::Arc;

use super::error::Error;
use super::registry::{DatasetRegistry, DrawOptions};
use crate::model::{Origin, Structure};

/// An ordered group of structures consumed by one training step.
#[derive(Debug, Clone)]
pub struct Batch {
    structures: Vec<Structure>,
    total_cost: usize,
}

impl Batch {
    fn new() -> Self {
        Self {
            structures: Vec::new(),
            total_cost: 0,
        }
    }

    fn push(&mut self, structure: Structure) {
        self.total_cost += structure.cost();
        self.structures.push(structure);
    }

    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    /// Sum of per-structure costs (atom counts) in this batch.
    pub fn total_cost(&self) -> usize {
        self.total_cost
    }

    /// The batch's dataset origin, when every structure shares one.
    pub fn uniform_origin(&self) -> Option<&Origin> {
        let first = &self.structures.first()?.origin;
        self.structures
            .iter()
            .all(|s| &s.origin == first)
            .then_some(first)
    }
}

/// Packing policy for one epoch of batches.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Maximum total cost per batch.
    pub ubound_per_batch: usize,
    /// Maximum number of structures per batch.
    pub batch_size: usize,
    /// Cap on batches emitted per epoch; `None` runs the sequence dry.
    pub max_batches: Option<usize>,
    /// Seal a batch whenever the next candidate's origin differs.
    pub same_origin: bool,
    /// Fresh seeded permutation per epoch.
    pub shuffle: bool,
    /// Base seed for the per-epoch permutations.
    pub seed: u64,
}

impl AssemblerConfig {
    fn draw_options(&self) -> DrawOptions {
        DrawOptions {
            shuffle: self.shuffle,
            same_origin: self.same_origin,
            seed: self.seed,
        }
    }
}

/// Draws structures from a [`DatasetRegistry`] and packs them greedily.
///
/// One assembler serves one epoch; construct a new one (with the next epoch
/// index) to reshuffle and start over.
pub struct BatchAssembler {
    registry: Arc<DatasetRegistry>,
    config: AssemblerConfig,
    order: Vec<usize>,
    cursor: usize,
    emitted: usize,
    /// Candidate that sealed the previous batch and opens the next one.
    pending: Option<Structure>,
}

impl BatchAssembler {
    pub fn new(
        registry: Arc<DatasetRegistry>,
        config: AssemblerConfig,
        epoch: usize,
    ) -> Result<Self, Error> {
        if config.ubound_per_batch == 0 {
            return Err(Error::InvalidBudget(config.ubound_per_batch));
        }
        let order = registry.epoch_order(epoch, &config.draw_options());
        Ok(Self {
            registry,
            config,
            order,
            cursor: 0,
            emitted: 0,
            pending: None,
        })
    }

    /// Number of batches emitted so far this epoch.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn draw(&mut self) -> Result<Option<Structure>, Error> {
        if let Some(structure) = self.pending.take() {
            return Ok(Some(structure));
        }
        let Some(&id) = self.order.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        self.registry.get(id).map(Some)
    }

    /// Assembles the next batch, or `None` at end of epoch.
    ///
    /// A candidate is added only while `running_cost + cost ≤ budget`, the
    /// item count stays below `batch_size`, and (with `same_origin`) the
    /// origin matches; otherwise the open batch is sealed and the candidate
    /// carries over. A single structure whose own cost exceeds the budget
    /// forms its own singleton batch rather than being dropped.
    pub fn next_batch(&mut self) -> Result<Option<Batch>, Error> {
        if let Some(max) = self.config.max_batches {
            if self.emitted >= max {
                return Ok(None);
            }
        }

        let mut batch = Batch::new();
        while batch.len() < self.config.batch_size {
            let Some(candidate) = self.draw()? else {
                break;
            };

            if batch.is_empty() {
                if candidate.cost() > self.config.ubound_per_batch {
                    tracing::warn!(
                        origin = candidate.origin.name(),
                        cost = candidate.cost(),
                        budget = self.config.ubound_per_batch,
                        "oversized structure emitted as singleton batch"
                    );
                    batch.push(candidate);
                    break;
                }
                batch.push(candidate);
                continue;
            }

            let same_origin_ok = !self.config.same_origin
                || batch.structures()[0].origin == candidate.origin;
            let fits = batch.total_cost() + candidate.cost() <= self.config.ubound_per_batch;
            if !same_origin_ok || !fits {
                self.pending = Some(candidate);
                break;
            }
            batch.push(candidate);
        }

        if batch.is_empty() {
            return Ok(None);
        }
        self.emitted += 1;
        Ok(Some(batch))
    }

    /// Runs the epoch dry and returns every batch. Used by dry-run tooling
    /// and tests; training consumes batches one at a time.
    pub fn collect_epoch(mut self) -> Result<Vec<Batch>, Error> {
        let mut batches = Vec::new();
        while let Some(batch) = self.next_batch()? {
            batches.push(batch);
        }
        Ok(batches)
    }
}
