//! A pure Rust pipeline for geometric molecular representation pretraining:
//! budget-aware batch assembly over heterogeneous datasets, spatial neighbor
//! graph construction with radial-basis edge features, and a multi-head
//! attention encoder with energy-kernel and backmapping variants.
//!
//! # Features
//!
//! - **Dataset registry** — Named structure sources unified under one lazy
//!   index, with complexity-tier filtering and origin tagging
//! - **Budget-bounded batching** — Streaming first-fit packing under a
//!   per-batch cost ceiling, per-epoch seeded shuffles, `same_origin`
//!   batches, and singleton handling for oversized structures
//! - **Neighbor graphs** — Grid-accelerated cutoff search with a tighter
//!   hydrogen cutoff, per-atom degree caps, and deterministic edge order
//! - **Geometric encoder** — Multi-head attention message passing over the
//!   graph with radial and angular channels, selectable `ekernel`/`bm`
//!   output heads
//! - **Training control** — Warmup + plateau learning-rate schedule,
//!   gradient clipping, early stopping, top-k checkpoint retention, and a
//!   bounded prefetch worker pool
//!
//! # Quick Start
//!
//! Pack structures into budget-bounded batches and encode them:
//!
//! ```
//! use std::sync::Arc;
//! use mol_pretrain::{Atom, Element, Origin, Structure, Tier};
//! use mol_pretrain::data::{AssemblerConfig, BatchAssembler, DatasetRegistry, MemorySource};
//! use mol_pretrain::graph::{GraphBuilder, GraphConfig, RadialBasis};
//! use mol_pretrain::encoder::{EncoderConfig, GeometricEncoder, InitPolicy, ModelType};
//!
//! // A toy dataset: three water molecules.
//! let origin = Origin::new("water");
//! let water = Structure::new(
//!     vec![
//!         Atom::new(Element::O, [0.0, 0.0, 0.0]),
//!         Atom::new(Element::H, [0.96, 0.0, 0.0]),
//!         Atom::new(Element::H, [-0.24, 0.93, 0.0]),
//!     ],
//!     origin.clone(),
//!     Tier(0),
//! );
//! let source = MemorySource::new(origin, vec![water.clone(), water.clone(), water]);
//! let registry = Arc::new(
//!     DatasetRegistry::builder().dataset(Box::new(source)).build()?,
//! );
//!
//! // Budget of 8 atoms per batch: two waters fit, the third spills over.
//! let assembler = BatchAssembler::new(
//!     registry,
//!     AssemblerConfig {
//!         ubound_per_batch: 8,
//!         batch_size: 32,
//!         max_batches: None,
//!         same_origin: false,
//!         shuffle: false,
//!         seed: 0,
//!     },
//!     0,
//! )?;
//! let batches = assembler.collect_epoch()?;
//! assert_eq!(batches.len(), 2);
//! assert_eq!(batches[0].total_cost(), 6);
//!
//! // Neighbor graph + radial features + encoder forward.
//! let builder = GraphBuilder::new(GraphConfig {
//!     cutoff_lower: 0.0,
//!     cutoff_upper: 5.0,
//!     cutoff_h: 3.5,
//!     k_neighbors: 8,
//! })?;
//! let basis = RadialBasis::new(16, 0.0, 5.0)?;
//! let encoder = GeometricEncoder::new(
//!     EncoderConfig {
//!         model_type: ModelType::EKernel,
//!         hidden_dim: 32,
//!         ffn_dim: 64,
//!         rbf_dim: 16,
//!         expand_embed_dim: 16,
//!         heads: 4,
//!         layers: 2,
//!         s_eu: 1.0,
//!         s_a: 1.0,
//!         temperature: None,
//!         init: InitPolicy::Fresh,
//!     },
//!     42,
//! )?;
//!
//! let structure = &batches[0].structures()[0];
//! let graph = builder.build(structure)?;
//! let encoded = encoder.encode(structure, &graph, &basis.expand_edges(&graph))?;
//! assert_eq!(encoded.atom_states.nrows(), 3);
//! assert!(encoder.head().produces_energy_kernel());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Module Organization
//!
//! - [`data`] — Dataset registry, structure sources, batch assembly
//! - [`graph`] — Spatial grid, neighbor graph builder, radial basis
//! - [`encoder`] — Geometric attention encoder and variant heads
//! - [`train`] — Training loop, schedule, checkpoints, prefetch pool
//! - [`config`] — The TOML configuration surface (`data`/`training`/`model`)
//!
//! # Data Types
//!
//! - [`Structure`] — Atoms + positions with origin tag and complexity tier
//! - [`Atom`], [`Element`], [`Bond`] — The molecular building blocks
//! - [`data::Batch`] — Cost-bounded group of structures
//! - [`graph::NeighborGraph`] — Directed spatial adjacency of one structure
//! - [`train::TrainReport`] — Outcome of a training run

mod model;

pub mod config;
pub mod data;
pub mod encoder;
pub mod graph;
pub mod train;

pub use model::{
    Atom, Bond, Element, Origin, ParseElementError, ParseTierSelectorError, Structure, Tier,
    TierSelector,
};

pub use config::PipelineConfig;
