//! The configuration surface: one TOML document with `data`, `training`,
//! and `model` groups, consumed verbatim.
//!
//! Parsing and validation both happen before any epoch runs: a dataset
//! path that does not resolve, a non-positive budget or neighbor count, or
//! a dangling checkpoint reference is a configuration error here, never a
//! mid-run surprise.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::data::{AssemblerConfig, DatasetRegistry, DirectorySource, StructureDecoder};
use crate::encoder::{EncoderConfig, InitPolicy, ModelType};
use crate::graph::GraphConfig;
use crate::model::{ParseTierSelectorError, TierSelector};
use crate::train::TrainConfig;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read configuration: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no datasets configured under [data.datasets]")]
    NoDatasets,

    #[error("dataset '{name}' does not resolve to a directory: {path}")]
    UnresolvedDataset {
        /// Dataset name as configured.
        name: String,
        /// The configured path.
        path: PathBuf,
    },

    #[error("{field} must be positive")]
    NonPositive {
        /// Name of the offending key.
        field: &'static str,
    },

    #[error(transparent)]
    InvalidComplexity(#[from] ParseTierSelectorError),

    #[error("checkpoint reference '{key}' does not resolve to a file: {path}")]
    UnresolvedReference {
        /// Which key held the reference (`encoder` or `ckpt`).
        key: &'static str,
        /// The configured path.
        path: PathBuf,
    },
}

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub training: TrainingConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Dataset name → directory of structure files.
    pub datasets: BTreeMap<String, PathBuf>,
    /// Maximum total cost (atom count) per batch.
    pub ubound_per_batch: usize,
    /// Cap on batches per epoch; absent means no cap.
    #[serde(default)]
    pub max_batches: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub same_origin: bool,
    /// Complexity tier selector; `"n"` disables filtering.
    #[serde(default = "default_complexity")]
    pub complexity: String,
    #[serde(default = "default_true")]
    pub shuffle: bool,
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    pub lr: f64,
    #[serde(default = "default_warmup")]
    pub warmup: usize,
    pub max_epoch: usize,
    #[serde(default)]
    pub grad_clip: Option<f64>,
    #[serde(default = "default_patience")]
    pub patience: usize,
    /// Checkpoints to retain; negative retains all.
    #[serde(default = "default_save_topk")]
    pub save_topk: i64,
    #[serde(default = "default_true")]
    pub metric_min_better: bool,
    #[serde(default)]
    pub seed: u64,
    /// Where the checkpoint sink roots its storage.
    #[serde(default)]
    pub save_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub model_type: ModelType,
    pub hidden_dim: usize,
    pub ffn_dim: usize,
    pub rbf_dim: usize,
    /// Width the radial features are projected to; defaults to `rbf_dim`.
    #[serde(default)]
    pub expand_embed_dim: Option<usize>,
    pub heads: usize,
    pub layers: usize,
    pub cutoff_lower: f64,
    pub cutoff_upper: f64,
    #[serde(rename = "cutoff_H")]
    pub cutoff_h: f64,
    pub k_neighbors: usize,
    #[serde(default = "default_scale")]
    pub s_eu: f64,
    #[serde(default = "default_scale")]
    pub s_a: f64,
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Pretrained encoder backbone to reuse frozen (fine-tuning).
    #[serde(default)]
    pub encoder: Option<PathBuf>,
    /// Full checkpoint to warm-start from.
    #[serde(default)]
    pub ckpt: Option<PathBuf>,
}

fn default_batch_size() -> usize {
    32
}
fn default_complexity() -> String {
    "n".to_string()
}
fn default_true() -> bool {
    true
}
fn default_num_workers() -> usize {
    4
}
fn default_warmup() -> usize {
    1000
}
fn default_patience() -> usize {
    3
}
fn default_save_topk() -> i64 {
    -1
}
fn default_scale() -> f64 {
    1.0
}

impl PipelineConfig {
    /// Parses and validates a configuration document.
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.data.datasets.is_empty() {
            return Err(Error::NoDatasets);
        }
        for (name, path) in &self.data.datasets {
            if !path.is_dir() {
                return Err(Error::UnresolvedDataset {
                    name: name.clone(),
                    path: path.clone(),
                });
            }
        }
        if self.data.ubound_per_batch == 0 {
            return Err(Error::NonPositive {
                field: "ubound_per_batch",
            });
        }
        if self.data.batch_size == 0 {
            return Err(Error::NonPositive {
                field: "batch_size",
            });
        }
        if self.model.k_neighbors == 0 {
            return Err(Error::NonPositive {
                field: "k_neighbors",
            });
        }
        self.tier_selector()?;
        if let Some(path) = &self.model.encoder {
            if !path.is_file() {
                return Err(Error::UnresolvedReference {
                    key: "encoder",
                    path: path.clone(),
                });
            }
        }
        if let Some(path) = &self.model.ckpt {
            if !path.is_file() {
                return Err(Error::UnresolvedReference {
                    key: "ckpt",
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn tier_selector(&self) -> Result<TierSelector, Error> {
        Ok(self.data.complexity.parse()?)
    }

    /// Resolves the optional checkpoint references into one explicit
    /// initialization policy: a full `ckpt` warm-starts everything and wins
    /// over `encoder`, which reuses a frozen pretrained backbone.
    pub fn init_policy(&self) -> InitPolicy {
        if let Some(path) = &self.model.ckpt {
            return InitPolicy::WarmStart(path.clone());
        }
        if let Some(path) = &self.model.encoder {
            return InitPolicy::FrozenBackbone(path.clone());
        }
        InitPolicy::Fresh
    }

    pub fn assembler_config(&self) -> AssemblerConfig {
        AssemblerConfig {
            ubound_per_batch: self.data.ubound_per_batch,
            batch_size: self.data.batch_size,
            max_batches: self.data.max_batches,
            same_origin: self.data.same_origin,
            shuffle: self.data.shuffle,
            seed: self.training.seed,
        }
    }

    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            cutoff_lower: self.model.cutoff_lower,
            cutoff_upper: self.model.cutoff_upper,
            cutoff_h: self.model.cutoff_h,
            k_neighbors: self.model.k_neighbors,
        }
    }

    pub fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig {
            model_type: self.model.model_type,
            hidden_dim: self.model.hidden_dim,
            ffn_dim: self.model.ffn_dim,
            rbf_dim: self.model.rbf_dim,
            expand_embed_dim: self.model.expand_embed_dim.unwrap_or(self.model.rbf_dim),
            heads: self.model.heads,
            layers: self.model.layers,
            s_eu: self.model.s_eu,
            s_a: self.model.s_a,
            temperature: self.model.temperature,
            init: self.init_policy(),
        }
    }

    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            lr: self.training.lr,
            warmup: self.training.warmup,
            max_epoch: self.training.max_epoch,
            grad_clip: self.training.grad_clip,
            patience: self.training.patience,
            save_topk: self.training.save_topk,
            metric_min_better: self.training.metric_min_better,
            num_workers: self.data.num_workers,
        }
    }

    /// Builds the dataset registry: one directory source per configured
    /// dataset (in name order), filtered by the complexity selector.
    pub fn build_registry(
        &self,
        decoder: StructureDecoder,
    ) -> Result<DatasetRegistry, crate::data::Error> {
        let selector = self
            .tier_selector()
            .expect("selector validated at load time");
        let mut builder = DatasetRegistry::builder().selector(selector);
        for (name, path) in &self.data.datasets {
            let source = DirectorySource::open(name.clone(), path, decoder.clone())?;
            builder = builder.dataset(Box::new(source));
        }
        builder.build()
    }
}
