//! The training loop controller.
//!
//! Drives epochs over the batch assembler, feeds the external engine,
//! applies warmup + plateau learning-rate scheduling and gradient
//! clipping, validates after every epoch, retains the top-k checkpoints,
//! and stops early after `patience` consecutive non-improving epochs.
//! Early stop is a normal termination; dataset and divergence failures
//! abort the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::checkpoint::{CheckpointSink, RetainedCheckpoint, TopkCheckpoints};
use super::engine::Engine;
use super::error::Error;
use super::prefetch::Prefetcher;
use super::schedule::LrSchedule;
use crate::data::{AssemblerConfig, DatasetRegistry};
use crate::graph::{GraphBuilder, RadialBasis};

/// Optimization and control hyperparameters.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Peak learning rate reached at the end of warmup.
    pub lr: f64,
    /// Linear warmup length in steps.
    pub warmup: usize,
    pub max_epoch: usize,
    /// Global gradient norm ceiling; `None` disables clipping.
    pub grad_clip: Option<f64>,
    /// Consecutive non-improving epochs tolerated before early stop.
    pub patience: usize,
    /// Checkpoint retention count; negative retains all.
    pub save_topk: i64,
    /// Whether a smaller validation metric is better.
    pub metric_min_better: bool,
    /// Prefetch worker count; 0 builds graphs inline.
    pub num_workers: usize,
}

/// Mutable run state, owned by the trainer and nothing else.
#[derive(Debug, Clone)]
pub struct TrainingState {
    pub epoch: usize,
    pub global_step: usize,
    pub best_metric: Option<f64>,
    pub patience_left: usize,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    CompletedAllEpochs,
    /// `patience` consecutive non-improving epochs — a normal termination.
    EarlyStopped,
    Cancelled,
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct TrainReport {
    pub epochs_run: usize,
    pub best_metric: Option<f64>,
    pub stop: StopReason,
    /// Retained checkpoints, best first.
    pub checkpoints: Vec<RetainedCheckpoint>,
}

pub struct Trainer<E: Engine, S: CheckpointSink> {
    config: TrainConfig,
    assembler: AssemblerConfig,
    train_data: Arc<DatasetRegistry>,
    valid_data: Arc<DatasetRegistry>,
    builder: GraphBuilder,
    basis: RadialBasis,
    engine: E,
    sink: S,
    schedule: LrSchedule,
    checkpoints: TopkCheckpoints,
    state: TrainingState,
    cancel: Arc<AtomicBool>,
}

impl<E: Engine, S: CheckpointSink> Trainer<E, S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: TrainConfig,
        assembler: AssemblerConfig,
        train_data: Arc<DatasetRegistry>,
        valid_data: Arc<DatasetRegistry>,
        builder: GraphBuilder,
        basis: RadialBasis,
        engine: E,
        sink: S,
    ) -> Self {
        let schedule = LrSchedule::new(config.lr, config.warmup);
        let checkpoints = TopkCheckpoints::new(config.save_topk, config.metric_min_better);
        let state = TrainingState {
            epoch: 0,
            global_step: 0,
            best_metric: None,
            patience_left: config.patience,
        };
        Self {
            config,
            assembler,
            train_data,
            valid_data,
            builder,
            basis,
            engine,
            sink,
            schedule,
            checkpoints,
            state,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for cancelling the run between batches.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn improved(&self, metric: f64) -> bool {
        match self.state.best_metric {
            None => true,
            Some(best) => {
                if self.config.metric_min_better {
                    metric < best
                } else {
                    metric > best
                }
            }
        }
    }

    /// Runs until `max_epoch`, early stop, or cancellation.
    pub fn run(mut self) -> Result<TrainReport, Error> {
        let mut epochs_run = 0usize;
        let mut stop = StopReason::CompletedAllEpochs;

        for epoch in 0..self.config.max_epoch {
            self.state.epoch = epoch;
            if self.cancelled() {
                stop = StopReason::Cancelled;
                break;
            }

            let completed = self.train_epoch(epoch)?;
            if !completed {
                stop = StopReason::Cancelled;
                break;
            }

            let metric = self.validate_epoch(epoch)?;
            let improved = self.improved(metric);
            tracing::info!(
                epoch,
                metric,
                improved,
                step = self.state.global_step,
                "epoch finished"
            );

            if improved {
                self.state.best_metric = Some(metric);
                self.state.patience_left = self.config.patience;
                let snapshot = self.engine.snapshot();
                let id = self
                    .sink
                    .save(epoch, metric, &snapshot)
                    .map_err(Error::Checkpoint)?;
                self.checkpoints.admit(epoch, metric, id, &mut self.sink)?;
            } else {
                self.state.patience_left = self.state.patience_left.saturating_sub(1);
            }
            self.schedule.observe_validation(improved);
            epochs_run += 1;

            if !improved && self.state.patience_left == 0 {
                tracing::info!(epoch, "early stop: patience exhausted");
                stop = StopReason::EarlyStopped;
                break;
            }
        }

        Ok(TrainReport {
            epochs_run,
            best_metric: self.state.best_metric,
            stop,
            checkpoints: self.checkpoints.entries().to_vec(),
        })
    }

    /// One pass over the training data; `Ok(false)` means cancelled.
    fn train_epoch(&mut self, epoch: usize) -> Result<bool, Error> {
        let mut prefetcher = Prefetcher::spawn(
            self.train_data.clone(),
            self.assembler.clone(),
            epoch,
            self.builder.clone(),
            self.basis.clone(),
            self.config.num_workers,
        )?;

        while let Some(graph_batch) = prefetcher.next()? {
            if self.cancelled() {
                prefetcher.cancel();
                return Ok(false);
            }

            let loss = self
                .engine
                .forward_backward(&graph_batch)
                .map_err(Error::Engine)?;
            if !loss.is_finite() {
                return Err(Error::NonFiniteLoss {
                    epoch,
                    step: self.state.global_step,
                });
            }

            if let Some(clip) = self.config.grad_clip {
                let norm = self.engine.gradient_norm();
                if norm.is_finite() && norm > clip && norm > 0.0 {
                    self.engine.scale_gradients(clip / norm);
                }
            }

            let lr = self.schedule.rate_at(self.state.global_step);
            self.engine.apply_update(lr).map_err(Error::Engine)?;
            self.state.global_step += 1;
        }
        Ok(true)
    }

    /// Mean validation metric over the validation data, in a fixed order.
    fn validate_epoch(&mut self, epoch: usize) -> Result<f64, Error> {
        let mut config = self.assembler.clone();
        config.shuffle = false;
        config.max_batches = None;

        let mut prefetcher = Prefetcher::spawn(
            self.valid_data.clone(),
            config,
            0,
            self.builder.clone(),
            self.basis.clone(),
            self.config.num_workers,
        )?;

        let mut sum = 0.0;
        let mut count = 0usize;
        while let Some(graph_batch) = prefetcher.next()? {
            let metric = self
                .engine
                .validate(&graph_batch)
                .map_err(Error::Engine)?;
            if !metric.is_finite() {
                return Err(Error::NonFiniteMetric { epoch });
            }
            sum += metric;
            count += 1;
        }
        Ok(sum / count.max(1) as f64)
    }
}
