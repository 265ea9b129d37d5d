mod checkpoint;
mod engine;
mod error;
mod prefetch;
mod schedule;
mod trainer;

pub use checkpoint::{
    CheckpointId, CheckpointSink, ModelSnapshot, RetainedCheckpoint, TopkCheckpoints,
};
pub use engine::Engine;
pub use error::Error;
pub use prefetch::{GraphBatch, Prefetcher};
pub use schedule::LrSchedule;
pub use trainer::{StopReason, TrainConfig, TrainReport, Trainer, TrainingState};
