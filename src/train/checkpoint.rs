//! Top-k checkpoint retention.
//!
//! The trainer emits `(epoch, metric, snapshot)` tuples to an external
//! [`CheckpointSink`]; this module only dictates how many are retained and
//! how they are ranked. Retention is a bounded best-k cache: insertion
//! keeps the list sorted best-first (ties broken in favor of the earlier
//! epoch), and anything pushed past the capacity is evicted through the
//! sink's `remove`.

use super::error::Error;

/// Opaque serialized model state produced by the engine.
#[derive(Debug, Clone)]
pub struct ModelSnapshot(pub Vec<u8>);

/// Identifier the sink assigns to a stored checkpoint.
pub type CheckpointId = String;

/// External persistence collaborator. File layout is its business; the
/// trainer only calls `save` and `remove`.
pub trait CheckpointSink {
    fn save(
        &mut self,
        epoch: usize,
        metric: f64,
        snapshot: &ModelSnapshot,
    ) -> Result<CheckpointId, String>;

    fn remove(&mut self, id: &CheckpointId) -> Result<(), String>;
}

/// One retained checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RetainedCheckpoint {
    pub epoch: usize,
    pub metric: f64,
    pub id: CheckpointId,
}

/// Bounded best-k cache over saved checkpoints.
#[derive(Debug)]
pub struct TopkCheckpoints {
    /// `None` retains everything (configured `save_topk <= 0`).
    capacity: Option<usize>,
    metric_min_better: bool,
    /// Sorted best-first.
    entries: Vec<RetainedCheckpoint>,
}

impl TopkCheckpoints {
    /// A non-positive `save_topk` retains every checkpoint; otherwise at
    /// most `save_topk` entries survive.
    pub fn new(save_topk: i64, metric_min_better: bool) -> Self {
        Self {
            capacity: (save_topk > 0).then_some(save_topk as usize),
            metric_min_better,
            entries: Vec::new(),
        }
    }

    fn better(&self, a: f64, b: f64) -> bool {
        if self.metric_min_better {
            a < b
        } else {
            a > b
        }
    }

    /// Records a saved checkpoint and evicts past-capacity entries.
    ///
    /// Equal metrics rank behind existing entries, so among ties the
    /// earliest epoch survives eviction.
    pub fn admit(
        &mut self,
        epoch: usize,
        metric: f64,
        id: CheckpointId,
        sink: &mut dyn CheckpointSink,
    ) -> Result<(), Error> {
        let position = self
            .entries
            .iter()
            .position(|entry| self.better(metric, entry.metric))
            .unwrap_or(self.entries.len());
        self.entries.insert(
            position,
            RetainedCheckpoint { epoch, metric, id },
        );

        if let Some(capacity) = self.capacity {
            while self.entries.len() > capacity {
                let evicted = self.entries.pop().expect("non-empty past capacity");
                tracing::debug!(
                    epoch = evicted.epoch,
                    metric = evicted.metric,
                    "evicting checkpoint beyond top-k"
                );
                sink.remove(&evicted.id).map_err(Error::Checkpoint)?;
            }
        }
        Ok(())
    }

    /// Retained checkpoints, best first.
    pub fn entries(&self) -> &[RetainedCheckpoint] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that remembers what it stored and what was removed.
    #[derive(Default)]
    struct RecordingSink {
        saved: Vec<CheckpointId>,
        removed: Vec<CheckpointId>,
    }

    impl CheckpointSink for RecordingSink {
        fn save(
            &mut self,
            epoch: usize,
            _metric: f64,
            _snapshot: &ModelSnapshot,
        ) -> Result<CheckpointId, String> {
            let id = format!("ckpt-{epoch}");
            self.saved.push(id.clone());
            Ok(id)
        }

        fn remove(&mut self, id: &CheckpointId) -> Result<(), String> {
            self.removed.push(id.clone());
            Ok(())
        }
    }

    fn admit(
        topk: &mut TopkCheckpoints,
        sink: &mut RecordingSink,
        epoch: usize,
        metric: f64,
    ) {
        let id = sink
            .save(epoch, metric, &ModelSnapshot(Vec::new()))
            .unwrap();
        topk.admit(epoch, metric, id, sink).unwrap();
    }

    #[test]
    fn retains_the_k_best_min_metric() {
        let mut topk = TopkCheckpoints::new(2, true);
        let mut sink = RecordingSink::default();

        admit(&mut topk, &mut sink, 0, 0.9);
        admit(&mut topk, &mut sink, 1, 0.5);
        admit(&mut topk, &mut sink, 2, 0.7);

        assert_eq!(topk.len(), 2);
        let metrics: Vec<f64> = topk.entries().iter().map(|e| e.metric).collect();
        assert_eq!(metrics, vec![0.5, 0.7]);
        assert_eq!(sink.removed, vec!["ckpt-0"]);
    }

    #[test]
    fn max_metric_direction_flips_ranking() {
        let mut topk = TopkCheckpoints::new(2, false);
        let mut sink = RecordingSink::default();

        admit(&mut topk, &mut sink, 0, 0.1);
        admit(&mut topk, &mut sink, 1, 0.8);
        admit(&mut topk, &mut sink, 2, 0.4);

        let metrics: Vec<f64> = topk.entries().iter().map(|e| e.metric).collect();
        assert_eq!(metrics, vec![0.8, 0.4]);
    }

    #[test]
    fn ties_keep_the_earlier_epoch() {
        let mut topk = TopkCheckpoints::new(1, true);
        let mut sink = RecordingSink::default();

        admit(&mut topk, &mut sink, 3, 0.5);
        admit(&mut topk, &mut sink, 4, 0.5);

        assert_eq!(topk.entries()[0].epoch, 3);
        assert_eq!(sink.removed, vec!["ckpt-4"]);
    }

    #[test]
    fn negative_topk_retains_everything() {
        let mut topk = TopkCheckpoints::new(-1, true);
        let mut sink = RecordingSink::default();

        for epoch in 0..10 {
            admit(&mut topk, &mut sink, epoch, epoch as f64);
        }
        assert_eq!(topk.len(), 10);
        assert!(sink.removed.is_empty());
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut topk = TopkCheckpoints::new(3, true);
        let mut sink = RecordingSink::default();

        for epoch in 0..20 {
            admit(&mut topk, &mut sink, epoch, (epoch % 7) as f64);
            assert!(topk.len() <= 3);
        }
    }
}
