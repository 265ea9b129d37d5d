//! Bounded prefetch pool: batches are assembled and graph-built ahead of
//! the training step.
//!
//! A producer thread drives the batch assembler in the deterministic epoch
//! order and hands batches to `num_workers` graph-building workers over a
//! bounded channel; finished [`GraphBatch`]es come back over a second
//! bounded channel (capacity ≈ 2× workers) that applies backpressure when
//! the consumer falls behind. Workers never touch shared mutable state —
//! each owns clones of the builder and basis, and every batch is handed off
//! whole.
//!
//! Delivery order is deterministic even though completion timing is not:
//! results carry the producer's sequence number and the consumer reorders
//! them. Cancellation takes effect between batches; in-flight work is
//! discarded, not awaited.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver};
use ndarray::Array2;

use super::error::Error;
use crate::data::{AssemblerConfig, Batch, BatchAssembler, DatasetRegistry};
use crate::graph::{GraphBuilder, NeighborGraph, RadialBasis};

/// A batch with its neighbor graphs and radial edge features, ready for
/// the encoder. Immutable once built; owned by one training step.
#[derive(Debug, Clone)]
pub struct GraphBatch {
    pub batch: Batch,
    /// One graph per structure, in batch order.
    pub graphs: Vec<NeighborGraph>,
    /// Radial expansion of each graph's edges, in batch order.
    pub edge_rbf: Vec<Array2<f64>>,
}

impl GraphBatch {
    pub fn edge_count(&self) -> usize {
        self.graphs.iter().map(NeighborGraph::edge_count).sum()
    }
}

fn build_graph_batch(
    batch: Batch,
    builder: &GraphBuilder,
    basis: &RadialBasis,
) -> Result<GraphBatch, Error> {
    let graphs = batch
        .structures()
        .iter()
        .map(|structure| builder.build(structure))
        .collect::<Result<Vec<_>, _>>()?;
    let edge_rbf = graphs.iter().map(|graph| basis.expand_edges(graph)).collect();
    Ok(GraphBatch {
        batch,
        graphs,
        edge_rbf,
    })
}

type SeqResult = (usize, Result<GraphBatch, Error>);

/// Streams one epoch's [`GraphBatch`]es, prefetched by a worker pool.
///
/// With `num_workers == 0` everything runs inline on the caller's thread;
/// the delivered sequence is identical either way.
pub enum Prefetcher {
    Inline {
        assembler: BatchAssembler,
        builder: GraphBuilder,
        basis: RadialBasis,
    },
    Pool(PoolPrefetcher),
}

impl Prefetcher {
    pub fn spawn(
        registry: Arc<DatasetRegistry>,
        assembler_config: AssemblerConfig,
        epoch: usize,
        builder: GraphBuilder,
        basis: RadialBasis,
        num_workers: usize,
    ) -> Result<Self, Error> {
        let assembler = BatchAssembler::new(registry, assembler_config, epoch)?;
        if num_workers == 0 {
            return Ok(Prefetcher::Inline {
                assembler,
                builder,
                basis,
            });
        }
        Ok(Prefetcher::Pool(PoolPrefetcher::spawn(
            assembler,
            builder,
            basis,
            num_workers,
        )))
    }

    /// Next batch in the epoch's deterministic order, or `None` at the end.
    pub fn next(&mut self) -> Result<Option<GraphBatch>, Error> {
        match self {
            Prefetcher::Inline {
                assembler,
                builder,
                basis,
            } => match assembler.next_batch()? {
                Some(batch) => build_graph_batch(batch, builder, basis).map(Some),
                None => Ok(None),
            },
            Prefetcher::Pool(pool) => pool.next(),
        }
    }

    /// Requests cancellation; takes effect between batches, and in-flight
    /// prefetch work is discarded.
    pub fn cancel(&self) {
        if let Prefetcher::Pool(pool) = self {
            pool.cancel.store(true, Ordering::Relaxed);
        }
    }
}

pub struct PoolPrefetcher {
    result_rx: Option<Receiver<SeqResult>>,
    reordered: HashMap<usize, Result<GraphBatch, Error>>,
    next_seq: usize,
    cancel: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl PoolPrefetcher {
    fn spawn(
        mut assembler: BatchAssembler,
        builder: GraphBuilder,
        basis: RadialBasis,
        num_workers: usize,
    ) -> Self {
        let (job_tx, job_rx) = bounded::<(usize, Batch)>(num_workers);
        let (result_tx, result_rx) = bounded::<SeqResult>(2 * num_workers);
        let cancel = Arc::new(AtomicBool::new(false));

        let workers = (0..num_workers)
            .map(|worker_idx| {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let cancel = cancel.clone();
                let builder = builder.clone();
                let basis = basis.clone();
                std::thread::Builder::new()
                    .name(format!("prefetch-{worker_idx}"))
                    .spawn(move || {
                        while let Ok((seq, batch)) = job_rx.recv() {
                            if cancel.load(Ordering::Relaxed) {
                                break;
                            }
                            let result = build_graph_batch(batch, &builder, &basis);
                            if result_tx.send((seq, result)).is_err() {
                                break;
                            }
                        }
                    })
                    .expect("spawn prefetch worker")
            })
            .collect();

        let producer = {
            let cancel = cancel.clone();
            std::thread::Builder::new()
                .name("prefetch-producer".to_string())
                .spawn(move || {
                    let mut seq = 0usize;
                    loop {
                        if cancel.load(Ordering::Relaxed) {
                            break;
                        }
                        match assembler.next_batch() {
                            Ok(Some(batch)) => {
                                if job_tx.send((seq, batch)).is_err() {
                                    break;
                                }
                                seq += 1;
                            }
                            Ok(None) => break,
                            Err(err) => {
                                let _ = result_tx.send((seq, Err(err.into())));
                                break;
                            }
                        }
                    }
                })
                .expect("spawn prefetch producer")
        };

        Self {
            result_rx: Some(result_rx),
            reordered: HashMap::new(),
            next_seq: 0,
            cancel,
            producer: Some(producer),
            workers,
        }
    }

    fn next(&mut self) -> Result<Option<GraphBatch>, Error> {
        loop {
            if let Some(result) = self.reordered.remove(&self.next_seq) {
                self.next_seq += 1;
                return result.map(Some);
            }
            let Some(result_rx) = &self.result_rx else {
                return Ok(None);
            };
            match result_rx.recv() {
                Ok((seq, result)) => {
                    self.reordered.insert(seq, result);
                }
                Err(_) => {
                    // Every sender is gone: the epoch either completed or a
                    // worker died before delivering the next batch.
                    if self.reordered.is_empty() {
                        return Ok(None);
                    }
                    return Err(Error::PrefetchWorkerLost);
                }
            }
        }
    }
}

impl Drop for PoolPrefetcher {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        // Unblock workers stuck on a full result channel before joining.
        self.result_rx = None;
        if let Some(producer) = self.producer.take() {
            let _ = producer.join();
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DatasetRegistry, MemorySource};
    use crate::graph::GraphConfig;
    use crate::model::{Atom, Element, Origin, Structure, Tier};

    fn make_registry(sizes: &[usize]) -> Arc<DatasetRegistry> {
        let origin = Origin::new("pool");
        let structures = sizes
            .iter()
            .map(|&n| {
                let atoms = (0..n)
                    .map(|i| Atom::new(Element::C, [i as f64 * 1.2, 0.0, 0.0]))
                    .collect();
                Structure::new(atoms, origin.clone(), Tier::from_atom_count(n))
            })
            .collect();
        Arc::new(
            DatasetRegistry::builder()
                .dataset(Box::new(MemorySource::new(origin, structures)))
                .build()
                .unwrap(),
        )
    }

    fn make_builder() -> GraphBuilder {
        GraphBuilder::new(GraphConfig {
            cutoff_lower: 0.0,
            cutoff_upper: 5.0,
            cutoff_h: 3.5,
            k_neighbors: 4,
        })
        .unwrap()
    }

    fn assembler_config() -> AssemblerConfig {
        AssemblerConfig {
            ubound_per_batch: 10,
            batch_size: 64,
            max_batches: None,
            same_origin: false,
            shuffle: true,
            seed: 21,
        }
    }

    fn drain(mut prefetcher: Prefetcher) -> Vec<GraphBatch> {
        let mut batches = Vec::new();
        while let Some(batch) = prefetcher.next().unwrap() {
            batches.push(batch);
        }
        batches
    }

    #[test]
    fn pool_delivery_matches_inline_order() {
        let registry = make_registry(&[3, 5, 2, 7, 4, 1, 6, 2]);
        let builder = make_builder();
        let basis = RadialBasis::new(8, 0.0, 5.0).unwrap();

        let inline = drain(
            Prefetcher::spawn(
                registry.clone(),
                assembler_config(),
                0,
                builder.clone(),
                basis.clone(),
                0,
            )
            .unwrap(),
        );
        let pooled = drain(
            Prefetcher::spawn(registry, assembler_config(), 0, builder, basis, 3).unwrap(),
        );

        assert_eq!(inline.len(), pooled.len());
        for (a, b) in inline.iter().zip(&pooled) {
            assert_eq!(a.batch.total_cost(), b.batch.total_cost());
            assert_eq!(a.edge_count(), b.edge_count());
        }
    }

    #[test]
    fn graphs_align_with_batch_structures() {
        let registry = make_registry(&[4, 4, 4]);
        let builder = make_builder();
        let basis = RadialBasis::new(6, 0.0, 5.0).unwrap();

        let batches = drain(
            Prefetcher::spawn(registry, assembler_config(), 0, builder, basis, 2).unwrap(),
        );
        for gb in &batches {
            assert_eq!(gb.graphs.len(), gb.batch.len());
            for (structure, graph) in gb.batch.structures().iter().zip(&gb.graphs) {
                assert_eq!(structure.atom_count(), graph.n_atoms());
            }
            for (graph, rbf) in gb.graphs.iter().zip(&gb.edge_rbf) {
                assert_eq!(graph.edge_count(), rbf.nrows());
            }
        }
    }

    #[test]
    fn data_errors_surface_through_the_pool() {
        let origin = Origin::new("bad");
        let good = Structure::new(
            vec![Atom::new(Element::C, [0.0, 0.0, 0.0])],
            origin.clone(),
            Tier(0),
        );
        let bad = Structure::new(
            vec![Atom::new(Element::C, [f64::INFINITY, 0.0, 0.0])],
            origin.clone(),
            Tier(0),
        );
        let registry = Arc::new(
            DatasetRegistry::builder()
                .dataset(Box::new(MemorySource::new(origin, vec![good, bad])))
                .build()
                .unwrap(),
        );
        let mut config = assembler_config();
        config.shuffle = false;
        // One structure per batch so the good batch seals before the bad
        // entry is drawn.
        config.batch_size = 1;

        let mut prefetcher = Prefetcher::spawn(
            registry,
            config,
            0,
            make_builder(),
            RadialBasis::new(4, 0.0, 5.0).unwrap(),
            2,
        )
        .unwrap();

        assert!(prefetcher.next().unwrap().is_some());
        assert!(matches!(prefetcher.next(), Err(Error::Data(_))));
    }

    #[test]
    fn dropping_a_live_pool_does_not_hang() {
        let registry = make_registry(&[2; 64]);
        let mut config = assembler_config();
        config.ubound_per_batch = 2;

        let mut prefetcher = Prefetcher::spawn(
            registry,
            config,
            0,
            make_builder(),
            RadialBasis::new(4, 0.0, 5.0).unwrap(),
            2,
        )
        .unwrap();

        assert!(prefetcher.next().unwrap().is_some());
        prefetcher.cancel();
        drop(prefetcher);
    }
}
