use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use mol_pretrain::encoder::GeometricEncoder;
use mol_pretrain::graph::{GraphBuilder, RadialBasis};
use mol_pretrain::train::Prefetcher;
use mol_pretrain::PipelineConfig;

use crate::cli::EncodeArgs;
use crate::display::Progress;
use crate::io::xyz_decoder;

pub fn run(args: EncodeArgs) -> Result<()> {
    let config = PipelineConfig::load(&args.common.config)
        .with_context(|| format!("loading {}", args.common.config.display()))?;
    let registry = Arc::new(
        config
            .build_registry(xyz_decoder())
            .context("resolving datasets")?,
    );

    let builder = GraphBuilder::new(config.graph_config())?;
    let basis = RadialBasis::new(
        config.model.rbf_dim,
        config.model.cutoff_lower,
        config.model.cutoff_upper,
    )?;
    let encoder =
        GeometricEncoder::new(config.encoder_config(), args.seed).context("building encoder")?;

    let mut prefetcher = Prefetcher::spawn(
        registry,
        config.assembler_config(),
        args.epoch,
        builder,
        basis,
        config.data.num_workers,
    )?;

    let progress = Progress::new(args.common.quiet);
    let start = Instant::now();
    let mut batches = 0usize;
    let mut structures = 0usize;
    let mut atoms = 0usize;
    let mut edges = 0usize;
    let mut norm_sum = 0.0f64;
    let mut embeddings = 0usize;

    while let Some(graph_batch) = prefetcher.next()? {
        for ((structure, graph), edge_rbf) in graph_batch
            .batch
            .structures()
            .iter()
            .zip(&graph_batch.graphs)
            .zip(&graph_batch.edge_rbf)
        {
            let encoded = encoder.encode(structure, graph, edge_rbf)?;
            if let Some(embedding) = &encoded.output.structure_embedding {
                norm_sum += embedding.dot(embedding).sqrt();
                embeddings += 1;
            }
            atoms += structure.atom_count();
            edges += graph.edge_count();
        }
        structures += graph_batch.batch.len();
        batches += 1;
        progress.update(format!("encoded {batches} batches ({structures} structures)"));

        if args.limit.is_some_and(|limit| batches >= limit) {
            prefetcher.cancel();
            break;
        }
    }
    progress.finish();
    let elapsed = start.elapsed();

    println!(
        "encoded {} batches / {} structures in {:.2}s ({} variant, {} workers)",
        batches,
        structures,
        elapsed.as_secs_f64(),
        encoder.model_type(),
        config.data.num_workers
    );
    println!(
        "  {} atoms, {} edges ({:.1} edges/atom)",
        atoms,
        edges,
        edges as f64 / atoms.max(1) as f64
    );
    if embeddings > 0 {
        println!(
            "  mean embedding norm {:.4} over {} structures",
            norm_sum / embeddings as f64,
            embeddings
        );
    }
    if encoder.head().produces_energy_kernel() {
        println!("  head produces an energy kernel (temperature-scaled)");
    }
    Ok(())
}
