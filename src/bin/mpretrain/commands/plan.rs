use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use mol_pretrain::data::BatchAssembler;
use mol_pretrain::PipelineConfig;

use crate::cli::PlanArgs;
use crate::io::xyz_decoder;

pub fn run(args: PlanArgs) -> Result<()> {
    let config = PipelineConfig::load(&args.common.config)
        .with_context(|| format!("loading {}", args.common.config.display()))?;
    let registry = Arc::new(
        config
            .build_registry(xyz_decoder())
            .context("resolving datasets")?,
    );

    let budget = config.data.ubound_per_batch;
    let assembler = BatchAssembler::new(registry, config.assembler_config(), args.epoch)?;
    let batches = assembler.collect_epoch().context("packing epoch")?;

    let structures: usize = batches.iter().map(|b| b.len()).sum();
    let total_cost: usize = batches.iter().map(|b| b.total_cost()).sum();
    let oversized = batches
        .iter()
        .filter(|b| b.total_cost() > budget)
        .count();
    let mut per_origin: BTreeMap<String, usize> = BTreeMap::new();
    for batch in &batches {
        let key = match batch.uniform_origin() {
            Some(origin) => origin.name().to_string(),
            None => "(mixed)".to_string(),
        };
        *per_origin.entry(key).or_default() += 1;
    }

    println!("epoch {} packing plan:", args.epoch);
    println!(
        "  {} batches, {} structures, {} atoms total",
        batches.len(),
        structures,
        total_cost
    );
    if let Some(max) = batches.iter().map(|b| b.total_cost()).max() {
        let min = batches.iter().map(|b| b.total_cost()).min().unwrap_or(0);
        println!(
            "  batch cost: min {} / mean {:.1} / max {} (budget {})",
            min,
            total_cost as f64 / batches.len() as f64,
            max,
            budget
        );
    }
    if oversized > 0 {
        println!("  {oversized} oversized singleton batch(es) exceed the budget");
    }
    println!("  batches by origin:");
    for (origin, count) in per_origin {
        println!("    {origin:<20} {count:>6}");
    }
    Ok(())
}
