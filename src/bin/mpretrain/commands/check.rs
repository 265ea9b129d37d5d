use anyhow::{Context, Result};
use mol_pretrain::PipelineConfig;

use crate::cli::CheckArgs;
use crate::io::xyz_decoder;

pub fn run(args: CheckArgs) -> Result<()> {
    let config = PipelineConfig::load(&args.common.config)
        .with_context(|| format!("loading {}", args.common.config.display()))?;

    let registry = config
        .build_registry(xyz_decoder())
        .context("resolving datasets")?;

    println!("configuration OK: {}", args.common.config.display());
    println!(
        "  model: {} ({} layers x {} heads, hidden {})",
        config.model.model_type, config.model.layers, config.model.heads, config.model.hidden_dim
    );
    println!(
        "  batching: budget {} atoms, batch_size {}, shuffle {}, same_origin {}",
        config.data.ubound_per_batch,
        config.data.batch_size,
        config.data.shuffle,
        config.data.same_origin
    );
    println!("  complexity selector: {}", config.data.complexity);
    println!("  datasets ({} structures admitted):", registry.len());
    for (origin, admitted) in registry.dataset_sizes() {
        println!("    {:<20} {:>8} structures", origin.name(), admitted);
    }
    Ok(())
}
