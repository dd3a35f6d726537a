use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use rusty_calcium::aggregate::{aggregate, AggregationParams};
use rusty_calcium::data::loader::load_file;
use rusty_calcium::export::{export_tidy, save_snapshot};

fn main() -> Result<()> {
    env_logger::init();

    // Path configuration only: dataset file plus an optional output
    // directory, defaulting to the current one.
    let mut args = std::env::args().skip(1);
    let dataset_path = PathBuf::from(
        args.next()
            .context("usage: rusty-calcium <dataset.{parquet,json}> [out_dir]")?,
    );
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));

    let dataset = load_file(&dataset_path)
        .with_context(|| format!("loading {}", dataset_path.display()))?;
    info!(
        "loaded {} traces, {} frames at {:.2} fps, {} mice, epochs: {:?}",
        dataset.len(),
        dataset.n_frames,
        dataset.fps,
        dataset.mouse_ids.len(),
        dataset.epochs.keys().collect::<Vec<_>>(),
    );

    let result = aggregate(&dataset, &AggregationParams::default());
    info!("aggregated {} groups", result.n_groups());

    let written = export_tidy(&result, &out_dir)?;
    save_snapshot(&result, &out_dir.join("aggregation_snapshot.json"))?;
    info!("exported {} tidy tables to {}", written.len(), out_dir.display());

    Ok(())
}
