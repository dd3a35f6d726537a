//! Tidy CSV export and the snapshot artifact.
//!
//! The CSV files are the single interface to the downstream statistical
//! consumer: one long-format table per (epoch, measure) combination, fixed
//! column order `Genotype,MouseID,Value`, one row per observation. The
//! snapshot is a JSON dump of the full nested mapping so a later session
//! can re-export without recomputing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::aggregate::AggregationResult;

/// One exported observation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TidyRow {
    #[serde(rename = "Genotype")]
    pub genotype: String,
    #[serde(rename = "MouseID")]
    pub mouse_id: String,
    #[serde(rename = "Value")]
    pub value: f64,
}

/// File name for one (epoch, measure) table.
pub fn table_file_name(epoch: &str, measure: &str) -> String {
    format!("epoch_{epoch}_measure_{measure}.csv")
}

/// Flatten the nested mapping into per-(epoch, measure) tidy tables.
///
/// Rows come out in deterministic (genotype, mouse) order; a row appears
/// exactly once per (genotype, mouse) pair carrying that measure.
pub fn tidy_tables(result: &AggregationResult) -> BTreeMap<(String, String), Vec<TidyRow>> {
    let mut tables: BTreeMap<(String, String), Vec<TidyRow>> = BTreeMap::new();
    for (key, bundle) in result.iter() {
        for (measure, &value) in bundle {
            tables
                .entry((key.epoch.clone(), measure.clone()))
                .or_default()
                .push(TidyRow {
                    genotype: key.condition.clone(),
                    mouse_id: key.mouse_id.clone(),
                    value,
                });
        }
    }
    tables
}

/// Write every tidy table under `out_dir` and return the written paths.
pub fn export_tidy(result: &AggregationResult, out_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let mut written = Vec::new();
    for ((epoch, measure), rows) in tidy_tables(result) {
        let path = out_dir.join(table_file_name(&epoch, &measure));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        for row in &rows {
            writer.serialize(row).context("writing tidy row")?;
        }
        writer.flush().context("flushing CSV")?;
        info!("wrote {} ({} rows)", path.display(), rows.len());
        written.push(path);
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Serialize the full nested mapping for reuse without recomputation.
pub fn save_snapshot(result: &AggregationResult, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("serializing snapshot")?;
    std::fs::write(path, json)
        .with_context(|| format!("writing snapshot {}", path.display()))?;
    info!("wrote snapshot {}", path.display());
    Ok(())
}

/// Reload a snapshot written by [`save_snapshot`]. Values round-trip
/// exactly: JSON float formatting preserves every f64 bit pattern.
pub fn load_snapshot(path: &Path) -> Result<AggregationResult> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    serde_json::from_str(&text).context("parsing snapshot")
}
