//! Batch aggregation and tidy export for calcium-imaging recordings.
//!
//! Pipeline: load a labeled per-neuron dF/F dataset, slice it by
//! experimental epoch, compute activity statistics per (genotype, epoch,
//! mouse) group, and export long-format CSV tables for downstream
//! statistical testing.

pub mod aggregate;
pub mod data;
pub mod error;
pub mod export;
pub mod stats;

pub use aggregate::{aggregate, AggregationParams, AggregationResult, GroupKey, Measure};
pub use data::loader::load_file;
pub use data::model::{RecordingDataset, TimeWindow, Trace};
pub use error::AnalysisError;
pub use export::{export_tidy, load_snapshot, save_snapshot};
