/// Data layer: core types, loading, and filtering.
///
/// Architecture:
/// ```text
///  .parquet / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RecordingDataset
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ RecordingDataset│  Vec<Trace>, epoch table, coordinate index
///   └────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  (mouse, epoch) → EpochSlice row views
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;
