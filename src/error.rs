use thiserror::Error;

/// The two recoverable conditions of the aggregation pipeline.
///
/// Both mean "skip this group and keep going": not every mouse was recorded
/// for every epoch (`MissingEpoch`), and sparsely populated groups carry no
/// statistical weight (`InsufficientData`). Malformed input files are not
/// represented here; they propagate as `anyhow` errors from the loader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The requested epoch has no declared time window in this recording.
    #[error("epoch '{epoch}' is not defined for this recording")]
    MissingEpoch { epoch: String },

    /// A filtered group fell below the minimum trace count.
    #[error("mouse '{mouse_id}', epoch '{epoch}': {rows} traces, need at least {min}")]
    InsufficientData {
        mouse_id: String,
        epoch: String,
        rows: usize,
        min: usize,
    },
}
