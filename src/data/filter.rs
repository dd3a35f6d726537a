use crate::error::AnalysisError;

use super::model::{RecordingDataset, TimeWindow};

/// The full-recording epoch, always available.
pub const EPOCH_ALL: &str = "all";

// ---------------------------------------------------------------------------
// Epoch resolution
// ---------------------------------------------------------------------------

/// Resolve an epoch name to its time window.
///
/// `"all"` always resolves to the whole recording. Any other name must be
/// declared in the dataset's epoch table; undeclared names fail with
/// [`AnalysisError::MissingEpoch`], e.g. when a mouse was recorded without
/// a stimulus period. A declared window that does not overlap the recording
/// at all (the recording stopped before the epoch began) is equally
/// missing: resolution never yields an empty window.
pub fn epoch_window(
    dataset: &RecordingDataset,
    epoch: &str,
) -> Result<TimeWindow, AnalysisError> {
    if epoch == EPOCH_ALL {
        return Ok(TimeWindow {
            start: 0,
            end: dataset.n_frames,
        });
    }
    let window = dataset
        .epochs
        .get(epoch)
        .ok_or_else(|| AnalysisError::MissingEpoch {
            epoch: epoch.to_string(),
        })?
        .clamp_to(dataset.n_frames);
    if window.is_empty() {
        return Err(AnalysisError::MissingEpoch {
            epoch: epoch.to_string(),
        });
    }
    Ok(window)
}

/// Return indices of traces recorded from the given mouse.
pub fn mouse_indices(dataset: &RecordingDataset, mouse_id: &str) -> Vec<usize> {
    dataset
        .traces
        .iter()
        .enumerate()
        .filter(|(_, tr)| tr.mouse_id == mouse_id)
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// EpochSlice – one group's view of the dataset
// ---------------------------------------------------------------------------

/// A filtered, row-reduced view of the dataset: the traces of one mouse,
/// restricted to one epoch's time window. Borrows the dataset; nothing is
/// copied until a calculator asks for the rows.
#[derive(Debug, Clone)]
pub struct EpochSlice<'a> {
    dataset: &'a RecordingDataset,
    window: TimeWindow,
    trace_indices: Vec<usize>,
}

impl<'a> EpochSlice<'a> {
    /// Build the slice for one (mouse, epoch) pair.
    pub fn new(
        dataset: &'a RecordingDataset,
        mouse_id: &str,
        epoch: &str,
    ) -> Result<Self, AnalysisError> {
        let window = epoch_window(dataset, epoch)?;
        Ok(EpochSlice {
            dataset,
            window,
            trace_indices: mouse_indices(dataset, mouse_id),
        })
    }

    /// Number of trace rows in the slice.
    pub fn n_rows(&self) -> usize {
        self.trace_indices.len()
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// The windowed dF/F rows, one slice per trace.
    pub fn rows(&self) -> Vec<&'a [f64]> {
        self.trace_indices
            .iter()
            .map(|&i| &self.dataset.traces[i].dff[self.window.start..self.window.end])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::model::Trace;

    fn dataset() -> RecordingDataset {
        let mut epochs = BTreeMap::new();
        epochs.insert("spont".to_string(), TimeWindow { start: 0, end: 3 });
        epochs.insert("stim".to_string(), TimeWindow { start: 3, end: 6 });
        let traces = vec![
            Trace {
                dff: vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
                mouse_id: "m1".to_string(),
                condition: "wt".to_string(),
                fov: 1,
                day: 0,
            },
            Trace {
                dff: vec![1.0, 1.1, 1.2, 1.3, 1.4, 1.5],
                mouse_id: "m2".to_string(),
                condition: "mut".to_string(),
                fov: 2,
                day: 0,
            },
        ];
        RecordingDataset::from_traces(traces, 30.0, epochs)
    }

    #[test]
    fn all_epoch_spans_the_whole_recording() {
        let ds = dataset();
        let w = epoch_window(&ds, EPOCH_ALL).unwrap();
        assert_eq!(w, TimeWindow { start: 0, end: 6 });
    }

    #[test]
    fn all_epoch_resolves_without_a_declared_table() {
        let ds = RecordingDataset::from_traces(Vec::new(), 30.0, BTreeMap::new());
        assert!(epoch_window(&ds, EPOCH_ALL).is_ok());
    }

    #[test]
    fn window_past_the_recording_end_is_a_missing_epoch_error() {
        let mut epochs = BTreeMap::new();
        epochs.insert(
            "stim".to_string(),
            TimeWindow {
                start: 5000,
                end: 9000,
            },
        );
        let ds = RecordingDataset::from_traces(
            vec![Trace {
                dff: vec![0.0; 100],
                mouse_id: "m1".to_string(),
                condition: "wt".to_string(),
                fov: 1,
                day: 0,
            }],
            30.0,
            epochs,
        );
        let err = epoch_window(&ds, "stim").unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MissingEpoch {
                epoch: "stim".to_string()
            }
        );
    }

    #[test]
    fn undeclared_epoch_is_a_missing_epoch_error() {
        let ds = dataset();
        let err = epoch_window(&ds, "run_juxta").unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MissingEpoch {
                epoch: "run_juxta".to_string()
            }
        );
    }

    #[test]
    fn slice_restricts_rows_and_time() {
        let ds = dataset();
        let slice = EpochSlice::new(&ds, "m1", "stim").unwrap();
        assert_eq!(slice.n_rows(), 1);
        assert_eq!(slice.rows(), vec![&[0.4, 0.5, 0.6][..]]);
    }

    #[test]
    fn unknown_mouse_yields_an_empty_slice() {
        let ds = dataset();
        let slice = EpochSlice::new(&ds, "m9", "spont").unwrap();
        assert_eq!(slice.n_rows(), 0);
        assert!(slice.rows().is_empty());
    }
}
