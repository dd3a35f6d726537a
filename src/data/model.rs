use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TimeWindow – a half-open frame range on the time axis
// ---------------------------------------------------------------------------

/// A half-open `[start, end)` range of frame indices defining one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: usize,
    pub end: usize,
}

impl TimeWindow {
    /// Number of frames covered by the window.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Restrict the window to a recording of `n_frames` frames.
    pub fn clamp_to(&self, n_frames: usize) -> TimeWindow {
        TimeWindow {
            start: self.start.min(n_frames),
            end: self.end.min(n_frames),
        }
    }
}

// ---------------------------------------------------------------------------
// Trace – one neuron row of the dataset
// ---------------------------------------------------------------------------

/// One neuron's dF/F trace plus its experimental coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    /// dF/F values, one per frame.
    pub dff: Vec<f64>,
    /// Mouse the neuron was recorded from.
    pub mouse_id: String,
    /// Genotype / experimental group of that mouse.
    pub condition: String,
    /// Field-of-view index within the mouse.
    pub fov: i64,
    /// Experimental day.
    pub day: i64,
}

// ---------------------------------------------------------------------------
// RecordingDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed coordinate indices.
///
/// Read-only after construction: the pipeline never mutates a loaded
/// dataset, it only takes filtered views of it.
#[derive(Debug, Clone)]
pub struct RecordingDataset {
    /// All traces (neuron rows).
    pub traces: Vec<Trace>,
    /// Frames per trace. All traces share this length.
    pub n_frames: usize,
    /// Acquisition frame rate in Hz.
    pub fps: f64,
    /// Declared epoch windows by name. `"all"` need not be declared.
    pub epochs: BTreeMap<String, TimeWindow>,
    /// Sorted distinct mouse IDs present in the data.
    pub mouse_ids: Vec<String>,
    /// Sorted distinct condition labels present in the data.
    pub conditions: Vec<String>,
}

impl RecordingDataset {
    /// Build coordinate indices from the loaded traces.
    ///
    /// All traces must share one frame count; the loaders enforce this
    /// before construction, and windowed row slicing relies on it.
    pub fn from_traces(
        traces: Vec<Trace>,
        fps: f64,
        epochs: BTreeMap<String, TimeWindow>,
    ) -> Self {
        let n_frames = traces.first().map_or(0, |t| t.dff.len());
        debug_assert!(
            traces.iter().all(|t| t.dff.len() == n_frames),
            "all traces must have {n_frames} frames"
        );

        let mut mouse_set: BTreeSet<String> = BTreeSet::new();
        let mut condition_set: BTreeSet<String> = BTreeSet::new();
        for tr in &traces {
            mouse_set.insert(tr.mouse_id.clone());
            condition_set.insert(tr.condition.clone());
        }

        RecordingDataset {
            traces,
            n_frames,
            fps,
            epochs,
            mouse_ids: mouse_set.into_iter().collect(),
            conditions: condition_set.into_iter().collect(),
        }
    }

    /// Number of traces.
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// Whether the dataset has no traces.
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// The condition label of a mouse, taken from its first trace.
    /// A mouse belongs to exactly one genotype group.
    pub fn condition_of(&self, mouse_id: &str) -> Option<&str> {
        self.traces
            .iter()
            .find(|t| t.mouse_id == mouse_id)
            .map(|t| t.condition.as_str())
    }

    /// Recording duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.n_frames as f64 / self.fps
    }
}
