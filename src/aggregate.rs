//! Group iteration and result accumulation.
//!
//! Walks every (mouse, epoch) pair of a loaded dataset, computes the four
//! activity measures on each surviving group, and accumulates them into a
//! nested condition → epoch → mouse mapping. The run is best-effort:
//! groups with no declared epoch window or too few traces are skipped, the
//! rest of the batch continues.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::data::filter::{EpochSlice, EPOCH_ALL};
use crate::data::model::RecordingDataset;
use crate::error::AnalysisError;
use crate::stats;

// ---------------------------------------------------------------------------
// Measures
// ---------------------------------------------------------------------------

/// The derived statistics computed per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Measure {
    MeanDff,
    MeanSpikeRate,
    MeanDffNoBackground,
    MeanSpikeRateNoBackground,
}

impl Measure {
    pub const ALL: [Measure; 4] = [
        Measure::MeanDff,
        Measure::MeanSpikeRate,
        Measure::MeanDffNoBackground,
        Measure::MeanSpikeRateNoBackground,
    ];

    /// Stable name used in bundles, snapshots, and export file names.
    pub fn name(&self) -> &'static str {
        match self {
            Measure::MeanDff => "mean_dff",
            Measure::MeanSpikeRate => "mean_spike_rate",
            Measure::MeanDffNoBackground => "mean_dff_no_bg",
            Measure::MeanSpikeRateNoBackground => "mean_spike_rate_no_bg",
        }
    }
}

/// Measure name → scalar value for one (condition, epoch, mouse) group.
/// The no-background measures are absent when every trace is background.
pub type MeasurementBundle = BTreeMap<String, f64>;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Tunables of the aggregation run.
#[derive(Debug, Clone)]
pub struct AggregationParams {
    /// Ordered epochs to evaluate per mouse.
    pub epochs: Vec<String>,
    /// Relative spike-detection threshold in (0, 1).
    pub spike_thresh: f64,
    /// Minimum trace count for a group to enter the result.
    pub min_traces: usize,
}

impl Default for AggregationParams {
    fn default() -> Self {
        AggregationParams {
            epochs: vec![
                EPOCH_ALL.to_string(),
                "spont".to_string(),
                "stim".to_string(),
            ],
            spike_thresh: 0.70,
            min_traces: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Result structure
// ---------------------------------------------------------------------------

/// Identifies one aggregation bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GroupKey {
    pub condition: String,
    pub epoch: String,
    pub mouse_id: String,
}

/// The nested aggregation mapping: condition → epoch → mouse → bundle.
/// Serializable as the snapshot artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub groups: BTreeMap<String, BTreeMap<String, BTreeMap<String, MeasurementBundle>>>,
}

impl AggregationResult {
    pub fn insert(&mut self, key: GroupKey, bundle: MeasurementBundle) {
        self.groups
            .entry(key.condition)
            .or_default()
            .entry(key.epoch)
            .or_default()
            .insert(key.mouse_id, bundle);
    }

    pub fn get(&self, key: &GroupKey) -> Option<&MeasurementBundle> {
        self.groups
            .get(&key.condition)?
            .get(&key.epoch)?
            .get(&key.mouse_id)
    }

    /// Number of (condition, epoch, mouse) groups in the result.
    pub fn n_groups(&self) -> usize {
        self.groups
            .values()
            .flat_map(|per_epoch| per_epoch.values())
            .map(|per_mouse| per_mouse.len())
            .sum()
    }

    /// Iterate all groups in deterministic (condition, epoch, mouse) order.
    pub fn iter(&self) -> impl Iterator<Item = (GroupKey, &MeasurementBundle)> {
        self.groups.iter().flat_map(|(cond, per_epoch)| {
            per_epoch.iter().flat_map(move |(epoch, per_mouse)| {
                per_mouse.iter().map(move |(mouse, bundle)| {
                    (
                        GroupKey {
                            condition: cond.clone(),
                            epoch: epoch.clone(),
                            mouse_id: mouse.clone(),
                        },
                        bundle,
                    )
                })
            })
        })
    }
}

// ---------------------------------------------------------------------------
// The aggregation run
// ---------------------------------------------------------------------------

/// Compute one group's bundle, or the reason it must be skipped.
fn measure_group(
    dataset: &RecordingDataset,
    mouse_id: &str,
    epoch: &str,
    params: &AggregationParams,
) -> Result<MeasurementBundle, AnalysisError> {
    let slice = EpochSlice::new(dataset, mouse_id, epoch)?;
    if slice.n_rows() < params.min_traces {
        return Err(AnalysisError::InsufficientData {
            mouse_id: mouse_id.to_string(),
            epoch: epoch.to_string(),
            rows: slice.n_rows(),
            min: params.min_traces,
        });
    }

    let rows = slice.rows();
    let fps = dataset.fps;
    let thresh = params.spike_thresh;

    let mut bundle = MeasurementBundle::new();
    let values = [
        stats::mean_dff(&rows),
        stats::mean_spike_rate(&rows, fps, thresh),
        stats::mean_dff_no_background(&rows, fps, thresh),
        stats::mean_spike_rate_no_background(&rows, fps, thresh),
    ];
    for (measure, value) in Measure::ALL.iter().zip(values) {
        if let Some(v) = value {
            bundle.insert(measure.name().to_string(), v);
        }
    }
    Ok(bundle)
}

/// Run the full aggregation over every mouse and every configured epoch.
///
/// Skip-on-error, no retry: a missing epoch window means the mouse was
/// never recorded for that epoch and is passed over quietly; a group below
/// the trace threshold is dropped with a warning naming mouse and epoch.
/// Neither condition aborts the run.
pub fn aggregate(dataset: &RecordingDataset, params: &AggregationParams) -> AggregationResult {
    let mut result = AggregationResult::default();

    for mouse_id in &dataset.mouse_ids {
        let Some(condition) = dataset.condition_of(mouse_id) else {
            continue;
        };
        for epoch in &params.epochs {
            match measure_group(dataset, mouse_id, epoch, params) {
                Ok(bundle) => {
                    result.insert(
                        GroupKey {
                            condition: condition.to_string(),
                            epoch: epoch.clone(),
                            mouse_id: mouse_id.clone(),
                        },
                        bundle,
                    );
                }
                Err(err @ AnalysisError::MissingEpoch { .. }) => {
                    debug!("mouse '{mouse_id}': {err}");
                }
                Err(err @ AnalysisError::InsufficientData { .. }) => {
                    warn!("skipping group: {err}");
                }
            }
        }
    }

    debug!("aggregated {} groups", result.n_groups());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{TimeWindow, Trace};

    /// `n` flat traces plus one spiking trace for a mouse.
    fn mouse_traces(mouse: &str, cond: &str, n: usize) -> Vec<Trace> {
        let mut traces = Vec::new();
        for i in 0..n {
            let mut dff = vec![0.02; 120];
            if i == 0 {
                dff[30] = 1.0;
                dff[90] = 1.0;
            }
            traces.push(Trace {
                dff,
                mouse_id: mouse.to_string(),
                condition: cond.to_string(),
                fov: 1,
                day: 0,
            });
        }
        traces
    }

    fn dataset() -> RecordingDataset {
        let mut epochs = BTreeMap::new();
        epochs.insert("spont".to_string(), TimeWindow { start: 0, end: 60 });
        // "stim" deliberately undeclared: not every mouse saw a stimulus.
        let mut traces = mouse_traces("m1", "WT", 12);
        traces.extend(mouse_traces("m2", "MUT", 12));
        traces.extend(mouse_traces("m3", "WT", 3)); // below threshold
        RecordingDataset::from_traces(traces, 30.0, epochs)
    }

    #[test]
    fn aggregation_covers_declared_epochs_only() {
        let result = aggregate(&dataset(), &AggregationParams::default());

        // m1 and m2 appear for "all" and "spont"; "stim" is skipped silently.
        assert_eq!(result.n_groups(), 4);
        assert!(result
            .get(&GroupKey {
                condition: "WT".to_string(),
                epoch: "all".to_string(),
                mouse_id: "m1".to_string(),
            })
            .is_some());
        assert!(result
            .get(&GroupKey {
                condition: "MUT".to_string(),
                epoch: "spont".to_string(),
                mouse_id: "m2".to_string(),
            })
            .is_some());
        assert!(result.groups.values().all(|e| !e.contains_key("stim")));
    }

    #[test]
    fn sparse_group_is_omitted_without_raising() {
        let result = aggregate(&dataset(), &AggregationParams::default());
        // m3 has 3 traces, below the default threshold of 10.
        for (key, _) in result.iter() {
            assert_ne!(key.mouse_id, "m3");
        }
    }

    #[test]
    fn epoch_window_past_recording_end_yields_no_group() {
        // 100-frame recording, stim window declared far beyond its end.
        let mut epochs = BTreeMap::new();
        epochs.insert(
            "stim".to_string(),
            TimeWindow {
                start: 5000,
                end: 9000,
            },
        );
        let mut traces = Vec::new();
        for _ in 0..12 {
            traces.push(Trace {
                dff: vec![0.02; 100],
                mouse_id: "m1".to_string(),
                condition: "WT".to_string(),
                fov: 1,
                day: 0,
            });
        }
        let ds = RecordingDataset::from_traces(traces, 30.0, epochs);
        let result = aggregate(&ds, &AggregationParams::default());

        // No fabricated zero-valued stim measures; only "all" survives.
        assert!(result.iter().all(|(key, _)| key.epoch != "stim"));
        assert_eq!(result.n_groups(), 1);
    }

    #[test]
    fn bundles_carry_all_four_measures_when_active() {
        let result = aggregate(&dataset(), &AggregationParams::default());
        let bundle = result
            .get(&GroupKey {
                condition: "WT".to_string(),
                epoch: "all".to_string(),
                mouse_id: "m1".to_string(),
            })
            .unwrap();
        for measure in Measure::ALL {
            assert!(bundle.contains_key(measure.name()), "{}", measure.name());
        }
    }

    #[test]
    fn fully_silent_mouse_omits_no_background_measures() {
        let mut traces = Vec::new();
        for _ in 0..10 {
            traces.push(Trace {
                dff: vec![0.0; 120],
                mouse_id: "m1".to_string(),
                condition: "WT".to_string(),
                fov: 1,
                day: 0,
            });
        }
        let ds = RecordingDataset::from_traces(traces, 30.0, BTreeMap::new());
        let result = aggregate(&ds, &AggregationParams::default());

        let bundle = result
            .get(&GroupKey {
                condition: "WT".to_string(),
                epoch: "all".to_string(),
                mouse_id: "m1".to_string(),
            })
            .unwrap();
        assert_eq!(bundle.get("mean_dff"), Some(&0.0));
        assert_eq!(bundle.get("mean_spike_rate"), Some(&0.0));
        assert!(!bundle.contains_key("mean_dff_no_bg"));
        assert!(!bundle.contains_key("mean_spike_rate_no_bg"));
    }
}
