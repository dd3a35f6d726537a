//! Pure numeric calculators for dF/F trace statistics.
//!
//! Every function here is deterministic and stateless: input rows are the
//! windowed per-neuron dF/F slices produced by the data layer, output is a
//! per-trace vector or an across-trace scalar. Empty inputs yield `None`
//! from the scalar functions rather than NaN.

// ---------------------------------------------------------------------------
// Mean dF/F
// ---------------------------------------------------------------------------

/// Arithmetic mean of one trace over its window. The mean of a
/// constant-valued trace is that constant.
pub fn trace_mean(trace: &[f64]) -> f64 {
    if trace.is_empty() {
        return 0.0;
    }
    trace.iter().sum::<f64>() / trace.len() as f64
}

/// Per-trace mean dF/F for a group of rows.
pub fn mean_dff_per_trace(rows: &[&[f64]]) -> Vec<f64> {
    rows.iter().map(|r| trace_mean(r)).collect()
}

/// Across-trace mean dF/F of a group. `None` when the group has no rows.
pub fn mean_dff(rows: &[&[f64]]) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    Some(trace_mean(&mean_dff_per_trace(rows)))
}

// ---------------------------------------------------------------------------
// Spike detection
// ---------------------------------------------------------------------------

/// Locate spikes in a single trace.
///
/// A spike is a local maximum strictly above
/// `min + thresh * (max - min)` — a threshold relative to the trace's own
/// dynamic range, so the detector adapts per neuron. Peaks closer than
/// `min_dist` frames to a larger accepted peak are suppressed, keeping the
/// highest peak of each cluster. A flat trace (zero dynamic range) has no
/// spikes for any `thresh` in (0, 1).
pub fn detect_spikes(trace: &[f64], thresh: f64, min_dist: usize) -> Vec<usize> {
    if trace.len() < 3 {
        return Vec::new();
    }
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for &v in trace {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    let cutoff = lo + thresh * (hi - lo);

    // Interior local maxima above the relative cutoff.
    let mut candidates: Vec<usize> = (1..trace.len() - 1)
        .filter(|&i| {
            trace[i] > cutoff && trace[i] >= trace[i - 1] && trace[i] > trace[i + 1]
        })
        .collect();

    // Enforce the minimum distance, strongest peak first.
    candidates.sort_by(|&a, &b| trace[b].total_cmp(&trace[a]).then(a.cmp(&b)));
    let mut accepted: Vec<usize> = Vec::new();
    for idx in candidates {
        if accepted
            .iter()
            .all(|&kept| idx.abs_diff(kept) >= min_dist.max(1))
        {
            accepted.push(idx);
        }
    }
    accepted.sort_unstable();
    accepted
}

/// Minimum inter-spike distance of one second, in frames.
pub fn min_spike_distance(fps: f64) -> usize {
    (fps as usize).max(1)
}

/// Spike count of every trace in a group.
pub fn spike_counts(rows: &[&[f64]], fps: f64, thresh: f64) -> Vec<usize> {
    let min_dist = min_spike_distance(fps);
    rows.iter()
        .map(|r| detect_spikes(r, thresh, min_dist).len())
        .collect()
}

/// Per-trace spike rate in Hz: spike count over elapsed seconds at `fps`.
pub fn spike_rate_per_trace(rows: &[&[f64]], fps: f64, thresh: f64) -> Vec<f64> {
    let counts = spike_counts(rows, fps, thresh);
    rows.iter()
        .zip(counts)
        .map(|(r, n)| {
            let secs = r.len() as f64 / fps;
            if secs > 0.0 {
                n as f64 / secs
            } else {
                0.0
            }
        })
        .collect()
}

/// Across-trace mean spike rate of a group. `None` when the group is empty.
pub fn mean_spike_rate(rows: &[&[f64]], fps: f64, thresh: f64) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    Some(trace_mean(&spike_rate_per_trace(rows, fps, thresh)))
}

// ---------------------------------------------------------------------------
// Background exclusion
// ---------------------------------------------------------------------------

/// Indices of active traces: at least one detected spike at the given
/// threshold. The rest are background neurons.
pub fn active_indices(rows: &[&[f64]], fps: f64, thresh: f64) -> Vec<usize> {
    spike_counts(rows, fps, thresh)
        .into_iter()
        .enumerate()
        .filter(|&(_, n)| n > 0)
        .map(|(i, _)| i)
        .collect()
}

fn select<'a>(rows: &[&'a [f64]], indices: &[usize]) -> Vec<&'a [f64]> {
    indices.iter().map(|&i| rows[i]).collect()
}

/// Mean dF/F over the active traces only. `None` when every trace is
/// background.
pub fn mean_dff_no_background(rows: &[&[f64]], fps: f64, thresh: f64) -> Option<f64> {
    let active = select(rows, &active_indices(rows, fps, thresh));
    mean_dff(&active)
}

/// Mean spike rate over the active traces only. `None` when every trace is
/// background.
pub fn mean_spike_rate_no_background(rows: &[&[f64]], fps: f64, thresh: f64) -> Option<f64> {
    let active = select(rows, &active_indices(rows, fps, thresh));
    mean_spike_rate(&active, fps, thresh)
}
