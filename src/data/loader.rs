use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, LargeListArray,
    ListArray, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::{RecordingDataset, TimeWindow, Trace};

/// Default frame rate when a file carries no `fps` attribute (ScanImage
/// recordings at 30 Hz).
pub const DEFAULT_FPS: f64 = 30.03;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a recording dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one row per neuron, `dff` list column, metadata columns;
///   `fps` and `epochs` in the Arrow schema metadata (recommended)
/// * `.json`    – `{ "fps": .., "epochs": {..}, "neurons": [..] }`
pub fn load_file(path: &Path) -> Result<RecordingDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// All traces of a recording must share one frame count.
fn check_trace_lengths(traces: &[Trace]) -> Result<()> {
    let Some(first) = traces.first() else {
        return Ok(());
    };
    let n_frames = first.dff.len();
    for (i, tr) in traces.iter().enumerate() {
        if tr.dff.len() != n_frames {
            bail!(
                "Trace {i} (mouse '{}') has {} frames, expected {n_frames}",
                tr.mouse_id,
                tr.dff.len()
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Serde schema of the JSON dataset file:
///
/// ```json
/// {
///   "fps": 30.03,
///   "epochs": { "spont": { "start": 0, "end": 9000 },
///               "stim":  { "start": 9000, "end": 18000 } },
///   "neurons": [
///     { "dff": [0.01, 0.12, ...],
///       "mouse_id": "289", "condition": "WT", "fov": 2, "day": 1 },
///     ...
///   ]
/// }
/// ```
#[derive(Debug, Deserialize)]
struct JsonDataset {
    #[serde(default = "default_fps")]
    fps: f64,
    #[serde(default)]
    epochs: BTreeMap<String, TimeWindow>,
    neurons: Vec<Trace>,
}

fn default_fps() -> f64 {
    DEFAULT_FPS
}

fn load_json(path: &Path) -> Result<RecordingDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let parsed: JsonDataset = serde_json::from_str(&text).context("parsing JSON dataset")?;

    check_trace_lengths(&parsed.neurons)?;
    Ok(RecordingDataset::from_traces(
        parsed.neurons,
        parsed.fps,
        parsed.epochs,
    ))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing per-neuron traces.
///
/// Expected schema:
/// - `dff`: List<Float64> or LargeList<Float64> – the dF/F trace
/// - `mouse_id`, `condition`: Utf8
/// - `fov`, `day`: Int64 or Int32
///
/// The `fps` (number) and `epochs` (name → `{start, end}` map) attributes
/// are read from the Arrow schema metadata as JSON, the way xarray-style
/// datasets carry recording attrs. Works with files written by both
/// **pyarrow** and this crate's `generate_sample` binary.
fn load_parquet(path: &Path) -> Result<RecordingDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;

    let meta = builder.schema().metadata().clone();
    let fps = match meta.get("fps") {
        Some(raw) => raw
            .parse::<f64>()
            .with_context(|| format!("schema metadata 'fps' is not a number: '{raw}'"))?,
        None => DEFAULT_FPS,
    };
    let epochs: BTreeMap<String, TimeWindow> = match meta.get("epochs") {
        Some(raw) => serde_json::from_str(raw).context("parsing 'epochs' schema metadata")?,
        None => BTreeMap::new(),
    };

    let reader = builder.build().context("building parquet reader")?;

    let mut traces = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let n_rows = batch.num_rows();

        let dff_col = batch.column(
            schema
                .index_of("dff")
                .map_err(|_| anyhow::anyhow!("Parquet file missing 'dff' column"))?,
        );
        let mouse_col = batch.column(
            schema
                .index_of("mouse_id")
                .map_err(|_| anyhow::anyhow!("Parquet file missing 'mouse_id' column"))?,
        );
        let cond_col = batch.column(
            schema
                .index_of("condition")
                .map_err(|_| anyhow::anyhow!("Parquet file missing 'condition' column"))?,
        );
        let fov_col = batch.column(
            schema
                .index_of("fov")
                .map_err(|_| anyhow::anyhow!("Parquet file missing 'fov' column"))?,
        );
        let day_col = batch.column(
            schema
                .index_of("day")
                .map_err(|_| anyhow::anyhow!("Parquet file missing 'day' column"))?,
        );

        for row in 0..n_rows {
            let dff = extract_f64_list(dff_col, row)
                .with_context(|| format!("Row {row}: failed to read 'dff'"))?;
            let mouse_id = extract_string(mouse_col, row)
                .with_context(|| format!("Row {row}: failed to read 'mouse_id'"))?;
            let condition = extract_string(cond_col, row)
                .with_context(|| format!("Row {row}: failed to read 'condition'"))?;
            let fov = extract_i64(fov_col, row)
                .with_context(|| format!("Row {row}: failed to read 'fov'"))?;
            let day = extract_i64(day_col, row)
                .with_context(|| format!("Row {row}: failed to read 'day'"))?;

            traces.push(Trace {
                dff,
                mouse_id,
                condition,
                fov,
                day,
            });
        }
    }

    check_trace_lengths(&traces)?;
    Ok(RecordingDataset::from_traces(traces, fps, epochs))
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32. Null samples are rejected
    // outright: a NaN would silently poison every downstream mean and the
    // snapshot would no longer round-trip through JSON.
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        f64_arr
            .iter()
            .map(|v| v.context("null sample inside list"))
            .collect()
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        f32_arr
            .iter()
            .map(|v| v.context("null sample inside list").map(f64::from))
            .collect()
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Extract a string cell from a Utf8 or LargeUtf8 column.
fn extract_string(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null value in string column");
    }
    match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Ok(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => {
            let arr = col.as_string::<i64>();
            Ok(arr.value(row).to_string())
        }
        other => bail!("Expected Utf8 column, got {other:?}"),
    }
}

/// Extract an integer cell from an Int64 or Int32 column.
fn extract_i64(col: &Arc<dyn Array>, row: usize) -> Result<i64> {
    if col.is_null(row) {
        bail!("null value in integer column");
    }
    match col.data_type() {
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            Ok(arr.value(row))
        }
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            Ok(arr.value(row) as i64)
        }
        other => bail!("Expected Int64 or Int32 column, got {other:?}"),
    }
}
