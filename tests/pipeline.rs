//! End-to-end run over a small synthetic recording: write a JSON dataset,
//! load it, aggregate, export the tidy tables, and reload the snapshot.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use rusty_calcium::aggregate::{aggregate, AggregationParams};
use rusty_calcium::export::{export_tidy, load_snapshot, save_snapshot, table_file_name};
use rusty_calcium::load_file;

/// JSON for one mouse's traces: `n` neurons, spiking ones get transients
/// at frames 40 and 110.
fn neurons_json(mouse: &str, condition: &str, n: usize, spiking: usize) -> String {
    let mut out = String::new();
    for i in 0..n {
        let mut dff = vec![0.01; 150];
        if i < spiking {
            dff[40] = 0.9;
            dff[110] = 0.9;
        }
        let values: Vec<String> = dff.iter().map(|v| v.to_string()).collect();
        write!(
            out,
            r#"{{"dff":[{}],"mouse_id":"{mouse}","condition":"{condition}","fov":1,"day":0}},"#,
            values.join(",")
        )
        .unwrap();
    }
    out
}

fn dataset_json() -> String {
    let mut neurons = String::new();
    neurons.push_str(&neurons_json("m_wt_1", "WT", 12, 6));
    neurons.push_str(&neurons_json("m_wt_2", "WT", 11, 5));
    neurons.push_str(&neurons_json("m_mut_1", "MUT", 12, 2));
    neurons.push_str(&neurons_json("m_sparse", "MUT", 4, 2)); // below threshold
    neurons.pop(); // trailing comma

    format!(
        r#"{{"fps": 30.0,
            "epochs": {{ "spont": {{ "start": 0, "end": 75 }} }},
            "neurons": [{neurons}]}}"#
    )
}

#[test]
fn full_pipeline_loads_aggregates_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let dataset_path = dir.path().join("recording.json");
    std::fs::write(&dataset_path, dataset_json()).unwrap();

    let dataset = load_file(&dataset_path).unwrap();
    assert_eq!(dataset.len(), 39);
    assert_eq!(dataset.mouse_ids.len(), 4);

    let result = aggregate(&dataset, &AggregationParams::default());

    // Three mice survive; each for "all" and "spont", never for the
    // undeclared "stim" epoch. The sparse mouse is dropped entirely.
    assert_eq!(result.n_groups(), 6);
    let mice: BTreeSet<String> = result.iter().map(|(k, _)| k.mouse_id).collect();
    assert!(!mice.contains("m_sparse"));

    let out_dir = dir.path().join("tables");
    let written = export_tidy(&result, &out_dir).unwrap();
    assert!(!written.is_empty());

    // The mean-dff table for "spont" holds one row per surviving mouse.
    let table = out_dir.join(table_file_name("spont", "mean_dff"));
    let mut reader = csv::Reader::from_path(&table).unwrap();
    assert_eq!(
        reader.headers().unwrap(),
        &csv::StringRecord::from(vec!["Genotype", "MouseID", "Value"])
    );
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    let pairs: Vec<(String, String)> = rows
        .iter()
        .map(|r| (r[0].to_string(), r[1].to_string()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("MUT".to_string(), "m_mut_1".to_string()),
            ("WT".to_string(), "m_wt_1".to_string()),
            ("WT".to_string(), "m_wt_2".to_string()),
        ]
    );

    // Snapshot round-trip reproduces the mapping exactly.
    let snapshot = dir.path().join("snapshot.json");
    save_snapshot(&result, &snapshot).unwrap();
    assert_eq!(load_snapshot(&snapshot).unwrap(), result);
}
