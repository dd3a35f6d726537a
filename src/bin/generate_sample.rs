use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Float64Builder, Int64Array, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// A calcium transient: fast rise at `onset`, exponential decay.
fn transient(t: usize, onset: usize, amplitude: f64, decay_frames: f64) -> f64 {
    if t < onset {
        return 0.0;
    }
    amplitude * (-((t - onset) as f64) / decay_frames).exp()
}

fn generate_trace(
    n_frames: usize,
    event_rate_hz: f64,
    fps: f64,
    noise_level: f64,
    rng: &mut SimpleRng,
) -> Vec<f64> {
    // Poisson-ish event placement: one Bernoulli draw per frame.
    let p_event = event_rate_hz / fps;
    let mut onsets = Vec::new();
    for t in 0..n_frames {
        if rng.next_f64() < p_event {
            onsets.push(t);
        }
    }

    (0..n_frames)
        .map(|t| {
            let signal: f64 = onsets
                .iter()
                .map(|&onset| transient(t, onset, 1.0, fps / 2.0))
                .sum();
            signal + rng.gauss(0.0, noise_level)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() {
    let mut rng = SimpleRng::new(42);

    let fps = 30.03;
    let n_frames = 18_000; // ~10 minutes
    let neurons_per_mouse = 25;

    // Two genotype groups, mutants fire at roughly half the WT rate.
    let mice: Vec<(&str, &str, f64)> = vec![
        ("289", "WT", 0.20),
        ("293", "WT", 0.25),
        ("514", "MUT", 0.10),
        ("612", "MUT", 0.12),
    ];

    // Spontaneous first half, stimulus second half.
    let epochs = r#"{"spont":{"start":0,"end":9000},"stim":{"start":9000,"end":18000}}"#;

    // Collect all rows
    let mut all_dff: Vec<Vec<f64>> = Vec::new();
    let mut all_mouse: Vec<String> = Vec::new();
    let mut all_condition: Vec<String> = Vec::new();
    let mut all_fov: Vec<i64> = Vec::new();
    let mut all_day: Vec<i64> = Vec::new();

    for (mouse, condition, rate) in &mice {
        for neuron in 0..neurons_per_mouse {
            let noise = 0.02 + 0.01 * rng.next_f64();
            all_dff.push(generate_trace(n_frames, *rate, fps, noise, &mut rng));
            all_mouse.push(mouse.to_string());
            all_condition.push(condition.to_string());
            all_fov.push((neuron % 2 + 1) as i64);
            all_day.push(0);
        }
    }

    // Build Arrow arrays
    let mut dff_builder = ListBuilder::new(Float64Builder::new());
    for row in &all_dff {
        let values = dff_builder.values();
        for &v in row {
            values.append_value(v);
        }
        dff_builder.append(true);
    }
    let dff_array = dff_builder.finish();

    let mouse_array =
        StringArray::from(all_mouse.iter().map(|s| s.as_str()).collect::<Vec<_>>());
    let condition_array =
        StringArray::from(all_condition.iter().map(|s| s.as_str()).collect::<Vec<_>>());
    let fov_array = Int64Array::from(all_fov);
    let day_array = Int64Array::from(all_day);

    // fps and epoch windows ride along as schema metadata, like netCDF
    // attrs on a recording.
    let mut metadata = HashMap::new();
    metadata.insert("fps".to_string(), fps.to_string());
    metadata.insert("epochs".to_string(), epochs.to_string());

    let schema = Arc::new(Schema::new_with_metadata(
        vec![
            Field::new(
                "dff",
                DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
                false,
            ),
            Field::new("mouse_id", DataType::Utf8, false),
            Field::new("condition", DataType::Utf8, false),
            Field::new("fov", DataType::Int64, false),
            Field::new("day", DataType::Int64, false),
        ],
        metadata,
    ));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(dff_array),
            Arc::new(mouse_array),
            Arc::new(condition_array),
            Arc::new(fov_array),
            Arc::new(day_array),
        ],
    )
    .expect("Failed to create RecordBatch");

    // Write Parquet
    let output_path = "sample_recording.parquet";
    let file = std::fs::File::create(output_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    println!(
        "Wrote {} traces ({n_frames} frames each) to {output_path}",
        all_mouse.len()
    );
}
