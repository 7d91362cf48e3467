//! Shared helpers for integration tests
#![allow(dead_code)]

use motion_sentinel::app::config::Config;
use motion_sentinel::features::schema::NUM_FEATURES;
use motion_sentinel::ingest::point::PointRecord;
use motion_sentinel::model::artifact::{LinearWeights, ModelArtifact, ModelDims};
use motion_sentinel::replay::session::PointSession;
use std::path::Path;

/// Small architecture that keeps test inference fast
pub fn tiny_dims() -> ModelDims {
    ModelDims {
        num_features: NUM_FEATURES,
        d_model: 16,
        num_heads: 2,
        num_layers: 1,
        feedforward_dim: 32,
        dropout: 0.1,
    }
}

/// Deterministic pseudo-random weights: a non-trivial but reproducible model
pub fn seeded_artifact(dims: ModelDims) -> ModelArtifact {
    let mut artifact = ModelArtifact::zeroed(dims);
    let mut counter = 0.0_f64;
    let mut next = move || {
        counter += 1.0;
        (counter * 0.6367).sin() * 0.15
    };

    let fill = |w: &mut LinearWeights, next: &mut dyn FnMut() -> f64| {
        for row in w.weight.iter_mut() {
            for v in row.iter_mut() {
                *v = next();
            }
        }
        for v in w.bias.iter_mut() {
            *v = next();
        }
    };

    fill(&mut artifact.input_proj, &mut next);
    for layer in artifact.encoder_layers.iter_mut() {
        fill(&mut layer.attn_query, &mut next);
        fill(&mut layer.attn_key, &mut next);
        fill(&mut layer.attn_value, &mut next);
        fill(&mut layer.attn_output, &mut next);
        fill(&mut layer.feedforward_in, &mut next);
        fill(&mut layer.feedforward_out, &mut next);
    }
    fill(&mut artifact.output_proj, &mut next);
    artifact
}

/// A jittered, human-like point record
pub fn human_record(i: usize) -> PointRecord {
    let t = i as f64;
    PointRecord::new(
        (4.0 * t + (t * 12.9898).sin() * 3.0) as i32,
        (60.0 * (t * 0.05).sin() + (t * 78.233).sin() * 3.0) as i32,
        0.045 + (t * 3.7).sin().abs() * 0.01,
    )
}

/// A perfectly linear, constant-interval record: the scripted signature
pub fn scripted_record(i: usize) -> PointRecord {
    PointRecord::new((i as i32) * 5, 0, 0.01)
}

/// Write valid scaler and model artifacts plus a matching config into `dir`
/// and return the ready-to-use config.
pub fn config_with_artifacts(dir: &Path) -> Config {
    use motion_sentinel::features::kinematics::compute_features;
    use motion_sentinel::features::scaler::RobustScaler;
    use motion_sentinel::ingest::point::Point;

    // Fit the scaler on jittered "human" training motion
    let points: Vec<Point> = (0..400)
        .map(|i| Point::try_from_record(&human_record(i)).unwrap())
        .collect();
    let table = compute_features(&points, &Vec::new());
    let scaler = RobustScaler::fit(table.view()).unwrap();

    let scaler_path = dir.join("scaler.json");
    scaler.save(&scaler_path).unwrap();

    let dims = tiny_dims();
    let model_path = dir.join("model.json");
    seeded_artifact(dims).save(&model_path).unwrap();

    let mut config = Config::default();
    config.detector.seq_len = 16;
    config.detector.stride = 4;
    config.detector.buffer_slack = 4;
    // The seeded weights are untrained, so absolute errors are large; the
    // floor sits above their range and verdict tests exercise the decision
    // machinery rather than model quality
    config.detector.base_threshold = 500.0;
    config.model.d_model = dims.d_model;
    config.model.num_layers = dims.num_layers;
    config.model.num_heads = dims.num_heads;
    config.model.feedforward_dim = dims.feedforward_dim;
    config.model.dropout = dims.dropout;
    config.artifacts.model_path = model_path;
    config.artifacts.scaler_path = scaler_path;
    config
}

/// Build a session from a record generator
pub fn session_from(name: &str, count: usize, make: impl Fn(usize) -> PointRecord) -> PointSession {
    let mut session = PointSession::new(name.to_string());
    for i in 0..count {
        session.add_point(make(i));
    }
    session
}
