//! Integration tests for the full detection pipeline
//!
//! These tests exercise the complete path from artifact files on disk
//! through detector construction, streaming pushes, and verdicts:
//! Point -> Ring -> Features -> Windows -> Scaler -> Model -> Score ->
//! Threshold -> Strike -> ReconstructionResult

mod common;

use common::{config_with_artifacts, human_record, scripted_record};
use motion_sentinel::detect::detector::{Detector, DetectorPhase};
use motion_sentinel::ingest::point::PointRecord;
use motion_sentinel::model::artifact::ModelArtifact;
use motion_sentinel::telemetry;
use motion_sentinel::telemetry::TelemetryFrame;
use tempfile::TempDir;

#[test]
fn test_detector_builds_from_artifact_files() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());

    let detector = Detector::from_artifacts(&config).unwrap();
    assert_eq!(detector.phase(), DetectorPhase::Filling);
    assert_eq!(detector.capacity(), 20);
}

#[test]
fn test_missing_artifacts_are_fatal_at_construction() {
    let dir = TempDir::new().unwrap();
    let mut config = config_with_artifacts(dir.path());
    config.artifacts.model_path = dir.path().join("no_such_model.json");

    assert!(Detector::from_artifacts(&config).is_err());
}

#[test]
fn test_incompatible_model_schema_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());

    // Corrupt the artifact's declared schema version on disk
    let mut artifact = ModelArtifact::load(&config.artifacts.model_path).unwrap();
    artifact.schema_version = "v0".to_string();
    let json = serde_json::to_string(&artifact).unwrap();
    std::fs::write(&config.artifacts.model_path, json).unwrap();

    assert!(Detector::from_artifacts(&config).is_err());
}

#[test]
fn test_streaming_lifecycle_filling_to_ready() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());
    let mut detector = Detector::from_artifacts(&config).unwrap();

    let capacity = detector.capacity();
    for i in 0..capacity - 1 {
        assert!(detector.push(&human_record(i)).is_none());
        assert_eq!(detector.phase(), DetectorPhase::Filling);
    }

    let result = detector.push(&human_record(capacity - 1));
    assert_eq!(detector.phase(), DetectorPhase::Ready);
    let result = result.expect("verdict once the ring is full");
    assert!(result.raw_error.is_finite());
    assert!(result.threshold >= config.detector.base_threshold);
}

#[test]
fn test_two_detectors_agree_on_identical_input() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());

    let run = |config: &motion_sentinel::app::config::Config| {
        let mut detector = Detector::from_artifacts(config).unwrap();
        let mut errors = Vec::new();
        for i in 0..detector.capacity() + 30 {
            if let Some(result) = detector.push(&human_record(i)) {
                errors.push(result.raw_error);
            }
        }
        errors
    };

    let a = run(&config);
    let b = run(&config);
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[test]
fn test_zero_motion_never_produces_a_verdict() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());
    let mut detector = Detector::from_artifacts(&config).unwrap();

    let frozen = PointRecord::new(500, 500, 0.05);
    for _ in 0..detector.capacity() * 3 {
        assert!(detector.push(&frozen).is_none());
    }
    assert_eq!(detector.phase(), DetectorPhase::Ready);
}

#[test]
fn test_transient_spike_does_not_flip_verdict() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());
    let mut detector = Detector::from_artifacts(&config).unwrap();

    // Warm up on human motion
    let capacity = detector.capacity();
    let mut last = None;
    for i in 0..capacity + 20 {
        if let Some(result) = detector.push(&human_record(i)) {
            last = Some(result);
        }
    }
    let baseline = last.expect("warmed up");
    assert!(baseline.is_human, "human motion should not be flagged");

    // One wild sample mid-session must not flip the strike-based verdict
    let spike = PointRecord::new(5000, -5000, 0.045);
    let result = detector.push(&spike);
    if let Some(result) = result {
        assert!(result.is_human, "single transient flipped the verdict");
    }
    // Follow-up human motion keeps the verdict human
    for i in 0..10 {
        if let Some(result) = detector.push(&human_record(capacity + 30 + i)) {
            assert!(result.is_human);
        }
    }
}

#[test]
fn test_scripted_motion_scores_differently_from_human() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());

    let mean_error = |make: &dyn Fn(usize) -> PointRecord| {
        let mut detector = Detector::from_artifacts(&config).unwrap();
        let mut sum = 0.0;
        let mut count = 0;
        for i in 0..detector.capacity() + 40 {
            if let Some(result) = detector.push(&make(i)) {
                sum += result.raw_error;
                count += 1;
            }
        }
        assert!(count > 0);
        sum / count as f64
    };

    let human = mean_error(&|i| human_record(i));
    let scripted = mean_error(&|i| scripted_record(i));
    // The distributions must at least be distinguishable; with an untrained
    // toy model we only assert they are not identical
    assert_ne!(human, scripted);
}

#[test]
fn test_clear_declares_new_session() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());
    let mut detector = Detector::from_artifacts(&config).unwrap();

    let (tx, mut rx) = telemetry::channel(config.telemetry.capacity);
    detector.attach_telemetry(tx);

    for i in 0..detector.capacity() + 5 {
        detector.push(&human_record(i));
    }
    detector.clear();
    assert_eq!(detector.phase(), DetectorPhase::Filling);

    let frames = rx.recv_batch(1024);
    assert!(frames.contains(&TelemetryFrame::SessionBoundary));
    // Samples were emitted before the boundary
    assert!(frames
        .iter()
        .any(|f| matches!(f, TelemetryFrame::Sample { .. })));
}

#[test]
fn test_threshold_floor_holds_during_warmup() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());
    let mut detector = Detector::from_artifacts(&config).unwrap();

    for i in 0..detector.capacity() + 50 {
        if let Some(result) = detector.push(&human_record(i)) {
            // Fewer than 100 errors recorded: base threshold exactly
            assert!(result.threshold >= config.detector.base_threshold);
        }
    }
}

#[test]
fn test_malformed_points_do_not_stall_the_stream() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());
    let mut detector = Detector::from_artifacts(&config).unwrap();

    let mut verdicts = 0;
    for i in 0..detector.capacity() + 30 {
        if i % 7 == 3 {
            let mut bad = human_record(i);
            bad.deltatime = f64::NEG_INFINITY;
            assert!(detector.push(&bad).is_none());
        }
        if detector.push(&human_record(i)).is_some() {
            verdicts += 1;
        }
    }
    assert!(verdicts > 0, "stream must keep flowing around bad points");
}
