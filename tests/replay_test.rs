//! Integration tests for session persistence and batch replay

mod common;

use common::{config_with_artifacts, human_record, scripted_record, session_from};
use motion_sentinel::detect::detector::Detector;
use motion_sentinel::replay::session::PointSession;
use tempfile::TempDir;

#[test]
fn test_session_file_roundtrip_through_replay() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());

    let session = session_from("human_capture", 80, human_record);
    let session_path = dir.path().join("session.json");
    session.save(&session_path).unwrap();

    let loaded = PointSession::load(&session_path).unwrap();
    assert_eq!(loaded.len(), 80);
    assert_eq!(loaded.metadata.name, "human_capture");

    let mut detector = Detector::from_artifacts(&config).unwrap();
    let summary = loaded.replay(&mut detector);
    assert_eq!(summary.points_fed, 80);
    assert!(summary.decisions > 0);
    assert!(summary.mean_raw_error.is_finite());
}

#[test]
fn test_replay_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());
    let session = session_from("repeat", 60, human_record);

    let mut detector = Detector::from_artifacts(&config).unwrap();
    let first = session.replay(&mut detector);
    // Same detector, same session: replay() clears state first
    let second = session.replay(&mut detector);

    assert_eq!(first.decisions, second.decisions);
    assert_eq!(first.mean_raw_error, second.mean_raw_error);
}

#[test]
fn test_replay_summary_counts_decisions() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());
    let session = session_from("counted", 50, human_record);

    let mut detector = Detector::from_artifacts(&config).unwrap();
    let warmup = detector.capacity() - 1;
    let summary = session.replay(&mut detector);

    assert_eq!(summary.decisions, 50 - warmup);
    assert!(summary.last.is_some());
}

#[test]
fn test_short_session_reports_insufficient_data() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());
    let session = session_from("too_short", 5, human_record);

    let mut detector = Detector::from_artifacts(&config).unwrap();
    let summary = session.replay(&mut detector);

    assert_eq!(summary.decisions, 0);
    assert_eq!(summary.mean_raw_error, 0.0);
    assert!(summary.last.is_none());
    assert!(summary.is_human());
}

#[test]
fn test_scripted_session_replays_cleanly() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());
    let session = session_from("scripted", 60, scripted_record);

    let mut detector = Detector::from_artifacts(&config).unwrap();
    let summary = session.replay(&mut detector);
    assert!(summary.decisions > 0);
    assert!(summary.mean_raw_error > 0.0);
}

#[test]
fn test_summary_serializes_to_json() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());
    let session = session_from("jsonable", 40, human_record);

    let mut detector = Detector::from_artifacts(&config).unwrap();
    let summary = session.replay(&mut detector);

    let json = serde_json::to_string_pretty(&summary).unwrap();
    assert!(json.contains("mean_raw_error"));
    assert!(json.contains("\"session\": \"jsonable\""));
}

#[test]
fn test_corrupted_session_file_fails_to_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "not a session").unwrap();
    assert!(PointSession::load(&path).is_err());
}

#[test]
fn test_session_with_bad_records_still_replays() {
    let dir = TempDir::new().unwrap();
    let config = config_with_artifacts(dir.path());

    let mut session = session_from("dirty", 60, human_record);
    session.points[7].deltatime = f64::NAN;
    session.points[30].deltatime = -1.0;

    let mut detector = Detector::from_artifacts(&config).unwrap();
    let summary = session.replay(&mut detector);
    assert_eq!(summary.points_fed, 60);
    assert!(summary.decisions > 0);
}
