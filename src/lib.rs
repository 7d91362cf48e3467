//! # Motion Sentinel
//!
//! A behavioral anomaly detector that classifies a stream of pointer-movement
//! events as human-generated or automated ("macro") input.
//!
//! ## Overview
//!
//! The detector consumes pointer samples one at a time, derives kinematic
//! features over a sliding buffer, normalizes them with a scaler fit offline,
//! reconstructs the most recent feature sequence with a frozen autoencoder,
//! and converts the reconstruction error into a temporally smoothed
//! human/macro verdict. The model is trained only on human sessions, so
//! scripted motion reconstructs poorly and scores high.
//!
//! ## Quick Start
//!
//! ```no_run
//! use motion_sentinel::app::config::Config;
//! use motion_sentinel::detect::detector::Detector;
//! use motion_sentinel::ingest::point::PointRecord;
//! use chrono::Utc;
//!
//! let config = Config::load_default().expect("config");
//! let mut detector = Detector::from_artifacts(&config).expect("artifacts");
//!
//! // ... feed points as they arrive ...
//! let record = PointRecord { timestamp: Utc::now(), x: 640, y: 360, deltatime: 0.05 };
//! if let Some(result) = detector.push(&record) {
//!     println!("human={} error={:.4}", result.is_human, result.raw_error);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`ingest`]: point validation and the fixed-capacity point ring
//! - [`features`]: kinematic transform, chunk statistics, scaler, windowing
//! - [`model`]: frozen sequence autoencoder and its weights artifact
//! - [`detect`]: scoring, dynamic threshold, strike counter, orchestration
//! - [`telemetry`]: lock-free best-effort frames for a visualization host
//! - [`replay`]: recorded sessions and batch classification
//! - [`app`]: CLI and configuration management
//!
//! ## Detection Pipeline
//!
//! ```text
//! ┌─────────┐   ┌────────────┐   ┌──────────┐   ┌─────────┐   ┌────────┐
//! │  Point  │──▶│ Point Ring │──▶│ Features │──▶│ Windows │──▶│ Scaler │
//! └─────────┘   └────────────┘   └──────────┘   └─────────┘   └────────┘
//!                                                                 │
//!                                                                 ▼
//! ┌─────────┐   ┌────────────┐   ┌───────────┐   ┌───────┐   ┌─────────┐
//! │ Verdict │◀──│   Strike   │◀──│  Dynamic  │◀──│ Score │◀──│  Model  │
//! │         │   │  Counter   │   │ Threshold │   │       │   │ (recon) │
//! └─────────┘   └────────────┘   └───────────┘   └───────┘   └─────────┘
//! ```

pub mod app;
pub mod detect;
pub mod features;
pub mod ingest;
pub mod model;
pub mod replay;
pub mod telemetry;

// Re-export commonly used types
pub use detect::detector::{Detector, DetectorPhase, ReconstructionResult};
pub use features::scaler::RobustScaler;
pub use features::schema::{FEATURE_NAMES, NUM_FEATURES, SCHEMA_VERSION};
pub use ingest::point::{Point, PointRecord};
pub use model::ReconstructionModel;
pub use replay::session::{PointSession, SessionSummary};

/// Result type alias for the detector
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the detector
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Point ingestion error: {0}")]
    Ingest(String),

    #[error("Feature computation error: {0}")]
    Feature(String),

    #[error("Feature schema mismatch: {0}")]
    Schema(String),

    #[error("Artifact load error: {0}")]
    Artifact(String),

    #[error("Model inference error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
