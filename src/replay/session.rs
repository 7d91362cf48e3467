//! Session data structures and replay
//!
//! Defines the serialization format for captured point sessions and the
//! batch replay that feeds a recorded session through a detector.

use crate::detect::detector::Detector;
use crate::ingest::point::PointRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Current session format version
pub const CURRENT_FORMAT_VERSION: &str = "1.0";

/// Session metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionMetadata {
    /// Unique session ID
    pub id: Uuid,
    /// Session name
    pub name: String,
    /// Capture start time
    pub started_at: DateTime<Utc>,
    /// Total point count
    pub point_count: usize,
    /// Version of the session format
    pub format_version: String,
}

impl SessionMetadata {
    /// Create new metadata for a session
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            started_at: Utc::now(),
            point_count: 0,
            format_version: CURRENT_FORMAT_VERSION.to_string(),
        }
    }
}

impl Default for SessionMetadata {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// A complete recorded point session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSession {
    /// Session metadata
    pub metadata: SessionMetadata,
    /// Ordered point records
    pub points: Vec<PointRecord>,
}

impl PointSession {
    /// Create a new empty session
    pub fn new(name: String) -> Self {
        Self {
            metadata: SessionMetadata::new(name),
            points: Vec::new(),
        }
    }

    /// Append a point record
    pub fn add_point(&mut self, record: PointRecord) {
        self.points.push(record);
        self.metadata.point_count = self.points.len();
    }

    /// Save the session to a file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a session from a file.
    ///
    /// Logs a warning when the file was saved with an unknown format
    /// version but still attempts to deserialize it (forward-compatible via
    /// `#[serde(default)]`).
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let session: PointSession = serde_json::from_str(&content)?;
        if session.metadata.format_version != CURRENT_FORMAT_VERSION {
            tracing::warn!(
                name = %session.metadata.name,
                found = %session.metadata.format_version,
                expected = CURRENT_FORMAT_VERSION,
                "Session has different format version; some fields may use default values"
            );
        }
        Ok(session)
    }

    /// Number of recorded points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the session holds no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Replay this session through a detector.
    ///
    /// Declares a session boundary first, then applies the streaming `push`
    /// contract to every record in order.
    pub fn replay(&self, detector: &mut Detector) -> SessionSummary {
        detector.clear();

        let mut decisions = 0usize;
        let mut macro_flags = 0usize;
        let mut error_sum = 0.0;
        let mut last: Option<ReplayOutcome> = None;

        for record in &self.points {
            if let Some(result) = detector.push(record) {
                decisions += 1;
                error_sum += result.raw_error;
                if !result.is_human {
                    macro_flags += 1;
                }
                last = Some(ReplayOutcome {
                    raw_error: result.raw_error,
                    threshold: result.threshold,
                    is_human: result.is_human,
                });
            }
        }

        SessionSummary {
            session: self.metadata.name.clone(),
            points_fed: self.points.len(),
            decisions,
            macro_flags,
            mean_raw_error: if decisions > 0 {
                error_sum / decisions as f64
            } else {
                0.0
            },
            last,
        }
    }
}

/// Final decision state of a replay
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReplayOutcome {
    pub raw_error: f64,
    pub threshold: f64,
    pub is_human: bool,
}

/// Aggregated result of replaying one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// Name of the replayed session
    pub session: String,
    /// Records fed through the detector
    pub points_fed: usize,
    /// Pushes that produced a verdict
    pub decisions: usize,
    /// Verdicts that flagged macro input
    pub macro_flags: usize,
    /// Mean smoothed reconstruction error across all decisions
    pub mean_raw_error: f64,
    /// The final decision, if any verdict was produced
    pub last: Option<ReplayOutcome>,
}

impl SessionSummary {
    /// Overall session verdict: human unless the final state was flagged
    pub fn is_human(&self) -> bool {
        self.last.map(|outcome| outcome.is_human).unwrap_or(true)
    }
}
