//! Pointer sample types
//!
//! [`PointRecord`] is the serialized wire/file form of one pointer movement
//! sample. [`Point`] is the validated in-pipeline form; constructing one is
//! the only path into the detector's buffer, so malformed samples are
//! rejected before they can corrupt downstream math.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One pointer movement sample as it arrives from a recorder or replay file.
///
/// `deltatime` is the elapsed time in seconds since the previous accepted
/// sample. Producers gate emission by the configured sampling tolerance, so
/// values below it normally indicate a misbehaving source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    /// Wall-clock capture time
    pub timestamp: DateTime<Utc>,
    /// Screen x coordinate (pixels)
    pub x: i32,
    /// Screen y coordinate (pixels)
    pub y: i32,
    /// Seconds since the previous accepted sample
    pub deltatime: f64,
}

impl PointRecord {
    /// Create a record stamped with the current time
    pub fn new(x: i32, y: i32, deltatime: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            x,
            y,
            deltatime,
        }
    }
}

/// A validated pointer sample. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    /// Seconds since the previous accepted point, always finite and >= 0
    pub deltatime: f64,
}

impl Point {
    /// Validate a record into a pipeline point.
    ///
    /// Rejects non-finite or negative `deltatime`. Coordinates are integral
    /// in the record, so they cannot be malformed beyond range, which `i32`
    /// already bounds.
    pub fn try_from_record(record: &PointRecord) -> crate::Result<Self> {
        if !record.deltatime.is_finite() || record.deltatime < 0.0 {
            return Err(crate::Error::Ingest(format!(
                "deltatime must be finite and non-negative, got {}",
                record.deltatime
            )));
        }
        Ok(Self {
            x: record.x as f64,
            y: record.y as f64,
            deltatime: record.deltatime,
        })
    }
}
