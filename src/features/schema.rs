//! Published feature schema
//!
//! One schema version is canonical per model generation. The scaler and
//! model artifacts both declare the version and column set they were trained
//! against; anything that disagrees with the list below is refused at load
//! rather than silently reordered, truncated, or padded.

/// Schema version baked into artifacts trained against this feature set
pub const SCHEMA_VERSION: &str = "v1";

/// Number of per-sample features
pub const NUM_FEATURES: usize = 14;

/// Per-sample feature names, in column order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "dist",
    "speed",
    "accel",
    "jerk",
    "turn",
    "angular_velocity",
    "angular_accel",
    "micro_shake",
    "straightness",
    "speed_var",
    "jerk_std",
    "dt_cv",
    "accel_smoothness",
    "jerk_flip_rate",
];

/// Column indices, kept next to the name list so reorderings cannot drift
pub mod col {
    pub const DIST: usize = 0;
    pub const SPEED: usize = 1;
    pub const ACCEL: usize = 2;
    pub const JERK: usize = 3;
    pub const TURN: usize = 4;
    pub const ANGULAR_VELOCITY: usize = 5;
    pub const ANGULAR_ACCEL: usize = 6;
    pub const MICRO_SHAKE: usize = 7;
    pub const STRAIGHTNESS: usize = 8;
    pub const SPEED_VAR: usize = 9;
    pub const JERK_STD: usize = 10;
    pub const DT_CV: usize = 11;
    pub const ACCEL_SMOOTHNESS: usize = 12;
    pub const JERK_FLIP_RATE: usize = 13;
}

/// Statistics derived per feature by the chunk encoder, in column-block order
pub const CHUNK_STAT_NAMES: [&str; 3] = ["skew", "entropy_gap", "roughness"];

/// Width of a chunk-encoded feature row
pub fn chunk_feature_count() -> usize {
    CHUNK_STAT_NAMES.len() * NUM_FEATURES
}

/// Resolve a feature name to its column index
pub fn column_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|n| *n == name)
}

/// Check an artifact's declared feature list against the published schema.
///
/// The names must match exactly, in order — a mismatch means the artifact
/// was trained against a different schema generation.
pub fn validate_names(version: &str, names: &[String]) -> crate::Result<()> {
    if version != SCHEMA_VERSION {
        return Err(crate::Error::Schema(format!(
            "artifact declares schema '{}', this build expects '{}'",
            version, SCHEMA_VERSION
        )));
    }
    if names.len() != NUM_FEATURES {
        return Err(crate::Error::Schema(format!(
            "artifact declares {} features, schema has {}",
            names.len(),
            NUM_FEATURES
        )));
    }
    for (i, (found, expected)) in names.iter().zip(FEATURE_NAMES.iter()).enumerate() {
        if found != expected {
            return Err(crate::Error::Schema(format!(
                "feature column {} is '{}', expected '{}'",
                i, found, expected
            )));
        }
    }
    Ok(())
}
