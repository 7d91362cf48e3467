//! Feature engineering
//!
//! Transforms raw point sequences into the statistical representations the
//! model consumes:
//! - per-sample kinematic features with a published, versioned schema
//! - robust per-feature normalization fit offline
//! - fixed-length sequence windows, with an optional chunk-statistics
//!   encoding that trades timing resolution for robustness

pub mod chunk_stats;
pub mod kinematics;
pub mod scaler;
pub mod schema;
pub mod sequence;

pub use kinematics::compute_features;
pub use scaler::RobustScaler;
pub use schema::{FEATURE_NAMES, NUM_FEATURES, SCHEMA_VERSION};
pub use sequence::{make_windows, WindowBatch};

use serde::{Deserialize, Serialize};

/// Table of feature rows, one per input point, columns in schema order.
pub type FeatureTable = ndarray::Array2<f64>;

/// How scaled per-sample features become model input rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    /// Window the scaled per-sample features directly
    #[default]
    Direct,
    /// Reduce to per-chunk shape statistics before windowing
    ChunkStats,
}

impl Encoding {
    /// Model input width implied by this encoding
    pub fn model_width(&self) -> usize {
        match self {
            Encoding::Direct => schema::NUM_FEATURES,
            Encoding::ChunkStats => schema::chunk_feature_count(),
        }
    }
}
