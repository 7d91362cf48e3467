//! Detection logic
//!
//! Turns model reconstructions into verdicts: the weighted error score, the
//! adaptive threshold over a rolling error history, the strike-counter
//! hysteresis, and the detector state machine that orchestrates the whole
//! per-point inference cycle.

pub mod detector;
pub mod scoring;
pub mod shared;
pub mod strike;
pub mod threshold;

pub use detector::{Detector, DetectorOptions, DetectorPhase, ReconstructionResult};
pub use scoring::score_reconstruction;
pub use shared::SharedDetector;
pub use strike::StrikeCounter;
pub use threshold::ThresholdEstimator;
