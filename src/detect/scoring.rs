//! Reconstruction-error scoring
//!
//! Collapses a reconstruction/target pair into one scalar anomaly score.
//! Plain mean absolute error treats every element alike; here elements are
//! weighted by how statistically extreme the *target* was within its own
//! window:
//!
//! - `z > 2.0` — extreme human correction motion; down-weighted (0.1x) so a
//!   violent but genuine flick does not dominate the score
//! - `z < 0.2` — suspiciously uniform; up-weighted (8x), because sustained
//!   near-zero variance across a window is itself the primary macro
//!   signature
//!
//! One convention, applied consistently: extremes read as human, uniformity
//! reads as macro.

use ndarray::{ArrayView2, Axis};

/// Z-score above which an element counts as statistically extreme
pub const EXTREME_Z: f64 = 2.0;

/// Z-score below which an element counts as suspiciously static
pub const STATIC_Z: f64 = 0.2;

/// Weight applied to extreme elements
pub const EXTREME_WEIGHT: f64 = 0.1;

/// Weight applied to static elements
pub const STATIC_WEIGHT: f64 = 8.0;

/// Floor for the per-feature standard deviation used in z-scores
const STD_FLOOR: f64 = 1e-8;

/// Variance below this marks a feature as constant within the window;
/// its z-scores are forced to zero to avoid spurious weighting
const ZERO_VARIANCE: f64 = 1e-12;

/// Weighted mean absolute reconstruction error for one sequence.
///
/// Both tensors are `(seq_len, features)`. Non-finite values anywhere yield
/// a score of exactly 0.0 rather than propagating NaN into the decision
/// pipeline.
pub fn score_reconstruction(
    target: ArrayView2<'_, f64>,
    reconstruction: ArrayView2<'_, f64>,
) -> f64 {
    debug_assert_eq!(target.dim(), reconstruction.dim());

    if target.iter().any(|v| !v.is_finite()) || reconstruction.iter().any(|v| !v.is_finite()) {
        return 0.0;
    }

    let rows = target.nrows() as f64;
    let means = target.sum_axis(Axis(0)) / rows;
    let stds: Vec<f64> = target
        .columns()
        .into_iter()
        .zip(means.iter())
        .map(|(column, mean)| {
            let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / rows;
            if var < ZERO_VARIANCE {
                0.0
            } else {
                var.sqrt().max(STD_FLOOR)
            }
        })
        .collect();

    let mut total = 0.0;
    for (row_t, row_r) in target.rows().into_iter().zip(reconstruction.rows()) {
        for (c, (t, r)) in row_t.iter().zip(row_r.iter()).enumerate() {
            let z = if stds[c] == 0.0 {
                0.0
            } else {
                (t - means[c]).abs() / stds[c]
            };
            let weight = if z > EXTREME_Z {
                EXTREME_WEIGHT
            } else if z < STATIC_Z {
                STATIC_WEIGHT
            } else {
                1.0
            };
            total += (t - r).abs() * weight;
        }
    }

    total / (target.len() as f64)
}
