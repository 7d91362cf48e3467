//! Kinematic feature transform
//!
//! Derives the published per-sample feature set from a raw point sequence.
//! Scripted interpolation produces abnormally uniform derivative statistics
//! while human motion carries micro-tremor and correction noise, so the
//! columns here emphasize dispersion over small rolling windows alongside
//! the raw kinematics.
//!
//! Undefined values at sequence boundaries (differencing warm-up, incomplete
//! rolling windows) become neutral defaults rather than propagating NaN into
//! the model; this is a deliberate policy, not error recovery.

use crate::features::schema::{col, NUM_FEATURES};
use crate::features::FeatureTable;
use crate::ingest::point::Point;
use ndarray::Array2;
use std::f64::consts::PI;

/// Minimum inter-sample interval used for divisions (seconds)
pub const DT_FLOOR: f64 = 1e-3;

/// Window for rolling dispersion statistics
const ROLLING_WINDOW: usize = 5;

/// Window for the jerk sign-flip rate
const FLIP_WINDOW: usize = 8;

/// Floor for the straightness chord to keep the ratio bounded
const CHORD_FLOOR: f64 = 1e-6;

/// Straightness clip range: 1.0 is a perfectly straight path
const STRAIGHTNESS_MIN: f64 = 1.0;
const STRAIGHTNESS_MAX: f64 = 10.0;

/// Hard clamp applied to one feature column after computation.
///
/// Guards against distribution drift between training and inference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRange {
    pub min: f64,
    pub max: f64,
}

/// Resolved clip bounds: (column index, range) pairs
pub type ClipBounds = Vec<(usize, ClipRange)>;

/// Compute the published feature table for an ordered point sequence.
///
/// Returns one row per input point. Deterministic and idempotent: the same
/// input always yields bit-identical output.
pub fn compute_features(points: &[Point], clip: &ClipBounds) -> FeatureTable {
    let n = points.len();
    let mut table = Array2::zeros((n, NUM_FEATURES));
    if n == 0 {
        return table;
    }

    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    let dts: Vec<f64> = points.iter().map(|p| p.deltatime.max(DT_FLOOR)).collect();

    let dx = diff(&xs);
    let dy = diff(&ys);

    let dist: Vec<f64> = dx
        .iter()
        .zip(dy.iter())
        .map(|(a, b)| a.hypot(*b))
        .collect();

    let speed: Vec<f64> = dist.iter().zip(dts.iter()).map(|(d, dt)| d / dt).collect();
    let accel: Vec<f64> = diff(&speed)
        .iter()
        .zip(dts.iter())
        .map(|(d, dt)| d / dt)
        .collect();
    let jerk: Vec<f64> = diff(&accel)
        .iter()
        .zip(dts.iter())
        .map(|(d, dt)| d / dt)
        .collect();

    let angle: Vec<f64> = dx
        .iter()
        .zip(dy.iter())
        .map(|(a, b)| b.atan2(*a))
        .collect();
    let turn: Vec<f64> = diff(&angle).iter().map(|d| wrap_angle(*d)).collect();
    let angular_velocity: Vec<f64> =
        turn.iter().zip(dts.iter()).map(|(t, dt)| t / dt).collect();
    let angular_accel = diff(&angular_velocity);

    // Micro-tremor proxy: derivative noise in both speed and rotation
    let d_speed = diff(&speed);
    let d_ang_vel = diff(&angular_velocity);
    let shake_raw: Vec<f64> = d_speed
        .iter()
        .zip(d_ang_vel.iter())
        .map(|(s, a)| s.abs() + a.abs())
        .collect();
    let micro_shake = rolling_mean(&shake_raw, ROLLING_WINDOW);

    // Path length over the window vs the straight-line chord across it.
    // A window with no path at all stays exactly zero so degenerate
    // (non-moving) windows remain all-zero downstream.
    let path = rolling_sum(&dist, ROLLING_WINDOW);
    let mut straightness = vec![f64::NAN; n];
    for i in ROLLING_WINDOW..n {
        if !path[i].is_finite() {
            continue;
        }
        if path[i] == 0.0 {
            straightness[i] = 0.0;
        } else {
            let chord = (xs[i] - xs[i - ROLLING_WINDOW])
                .hypot(ys[i] - ys[i - ROLLING_WINDOW])
                .max(CHORD_FLOOR);
            straightness[i] = (path[i] / chord).clamp(STRAIGHTNESS_MIN, STRAIGHTNESS_MAX);
        }
    }

    let speed_var = rolling_std(&speed, ROLLING_WINDOW);
    let jerk_std = rolling_std(&jerk, ROLLING_WINDOW);

    let dt_std = rolling_std(&dts, ROLLING_WINDOW);
    let dt_mean = rolling_mean(&dts, ROLLING_WINDOW);
    let dt_cv: Vec<f64> = dt_std
        .iter()
        .zip(dt_mean.iter())
        .map(|(s, m)| s / m.max(DT_FLOOR))
        .collect();

    let d_accel_abs: Vec<f64> = diff(&accel).iter().map(|d| d.abs()).collect();
    let accel_smoothness = rolling_mean(&d_accel_abs, ROLLING_WINDOW);

    let jerk_flip_rate = flip_rate(&jerk, FLIP_WINDOW);

    let mut columns: [(usize, Vec<f64>); NUM_FEATURES] = [
        (col::DIST, dist),
        (col::SPEED, speed),
        (col::ACCEL, accel),
        (col::JERK, jerk),
        (col::TURN, turn),
        (col::ANGULAR_VELOCITY, angular_velocity),
        (col::ANGULAR_ACCEL, angular_accel),
        (col::MICRO_SHAKE, micro_shake),
        (col::STRAIGHTNESS, straightness),
        (col::SPEED_VAR, speed_var),
        (col::JERK_STD, jerk_std),
        (col::DT_CV, dt_cv),
        (col::ACCEL_SMOOTHNESS, accel_smoothness),
        (col::JERK_FLIP_RATE, jerk_flip_rate),
    ];

    // Compress heavy-tailed magnitude columns so outliers cannot dominate
    // the scaler statistics
    const LOG_COLUMNS: [usize; 7] = [
        col::SPEED,
        col::ACCEL,
        col::JERK,
        col::MICRO_SHAKE,
        col::SPEED_VAR,
        col::JERK_STD,
        col::ACCEL_SMOOTHNESS,
    ];
    for (index, values) in columns.iter_mut() {
        if LOG_COLUMNS.contains(index) {
            for v in values.iter_mut() {
                *v = signed_log(*v);
            }
        }
    }

    for (index, values) in columns.iter() {
        for (row, v) in values.iter().enumerate() {
            // NaN/inf from warm-up or degenerate math become exact zeros
            table[[row, *index]] = if v.is_finite() { *v } else { 0.0 };
        }
    }

    for (index, range) in clip.iter() {
        for row in 0..n {
            table[[row, *index]] = table[[row, *index]].clamp(range.min, range.max);
        }
    }

    table
}

/// Successive differences; the first element is undefined (NaN)
fn diff(values: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in 1..values.len() {
        out[i] = values[i] - values[i - 1];
    }
    out
}

/// Wrap an angular difference into (-pi, pi]
fn wrap_angle(delta: f64) -> f64 {
    let wrapped = (delta + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}

/// Sign-preserving log compression: sign(v) * ln(1 + |v|)
fn signed_log(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v.signum() * v.abs().ln_1p()
    }
}

/// Rolling mean over a trailing window; NaN until the window is complete
fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        out[i] = slice.iter().sum::<f64>() / window as f64;
    }
    out
}

/// Rolling sum over a trailing window; NaN until the window is complete
fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in (window - 1)..values.len() {
        out[i] = values[i + 1 - window..=i].iter().sum::<f64>();
    }
    out
}

/// Rolling sample standard deviation (ddof = 1) over a trailing window
fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var =
            slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window as f64 - 1.0);
        out[i] = var.sqrt();
    }
    out
}

/// Fraction of adjacent sign flips within a trailing window
fn flip_rate(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| !v.is_finite()) {
            continue;
        }
        let flips = slice
            .windows(2)
            .filter(|pair| pair[0] * pair[1] < 0.0)
            .count();
        out[i] = flips as f64 / (window as f64 - 1.0);
    }
    out
}
