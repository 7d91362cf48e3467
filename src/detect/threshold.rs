//! Dynamic decision threshold
//!
//! Early in a session there is not enough history to estimate a user's
//! normal reconstruction noise, so a configured base threshold acts as the
//! floor. Once enough raw errors accumulate, a robust estimate
//! (median + k * MAD * 1.4826) adapts the boundary to the session's own
//! noise level. The dynamic estimate can only raise the floor, never lower
//! it.

use std::collections::VecDeque;

/// Consistency constant scaling MAD to a Gaussian-equivalent sigma
pub const MAD_CONSISTENCY: f64 = 1.4826;

/// History size at which the dynamic estimate switches on
pub const MIN_HISTORY: usize = 100;

/// Rolling error history with a robust adaptive threshold
#[derive(Debug)]
pub struct ThresholdEstimator {
    history: VecDeque<f64>,
    capacity: usize,
    base_threshold: f64,
    mad_scale: f64,
}

impl ThresholdEstimator {
    /// Create an estimator with the configured floor.
    ///
    /// `capacity` bounds the history (oldest errors evicted first);
    /// `mad_scale` is the `k` multiplier on the scaled MAD.
    pub fn new(base_threshold: f64, capacity: usize, mad_scale: f64) -> Self {
        assert!(capacity >= MIN_HISTORY, "history capacity below minimum");
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            base_threshold,
            mad_scale,
        }
    }

    /// Record one raw reconstruction error
    pub fn record(&mut self, raw_error: f64) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(raw_error);
    }

    /// The threshold currently in effect: `max(base, dynamic)`
    pub fn effective(&self) -> f64 {
        match self.dynamic() {
            Some(dynamic) => self.base_threshold.max(dynamic),
            None => self.base_threshold,
        }
    }

    /// The robust estimate, once enough history exists
    pub fn dynamic(&self) -> Option<f64> {
        if self.history.len() < MIN_HISTORY {
            return None;
        }
        let mut errors: Vec<f64> = self.history.iter().copied().collect();
        let med = median(&mut errors);
        let mut deviations: Vec<f64> = errors.iter().map(|e| (e - med).abs()).collect();
        let mad = median(&mut deviations);
        Some(med + self.mad_scale * mad * MAD_CONSISTENCY)
    }

    /// Configured floor
    pub fn base(&self) -> f64 {
        self.base_threshold
    }

    /// Number of recorded errors
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Check if no errors have been recorded
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Drop the history (new logical session)
    pub fn clear(&mut self) {
        self.history.clear();
    }
}

/// Median of a scratch slice (sorted in place)
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}
