//! Sequence windowing
//!
//! Slices a feature table into fixed-length, optionally strided windows.
//! Windows whose values are all exactly zero carry no motion at all and are
//! dropped — they are not a meaningful sample of either class. Streaming
//! decisions use only the most recent surviving window; the survivor count
//! is kept for diagnostics.

use ndarray::{s, Array2, ArrayView2};

/// Result of windowing one feature table
#[derive(Debug)]
pub struct WindowBatch {
    /// Surviving windows, oldest first, each of shape (seq_len, features)
    pub sequences: Vec<Array2<f64>>,
    /// Number of windows that survived the degenerate-window filter
    pub survivors: usize,
    /// Number of all-zero windows dropped
    pub dropped: usize,
}

impl WindowBatch {
    /// The most recent surviving window, if any
    pub fn latest(&self) -> Option<&Array2<f64>> {
        self.sequences.last()
    }
}

/// Emit one window per start index `i` stepping by `stride`, covering
/// `[i, i + seq_len)`, for `i` in `0..=n - seq_len`.
pub fn make_windows(table: ArrayView2<'_, f64>, seq_len: usize, stride: usize) -> WindowBatch {
    assert!(seq_len > 0, "seq_len must be non-zero");
    assert!(stride > 0, "stride must be non-zero");

    let n = table.nrows();
    let mut sequences = Vec::new();
    let mut dropped = 0;

    if n >= seq_len {
        let mut start = 0;
        while start + seq_len <= n {
            let window = table.slice(s![start..start + seq_len, ..]);
            if window.iter().all(|v| *v == 0.0) {
                dropped += 1;
            } else {
                sequences.push(window.to_owned());
            }
            start += stride;
        }
    }

    let survivors = sequences.len();
    WindowBatch {
        sequences,
        survivors,
        dropped,
    }
}
