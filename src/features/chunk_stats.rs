//! Chunk-statistics encoding
//!
//! Reduces the scaled per-sample feature stream to per-chunk shape
//! statistics before sequencing. A macro whose per-sample motion is
//! randomized can still expose itself through anomalously uniform block
//! statistics, so each overlapping chunk is summarized per feature by:
//!
//! - skewness of the chunk distribution
//! - entropy gap: the Gaussian entropy implied by the chunk's variance
//!   minus the empirically measured histogram entropy
//! - roughness: mean absolute first difference
//!
//! Output rows concatenate the three blocks `[skew | entropy_gap |
//! roughness]`, matching [`crate::features::schema::CHUNK_STAT_NAMES`].

use ndarray::{s, Array2, ArrayView2};
use std::f64::consts::{E, PI};

/// Number of histogram bins for the empirical entropy estimate
const ENTROPY_BINS: usize = 10;

const EPS: f64 = 1e-9;

/// Chunk partitioning parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    /// Raw samples per chunk
    pub chunk_size: usize,
    /// Step between chunk starts
    pub chunk_stride: usize,
    /// Rows skipped at the start to avoid cold-start distortion
    pub warmup: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            chunk_stride: 10,
            warmup: 10,
        }
    }
}

impl ChunkParams {
    /// Raw rows needed to produce `chunks` encoded rows
    pub fn rows_required(&self, chunks: usize) -> usize {
        self.warmup + self.chunk_size + (chunks.saturating_sub(1)) * self.chunk_stride
    }
}

/// Encode a scaled feature table into per-chunk statistics.
///
/// Returns `None` when the table is too short for a single chunk after the
/// warm-up offset. Output shape is `(num_chunks, 3 * features)`.
pub fn encode(table: ArrayView2<'_, f64>, params: &ChunkParams) -> Option<Array2<f64>> {
    assert!(params.chunk_size > 1, "chunk_size must exceed 1");
    assert!(params.chunk_stride > 0, "chunk_stride must be non-zero");

    let n = table.nrows().saturating_sub(params.warmup);
    if n < params.chunk_size {
        return None;
    }
    let trimmed = table.slice(s![params.warmup.., ..]);

    let features = trimmed.ncols();
    let num_chunks = (n - params.chunk_size) / params.chunk_stride + 1;
    let mut out = Array2::zeros((num_chunks, 3 * features));

    for chunk_idx in 0..num_chunks {
        let start = chunk_idx * params.chunk_stride;
        let chunk = trimmed.slice(s![start..start + params.chunk_size, ..]);

        for f in 0..features {
            let column: Vec<f64> = chunk.column(f).iter().copied().collect();
            let (skew, std) = skewness(&column);
            let gap = entropy_gap(&column, std);
            let rough = roughness(&column);

            out[[chunk_idx, f]] = skew;
            out[[chunk_idx, features + f]] = gap;
            out[[chunk_idx, 2 * features + f]] = rough;
        }
    }

    Some(out)
}

/// Skewness (population moments) and population std of a chunk column
fn skewness(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    let safe = std + EPS;
    let skew = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n / safe.powi(3);
    (skew, std)
}

/// Theoretical Gaussian entropy implied by the chunk variance minus the
/// measured histogram entropy, both in bits
fn entropy_gap(values: &[f64], std: f64) -> f64 {
    let safe = std + EPS;
    let theoretical = 0.5 * (2.0 * PI * E * safe * safe + EPS).log2();
    theoretical - histogram_entropy(values)
}

/// Shannon entropy of a fixed-bin histogram over the chunk range
fn histogram_entropy(values: &[f64]) -> f64 {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    if span <= 0.0 {
        // Every sample in one bin: zero entropy
        return 0.0;
    }

    let mut counts = [0usize; ENTROPY_BINS];
    for v in values {
        let mut bin = ((v - min) / span * ENTROPY_BINS as f64) as usize;
        if bin >= ENTROPY_BINS {
            bin = ENTROPY_BINS - 1;
        }
        counts[bin] += 1;
    }

    let total = values.len() as f64 + EPS;
    counts
        .iter()
        .filter(|c| **c > 0)
        .map(|c| {
            let p = *c as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Mean absolute first difference within the chunk
fn roughness(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .sum::<f64>()
        / (values.len() - 1) as f64
}
