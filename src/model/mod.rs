//! Sequence reconstruction models
//!
//! The detector consumes a frozen sequence-to-sequence reconstruction model
//! through the [`ReconstructionModel`] seam: same-shape output, inference
//! mode only, deterministic for identical input and weights. Training,
//! architecture search, and hyperparameters live with the offline trainer
//! that produced the weights artifact.

pub mod artifact;
pub mod transformer;

pub use artifact::{ModelArtifact, ModelDims};
pub use transformer::TransformerAutoencoder;

use ndarray::{Array2, ArrayView2};

/// A frozen model that reconstructs a feature sequence.
pub trait ReconstructionModel: Send {
    /// Feature width the model was trained for
    fn input_width(&self) -> usize;

    /// Reconstruct a `(seq_len, features)` sequence into the same shape.
    ///
    /// Must be deterministic: no gradient state, no dropout stochasticity.
    fn reconstruct(&self, sequence: ArrayView2<'_, f64>) -> crate::Result<Array2<f64>>;
}
