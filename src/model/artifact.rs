//! Model weights artifact
//!
//! Serialized form of the frozen autoencoder: architecture dimensions plus
//! every weight matrix, produced by the offline trainer. Loading validates
//! the declared schema version and all matrix shapes before any inference
//! can run — an incompatible artifact must abort startup, not fall back to
//! an untrained state.

use crate::features::schema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Architecture dimensions the weights were trained with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelDims {
    /// Width of one input feature row
    pub num_features: usize,
    /// Embedding width
    pub d_model: usize,
    /// Attention heads per layer
    pub num_heads: usize,
    /// Encoder layers
    pub num_layers: usize,
    /// Feed-forward hidden width
    pub feedforward_dim: usize,
    /// Training-time dropout; inert at inference
    pub dropout: f64,
}

/// Dense layer weights: `weight[out][in]` plus a bias per output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearWeights {
    pub weight: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl LinearWeights {
    /// All-zero weights of the given shape
    pub fn zeroed(out_dim: usize, in_dim: usize) -> Self {
        Self {
            weight: vec![vec![0.0; in_dim]; out_dim],
            bias: vec![0.0; out_dim],
        }
    }

    fn check_shape(&self, name: &str, out_dim: usize, in_dim: usize) -> crate::Result<()> {
        if self.weight.len() != out_dim
            || self.weight.iter().any(|row| row.len() != in_dim)
            || self.bias.len() != out_dim
        {
            return Err(crate::Error::Artifact(format!(
                "{} weights are not {}x{}",
                name, out_dim, in_dim
            )));
        }
        Ok(())
    }
}

/// Per-row normalization parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerNormWeights {
    pub gamma: Vec<f64>,
    pub beta: Vec<f64>,
}

impl LayerNormWeights {
    /// Identity normalization (gamma 1, beta 0)
    pub fn identity(dim: usize) -> Self {
        Self {
            gamma: vec![1.0; dim],
            beta: vec![0.0; dim],
        }
    }

    fn check_shape(&self, name: &str, dim: usize) -> crate::Result<()> {
        if self.gamma.len() != dim || self.beta.len() != dim {
            return Err(crate::Error::Artifact(format!(
                "{} normalization is not width {}",
                name, dim
            )));
        }
        Ok(())
    }
}

/// One encoder block: self-attention projections + feed-forward + norms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderLayerWeights {
    pub attn_query: LinearWeights,
    pub attn_key: LinearWeights,
    pub attn_value: LinearWeights,
    pub attn_output: LinearWeights,
    pub norm_attn: LayerNormWeights,
    pub feedforward_in: LinearWeights,
    pub feedforward_out: LinearWeights,
    pub norm_feedforward: LayerNormWeights,
}

impl EncoderLayerWeights {
    /// All-zero block with identity norms
    pub fn zeroed(dims: &ModelDims) -> Self {
        let d = dims.d_model;
        Self {
            attn_query: LinearWeights::zeroed(d, d),
            attn_key: LinearWeights::zeroed(d, d),
            attn_value: LinearWeights::zeroed(d, d),
            attn_output: LinearWeights::zeroed(d, d),
            norm_attn: LayerNormWeights::identity(d),
            feedforward_in: LinearWeights::zeroed(dims.feedforward_dim, d),
            feedforward_out: LinearWeights::zeroed(d, dims.feedforward_dim),
            norm_feedforward: LayerNormWeights::identity(d),
        }
    }
}

/// The complete frozen-model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Feature schema the model was trained against
    pub schema_version: String,
    pub dims: ModelDims,
    pub input_proj: LinearWeights,
    pub encoder_layers: Vec<EncoderLayerWeights>,
    pub output_proj: LinearWeights,
}

impl ModelArtifact {
    /// A structurally valid all-zero artifact; useful as a scaffold for
    /// tooling and tests, not for detection.
    pub fn zeroed(dims: ModelDims) -> Self {
        Self {
            schema_version: schema::SCHEMA_VERSION.to_string(),
            input_proj: LinearWeights::zeroed(dims.d_model, dims.num_features),
            encoder_layers: (0..dims.num_layers)
                .map(|_| EncoderLayerWeights::zeroed(&dims))
                .collect(),
            output_proj: LinearWeights::zeroed(dims.num_features, dims.d_model),
            dims,
        }
    }

    /// Load and validate a weights artifact
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Artifact(format!("cannot read model {}: {}", path.display(), e))
        })?;
        let artifact: Self = serde_json::from_str(&content)
            .map_err(|e| crate::Error::Artifact(format!("malformed model artifact: {}", e)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Persist the artifact as JSON
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check schema version, dimension sanity, and every matrix shape
    pub fn validate(&self) -> crate::Result<()> {
        if self.schema_version != schema::SCHEMA_VERSION {
            return Err(crate::Error::Schema(format!(
                "model declares schema '{}', this build expects '{}'",
                self.schema_version,
                schema::SCHEMA_VERSION
            )));
        }

        let d = &self.dims;
        if d.num_features == 0 || d.d_model == 0 || d.num_layers == 0 || d.feedforward_dim == 0 {
            return Err(crate::Error::Artifact(
                "model dimensions must be non-zero".to_string(),
            ));
        }
        if d.num_heads == 0 || d.d_model % d.num_heads != 0 {
            return Err(crate::Error::Artifact(format!(
                "num_heads ({}) must divide d_model ({})",
                d.num_heads, d.d_model
            )));
        }
        if !(0.0..1.0).contains(&d.dropout) {
            return Err(crate::Error::Artifact(format!(
                "dropout must be in [0, 1), got {}",
                d.dropout
            )));
        }

        self.input_proj
            .check_shape("input projection", d.d_model, d.num_features)?;
        self.output_proj
            .check_shape("output projection", d.num_features, d.d_model)?;

        if self.encoder_layers.len() != d.num_layers {
            return Err(crate::Error::Artifact(format!(
                "artifact has {} encoder layers, dims declare {}",
                self.encoder_layers.len(),
                d.num_layers
            )));
        }
        for (i, layer) in self.encoder_layers.iter().enumerate() {
            let tag = format!("layer {}", i);
            layer
                .attn_query
                .check_shape(&format!("{} query", tag), d.d_model, d.d_model)?;
            layer
                .attn_key
                .check_shape(&format!("{} key", tag), d.d_model, d.d_model)?;
            layer
                .attn_value
                .check_shape(&format!("{} value", tag), d.d_model, d.d_model)?;
            layer
                .attn_output
                .check_shape(&format!("{} attention output", tag), d.d_model, d.d_model)?;
            layer
                .norm_attn
                .check_shape(&format!("{} attention", tag), d.d_model)?;
            layer.feedforward_in.check_shape(
                &format!("{} feed-forward in", tag),
                d.feedforward_dim,
                d.d_model,
            )?;
            layer.feedforward_out.check_shape(
                &format!("{} feed-forward out", tag),
                d.d_model,
                d.feedforward_dim,
            )?;
            layer
                .norm_feedforward
                .check_shape(&format!("{} feed-forward", tag), d.d_model)?;
        }
        Ok(())
    }
}
