//! Frozen transformer autoencoder
//!
//! Inference-only forward pass for the trained sequence autoencoder: input
//! projection, sinusoidal positional encoding, a stack of post-norm encoder
//! blocks (multi-head self-attention + feed-forward), and an output
//! projection back to feature width. Dropout from training is inert here;
//! given identical weights and input the reconstruction is bit-identical.

use crate::model::artifact::{EncoderLayerWeights, LayerNormWeights, LinearWeights, ModelArtifact};
use crate::model::{ModelDims, ReconstructionModel};
use ndarray::{s, Array1, Array2, ArrayView2};

const LAYER_NORM_EPS: f64 = 1e-5;
const POSITIONAL_BASE: f64 = 10_000.0;

/// The production reconstruction model
pub struct TransformerAutoencoder {
    dims: ModelDims,
    input_proj: Dense,
    layers: Vec<EncoderLayer>,
    output_proj: Dense,
}

struct Dense {
    /// Stored transposed as (in, out) so the forward pass is one `dot`
    weight_t: Array2<f64>,
    bias: Array1<f64>,
}

impl Dense {
    fn from_weights(w: &LinearWeights) -> Self {
        let out_dim = w.weight.len();
        let in_dim = w.weight[0].len();
        let mut weight_t = Array2::zeros((in_dim, out_dim));
        for (o, row) in w.weight.iter().enumerate() {
            for (i, v) in row.iter().enumerate() {
                weight_t[[i, o]] = *v;
            }
        }
        Self {
            weight_t,
            bias: Array1::from_vec(w.bias.clone()),
        }
    }

    fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weight_t) + &self.bias
    }
}

struct Norm {
    gamma: Array1<f64>,
    beta: Array1<f64>,
}

impl Norm {
    fn from_weights(w: &LayerNormWeights) -> Self {
        Self {
            gamma: Array1::from_vec(w.gamma.clone()),
            beta: Array1::from_vec(w.beta.clone()),
        }
    }

    fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.clone();
        for mut row in out.rows_mut() {
            let mean = row.sum() / row.len() as f64;
            let var = row.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / row.len() as f64;
            let denom = (var + LAYER_NORM_EPS).sqrt();
            row.mapv_inplace(|v| (v - mean) / denom);
        }
        out * &self.gamma + &self.beta
    }
}

struct EncoderLayer {
    query: Dense,
    key: Dense,
    value: Dense,
    attn_out: Dense,
    norm_attn: Norm,
    ff_in: Dense,
    ff_out: Dense,
    norm_ff: Norm,
}

impl EncoderLayer {
    fn from_weights(w: &EncoderLayerWeights) -> Self {
        Self {
            query: Dense::from_weights(&w.attn_query),
            key: Dense::from_weights(&w.attn_key),
            value: Dense::from_weights(&w.attn_value),
            attn_out: Dense::from_weights(&w.attn_output),
            norm_attn: Norm::from_weights(&w.norm_attn),
            ff_in: Dense::from_weights(&w.feedforward_in),
            ff_out: Dense::from_weights(&w.feedforward_out),
            norm_ff: Norm::from_weights(&w.norm_feedforward),
        }
    }

    fn forward(&self, h: &Array2<f64>, num_heads: usize) -> Array2<f64> {
        let attended = self.self_attention(h, num_heads);
        let h = self.norm_attn.forward(&(h + &attended));

        let hidden = self.ff_in.forward(&h).mapv(|v| v.max(0.0));
        let ff = self.ff_out.forward(&hidden);
        self.norm_ff.forward(&(&h + &ff))
    }

    fn self_attention(&self, h: &Array2<f64>, num_heads: usize) -> Array2<f64> {
        let q = self.query.forward(h);
        let k = self.key.forward(h);
        let v = self.value.forward(h);

        let d_model = q.ncols();
        let head_dim = d_model / num_heads;
        let scale = (head_dim as f64).sqrt();

        let mut context = Array2::zeros(q.raw_dim());
        for head in 0..num_heads {
            let cols = head * head_dim..(head + 1) * head_dim;
            let qh = q.slice(s![.., cols.clone()]);
            let kh = k.slice(s![.., cols.clone()]);
            let vh = v.slice(s![.., cols.clone()]);

            let mut scores = qh.dot(&kh.t()) / scale;
            softmax_rows(&mut scores);

            context
                .slice_mut(s![.., cols])
                .assign(&scores.dot(&vh));
        }

        self.attn_out.forward(&context)
    }
}

/// Numerically stable row softmax
fn softmax_rows(scores: &mut Array2<f64>) {
    for mut row in scores.rows_mut() {
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
}

/// Standard sinusoidal positional encoding of shape (seq_len, d_model)
fn positional_encoding(seq_len: usize, d_model: usize) -> Array2<f64> {
    let mut pe = Array2::zeros((seq_len, d_model));
    for t in 0..seq_len {
        for i in 0..d_model / 2 {
            let rate = POSITIONAL_BASE.powf(2.0 * i as f64 / d_model as f64);
            let angle = t as f64 / rate;
            pe[[t, 2 * i]] = angle.sin();
            pe[[t, 2 * i + 1]] = angle.cos();
        }
    }
    pe
}

impl TransformerAutoencoder {
    /// Build the inference model from a validated weights artifact
    pub fn from_artifact(artifact: &ModelArtifact) -> crate::Result<Self> {
        artifact.validate()?;
        Ok(Self {
            dims: artifact.dims,
            input_proj: Dense::from_weights(&artifact.input_proj),
            layers: artifact
                .encoder_layers
                .iter()
                .map(EncoderLayer::from_weights)
                .collect(),
            output_proj: Dense::from_weights(&artifact.output_proj),
        })
    }

    /// Load the artifact file and build the model in one step
    pub fn load(path: &std::path::Path) -> crate::Result<Self> {
        let artifact = ModelArtifact::load(path)?;
        Self::from_artifact(&artifact)
    }

    /// Architecture dimensions
    pub fn dims(&self) -> &ModelDims {
        &self.dims
    }
}

impl ReconstructionModel for TransformerAutoencoder {
    fn input_width(&self) -> usize {
        self.dims.num_features
    }

    fn reconstruct(&self, sequence: ArrayView2<'_, f64>) -> crate::Result<Array2<f64>> {
        if sequence.ncols() != self.dims.num_features {
            return Err(crate::Error::Model(format!(
                "sequence width {} does not match model width {}",
                sequence.ncols(),
                self.dims.num_features
            )));
        }
        if sequence.nrows() == 0 {
            return Err(crate::Error::Model("empty sequence".to_string()));
        }

        let mut h = self.input_proj.forward(&sequence.to_owned());
        h += &positional_encoding(h.nrows(), self.dims.d_model);

        for layer in &self.layers {
            h = layer.forward(&h, self.dims.num_heads);
        }

        Ok(self.output_proj.forward(&h))
    }
}
