//! Configuration Management

use crate::detect::detector::DetectorOptions;
use crate::features::chunk_stats::ChunkParams;
use crate::features::kinematics::ClipRange;
use crate::features::{schema, Encoding};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Detector settings
    pub detector: DetectorConfig,
    /// Expected model architecture
    pub model: ModelConfig,
    /// Artifact locations
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    /// Telemetry settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Rows per model sequence
    pub seq_len: usize,
    /// Step between window starts
    pub stride: usize,
    /// Minimum inter-sample interval accepted by producers (seconds)
    pub tolerance: f64,
    /// Decision floor before enough error history accumulates
    pub base_threshold: f64,
    /// How long an anomalous streak is tolerated (seconds)
    pub allowance_secs: f64,
    /// Extra ring capacity beyond the windowing requirement
    pub buffer_slack: usize,
    /// Rolling mean window applied to raw scores
    pub smoothing_window: usize,
    /// Rolling error history capacity
    pub error_history: usize,
    /// Multiplier on the scaled MAD in the dynamic threshold
    pub mad_scale: f64,
    /// Feature encoding fed to the model
    pub encoding: Encoding,
    /// Raw samples per chunk (chunk-stats encoding)
    pub chunk_size: usize,
    /// Step between chunk starts
    pub chunk_stride: usize,
    /// Rows skipped before the first chunk
    pub chunk_warmup: usize,
    /// Optional per-feature hard clamps
    #[serde(default)]
    pub clip_bounds: BTreeMap<String, ClipBound>,
}

/// One configured clamp
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClipBound {
    pub min: f64,
    pub max: f64,
}

/// Expected architecture of the model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Embedding width
    pub d_model: usize,
    /// Encoder layers
    pub num_layers: usize,
    /// Attention heads per layer
    pub num_heads: usize,
    /// Feed-forward hidden width
    pub feedforward_dim: usize,
    /// Training-time dropout; inert at inference
    pub dropout: f64,
}

/// Artifact locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Frozen model weights
    pub model_path: PathBuf,
    /// Fitted scaler statistics
    pub scaler_path: PathBuf,
}

/// Telemetry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Emit telemetry frames at all
    pub enabled: bool,
    /// Ring capacity (power of 2)
    pub capacity: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            seq_len: 300,
            stride: 50,
            tolerance: 0.05,
            base_threshold: 0.8,
            allowance_secs: 0.2,
            buffer_slack: 5,
            smoothing_window: 15,
            error_history: 200,
            mad_scale: 5.0,
            encoding: Encoding::Direct,
            chunk_size: 50,
            chunk_stride: 10,
            chunk_warmup: 10,
            clip_bounds: BTreeMap::new(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            d_model: 128,
            num_layers: 3,
            num_heads: 4,
            feedforward_dim: 128,
            dropout: 0.3,
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        let dir = crate::app::cli::Cli::data_dir();
        Self {
            model_path: dir.join("model.json"),
            scaler_path: dir.join("scaler.json"),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 1024,
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        let d = &self.detector;
        if d.seq_len == 0 {
            return Err(crate::Error::Config("seq_len must be > 0".to_string()));
        }
        if d.stride == 0 || d.stride > d.seq_len {
            return Err(crate::Error::Config(format!(
                "stride must be in [1, seq_len], got {}",
                d.stride
            )));
        }
        if d.tolerance <= 0.0 {
            return Err(crate::Error::Config(format!(
                "tolerance must be > 0, got {}",
                d.tolerance
            )));
        }
        if d.base_threshold <= 0.0 {
            return Err(crate::Error::Config(format!(
                "base_threshold must be > 0, got {}",
                d.base_threshold
            )));
        }
        if d.allowance_secs < 0.0 {
            return Err(crate::Error::Config(format!(
                "allowance_secs must be >= 0, got {}",
                d.allowance_secs
            )));
        }
        if d.smoothing_window == 0 {
            return Err(crate::Error::Config(
                "smoothing_window must be > 0".to_string(),
            ));
        }
        if d.error_history < 100 {
            return Err(crate::Error::Config(format!(
                "error_history must be >= 100, got {}",
                d.error_history
            )));
        }
        if d.mad_scale <= 0.0 {
            return Err(crate::Error::Config(format!(
                "mad_scale must be > 0, got {}",
                d.mad_scale
            )));
        }
        if d.chunk_size < 2 {
            return Err(crate::Error::Config(format!(
                "chunk_size must be >= 2, got {}",
                d.chunk_size
            )));
        }
        if d.chunk_stride == 0 {
            return Err(crate::Error::Config("chunk_stride must be > 0".to_string()));
        }
        for (name, bound) in &d.clip_bounds {
            if schema::column_index(name).is_none() {
                return Err(crate::Error::Config(format!(
                    "clip_bounds names unknown feature '{}'",
                    name
                )));
            }
            if bound.min > bound.max {
                return Err(crate::Error::Config(format!(
                    "clip_bounds for '{}' has min {} > max {}",
                    name, bound.min, bound.max
                )));
            }
        }

        let m = &self.model;
        if m.d_model == 0 || m.num_layers == 0 || m.feedforward_dim == 0 {
            return Err(crate::Error::Config(
                "model dimensions must be non-zero".to_string(),
            ));
        }
        if m.num_heads == 0 || m.d_model % m.num_heads != 0 {
            return Err(crate::Error::Config(format!(
                "num_heads ({}) must divide d_model ({})",
                m.num_heads, m.d_model
            )));
        }
        if !(0.0..1.0).contains(&m.dropout) {
            return Err(crate::Error::Config(format!(
                "dropout must be in [0, 1), got {}",
                m.dropout
            )));
        }

        let t = &self.telemetry;
        if t.capacity == 0 || !t.capacity.is_power_of_two() {
            return Err(crate::Error::Config(format!(
                "telemetry capacity must be a power of 2, got {}",
                t.capacity
            )));
        }
        Ok(())
    }

    /// Resolve the detector-facing options from this config
    pub fn detector_options(&self) -> Result<DetectorOptions, crate::Error> {
        self.validate()?;
        let d = &self.detector;

        let mut clip_bounds = Vec::with_capacity(d.clip_bounds.len());
        for (name, bound) in &d.clip_bounds {
            let index = schema::column_index(name).ok_or_else(|| {
                crate::Error::Config(format!("clip_bounds names unknown feature '{}'", name))
            })?;
            clip_bounds.push((
                index,
                ClipRange {
                    min: bound.min,
                    max: bound.max,
                },
            ));
        }

        Ok(DetectorOptions {
            seq_len: d.seq_len,
            stride: d.stride,
            encoding: d.encoding,
            base_threshold: d.base_threshold,
            tolerance: d.tolerance,
            allowance_secs: d.allowance_secs,
            buffer_slack: d.buffer_slack,
            smoothing_window: d.smoothing_window,
            error_history: d.error_history,
            mad_scale: d.mad_scale,
            chunk: ChunkParams {
                chunk_size: d.chunk_size,
                chunk_stride: d.chunk_stride,
                warmup: d.chunk_warmup,
            },
            clip_bounds,
        })
    }

    /// Load config from file
    pub fn load(path: &PathBuf) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<(), crate::Error> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save to default location
    pub fn save_default(&self) -> Result<(), crate::Error> {
        self.save(&Self::default_path())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        crate::app::cli::Cli::data_dir().join("config.toml")
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.detector.seq_len, 300);
        assert_eq!(config.detector.encoding, Encoding::Direct);
    }

    #[test]
    fn test_config_serialization_sections() {
        let config = Config::default();
        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("[detector]"));
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[artifacts]"));
        assert!(toml_str.contains("[telemetry]"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut original = Config::default();
        original.detector.seq_len = 120;
        original.detector.encoding = Encoding::ChunkStats;
        original.model.d_model = 64;

        let toml_str = original.to_toml().unwrap();
        let loaded: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(loaded.detector.seq_len, 120);
        assert_eq!(loaded.detector.encoding, Encoding::ChunkStats);
        assert_eq!(loaded.model.d_model, 64);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.detector.base_threshold = 1.2;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.detector.base_threshold, 1.2);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.detector.stride = 0;
        // Serialize without validation, then reject at load
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_stride_must_not_exceed_seq_len() {
        let mut config = Config::default();
        config.detector.stride = config.detector.seq_len + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_heads_must_divide_d_model() {
        let mut config = Config::default();
        config.model.num_heads = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_telemetry_capacity_power_of_two() {
        let mut config = Config::default();
        config.telemetry.capacity = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_clip_feature_rejected() {
        let mut config = Config::default();
        config
            .detector
            .clip_bounds
            .insert("curvature".to_string(), ClipBound { min: 0.0, max: 1.0 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_clip_bounds_rejected() {
        let mut config = Config::default();
        config
            .detector
            .clip_bounds
            .insert("speed".to_string(), ClipBound { min: 2.0, max: 1.0 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_detector_options_resolves_clip_columns() {
        let mut config = Config::default();
        config
            .detector
            .clip_bounds
            .insert("speed".to_string(), ClipBound { min: -3.0, max: 3.0 });

        let options = config.detector_options().unwrap();
        assert_eq!(options.clip_bounds.len(), 1);
        assert_eq!(options.clip_bounds[0].0, schema::col::SPEED);
        assert_eq!(options.seq_len, 300);
    }

    #[test]
    fn test_detector_options_carries_chunk_params() {
        let mut config = Config::default();
        config.detector.encoding = Encoding::ChunkStats;
        config.detector.chunk_size = 40;
        config.detector.chunk_stride = 8;

        let options = config.detector_options().unwrap();
        assert_eq!(options.chunk.chunk_size, 40);
        assert_eq!(options.chunk.chunk_stride, 8);
        assert_eq!(options.encoding, Encoding::ChunkStats);
    }

    #[test]
    fn test_config_without_optional_sections_deserializes() {
        // A config file written before [artifacts]/[telemetry] existed
        let old = r#"
[detector]
seq_len = 300
stride = 50
tolerance = 0.05
base_threshold = 0.8
allowance_secs = 0.2
buffer_slack = 5
smoothing_window = 15
error_history = 200
mad_scale = 5.0
encoding = "direct"
chunk_size = 50
chunk_stride = 10
chunk_warmup = 10

[model]
d_model = 128
num_layers = 3
num_heads = 4
feedforward_dim = 128
dropout = 0.3
"#;
        let config: Config = toml::from_str(old).unwrap();
        assert!(config.telemetry.enabled);
        assert_eq!(config.telemetry.capacity, 1024);
    }

    #[test]
    fn test_dropout_bounds() {
        let mut config = Config::default();
        config.model.dropout = 1.0;
        assert!(config.validate().is_err());
        config.model.dropout = 0.0;
        assert!(config.validate().is_ok());
    }
}
