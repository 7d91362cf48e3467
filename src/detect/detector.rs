//! Detector state machine
//!
//! Owns the full per-point inference cycle. Every accepted point lands in a
//! fixed-capacity ring; once the ring is full, each push runs
//! Feature -> Window -> Scale -> Infer -> Score -> Threshold -> Strike and
//! emits a [`ReconstructionResult`]. Below capacity the detector reports
//! "insufficient data" by returning `None`.
//!
//! A failed inference step is logged and skipped — the stream keeps
//! flowing. Malformed points are rejected at ingestion and never reach the
//! buffer.

use crate::detect::scoring::score_reconstruction;
use crate::detect::strike::StrikeCounter;
use crate::detect::threshold::ThresholdEstimator;
use crate::features::chunk_stats::{self, ChunkParams};
use crate::features::kinematics::{compute_features, ClipBounds};
use crate::features::scaler::RobustScaler;
use crate::features::sequence::make_windows;
use crate::features::{Encoding, FeatureTable};
use crate::ingest::point::{Point, PointRecord};
use crate::ingest::ring::PointRing;
use crate::model::ReconstructionModel;
use crate::telemetry::{TelemetryFrame, TelemetrySender};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Everything the detector needs beyond its artifacts.
///
/// Immutable after construction; built from the application config or
/// assembled directly by an embedding host.
#[derive(Debug, Clone)]
pub struct DetectorOptions {
    /// Rows per model sequence
    pub seq_len: usize,
    /// Step between window starts
    pub stride: usize,
    /// How scaled features become model input
    pub encoding: Encoding,
    /// Decision floor before enough history accumulates
    pub base_threshold: f64,
    /// Minimum inter-sample interval the producer emits (seconds)
    pub tolerance: f64,
    /// How long an anomalous streak is tolerated (seconds)
    pub allowance_secs: f64,
    /// Extra ring capacity beyond the windowing requirement
    pub buffer_slack: usize,
    /// Rolling mean window applied to raw scores before thresholding
    pub smoothing_window: usize,
    /// Rolling error history capacity
    pub error_history: usize,
    /// Multiplier on the scaled MAD in the dynamic threshold
    pub mad_scale: f64,
    /// Chunk-statistics parameters (used when `encoding` is `ChunkStats`)
    pub chunk: ChunkParams,
    /// Optional per-feature hard clamps, resolved to column indices
    pub clip_bounds: ClipBounds,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            seq_len: 300,
            stride: 50,
            encoding: Encoding::Direct,
            base_threshold: 0.8,
            tolerance: 0.05,
            allowance_secs: 0.2,
            buffer_slack: 5,
            smoothing_window: 15,
            error_history: 200,
            mad_scale: 5.0,
            chunk: ChunkParams::default(),
            clip_bounds: Vec::new(),
        }
    }
}

impl DetectorOptions {
    /// Ring capacity needed to produce at least one sequence
    pub fn ring_capacity(&self) -> usize {
        match self.encoding {
            Encoding::Direct => self.seq_len + self.buffer_slack,
            Encoding::ChunkStats => self.chunk.rows_required(self.seq_len) + self.buffer_slack,
        }
    }
}

/// Buffer state of the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorPhase {
    /// Below windowing capacity; every push returns no verdict
    Filling,
    /// Ring full; every push runs a complete inference cycle
    Ready,
}

/// The externally visible output of one inference step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReconstructionResult {
    /// Smoothed reconstruction error for the latest sequence
    pub raw_error: f64,
    /// Threshold the error was compared against
    pub threshold: f64,
    /// Temporally smoothed verdict
    pub is_human: bool,
    /// Current strike count behind the verdict
    pub strike_count: u32,
}

/// Streaming macro detector
pub struct Detector {
    options: DetectorOptions,
    scaler: RobustScaler,
    model: Box<dyn ReconstructionModel>,
    ring: PointRing,
    smoothing: VecDeque<f64>,
    threshold: ThresholdEstimator,
    strike: StrikeCounter,
    telemetry: Option<TelemetrySender>,
}

impl Detector {
    /// Assemble a detector from already-loaded components.
    ///
    /// Fails when the model width disagrees with the configured encoding or
    /// the scaler fails schema validation — a mismatched triple must never
    /// start scoring.
    pub fn new(
        options: DetectorOptions,
        scaler: RobustScaler,
        model: Box<dyn ReconstructionModel>,
    ) -> crate::Result<Self> {
        scaler.validate()?;
        let expected = options.encoding.model_width();
        if model.input_width() != expected {
            return Err(crate::Error::Schema(format!(
                "model expects {} features but the {:?} encoding produces {}",
                model.input_width(),
                options.encoding,
                expected
            )));
        }

        let ring = PointRing::with_capacity(options.ring_capacity());
        let threshold = ThresholdEstimator::new(
            options.base_threshold,
            options.error_history,
            options.mad_scale,
        );
        let strike = StrikeCounter::from_allowance(options.allowance_secs, options.tolerance);

        Ok(Self {
            options,
            scaler,
            model,
            ring,
            smoothing: VecDeque::new(),
            threshold,
            strike,
            telemetry: None,
        })
    }

    /// Load scaler and model artifacts per the application config and build
    /// the detector. Artifact problems are fatal here, with a diagnostic
    /// naming the offending file.
    pub fn from_artifacts(config: &crate::app::config::Config) -> crate::Result<Self> {
        let scaler = RobustScaler::load(&config.artifacts.scaler_path)?;
        let model =
            crate::model::transformer::TransformerAutoencoder::load(&config.artifacts.model_path)?;
        Self::new(config.detector_options()?, scaler, Box::new(model))
    }

    /// Attach the producer half of a telemetry channel
    pub fn attach_telemetry(&mut self, sender: TelemetrySender) {
        self.telemetry = Some(sender);
    }

    /// Feed one point. Returns a verdict once the buffer is warm, `None`
    /// while filling, and `None` (with a log entry) for rejected points or
    /// skipped steps.
    pub fn push(&mut self, record: &PointRecord) -> Option<ReconstructionResult> {
        let point = match Point::try_from_record(record) {
            Ok(point) => point,
            Err(e) => {
                warn!(error = %e, "rejected malformed point");
                return None;
            }
        };

        self.ring.push(point);
        if !self.ring.is_full() {
            return None;
        }

        match self.infer_step() {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "inference step failed; skipping sample");
                None
            }
        }
    }

    /// One complete inference cycle over the current buffer
    fn infer_step(&mut self) -> crate::Result<Option<ReconstructionResult>> {
        let points = self.ring.snapshot();
        let features = compute_features(&points, &self.options.clip_bounds);

        let sequence: FeatureTable = match self.options.encoding {
            Encoding::Direct => {
                // Degenerate windows are judged on raw features, then only
                // the surviving latest window is scaled
                let batch = make_windows(features.view(), self.options.seq_len, self.options.stride);
                debug!(
                    survivors = batch.survivors,
                    dropped = batch.dropped,
                    "windowed feature table"
                );
                match batch.latest() {
                    Some(window) => self.scaler.transform(window)?,
                    None => return Ok(None),
                }
            }
            Encoding::ChunkStats => {
                let scaled = self.scaler.transform(&features)?;
                let encoded = match chunk_stats::encode(scaled.view(), &self.options.chunk) {
                    Some(encoded) => encoded,
                    None => return Ok(None),
                };
                let batch = make_windows(encoded.view(), self.options.seq_len, self.options.stride);
                debug!(
                    survivors = batch.survivors,
                    dropped = batch.dropped,
                    "windowed chunk statistics"
                );
                match batch.latest() {
                    Some(window) => window.clone(),
                    None => return Ok(None),
                }
            }
        };

        let reconstruction = self.model.reconstruct(sequence.view())?;
        let raw = score_reconstruction(sequence.view(), reconstruction.view());
        self.threshold.record(raw);

        if self.smoothing.len() == self.options.smoothing_window {
            self.smoothing.pop_front();
        }
        self.smoothing.push_back(raw);
        let smoothed = self.smoothing.iter().sum::<f64>() / self.smoothing.len() as f64;

        let threshold = self.threshold.effective();
        let is_anomaly = smoothed > threshold;
        let strike_count = self.strike.record(is_anomaly);
        let is_human = self.strike.is_human();

        if let Some(telemetry) = self.telemetry.as_mut() {
            let last = sequence.nrows() - 1;
            telemetry.send(TelemetryFrame::Sample {
                features: sequence.row(last).to_vec(),
                raw_error: smoothed,
                threshold,
            });
        }

        Ok(Some(ReconstructionResult {
            raw_error: smoothed,
            threshold,
            is_human,
            strike_count,
        }))
    }

    /// Declare a session boundary: drop all rolling state, keep artifacts
    pub fn clear(&mut self) {
        self.ring.clear();
        self.smoothing.clear();
        self.threshold.clear();
        self.strike.clear();
        if let Some(telemetry) = self.telemetry.as_mut() {
            telemetry.send(TelemetryFrame::SessionBoundary);
        }
    }

    /// Current buffer state
    pub fn phase(&self) -> DetectorPhase {
        if self.ring.is_full() {
            DetectorPhase::Ready
        } else {
            DetectorPhase::Filling
        }
    }

    /// Points currently buffered
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    /// Points required before inference starts
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Strike limit the verdict is measured against
    pub fn strike_limit(&self) -> u32 {
        self.strike.limit()
    }

    /// Detector options in effect
    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }
}
