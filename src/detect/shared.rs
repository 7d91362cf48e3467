//! Shared detector handle
//!
//! The detector's hot path is single-threaded by design: the ring and
//! rolling state are not safe for concurrent mutation. Hosts that feed
//! points from one thread while controlling the detector from another wrap
//! it in this handle, which serializes access through a mutex so no two
//! inference cycles for the same instance ever overlap.

use crate::detect::detector::{Detector, DetectorPhase, ReconstructionResult};
use crate::ingest::point::PointRecord;
use parking_lot::Mutex;
use std::sync::Arc;

/// Clonable, thread-safe handle around a [`Detector`]
#[derive(Clone)]
pub struct SharedDetector {
    inner: Arc<Mutex<Detector>>,
}

impl SharedDetector {
    /// Wrap a detector for multi-threaded use
    pub fn new(detector: Detector) -> Self {
        Self {
            inner: Arc::new(Mutex::new(detector)),
        }
    }

    /// Serialized [`Detector::push`]
    pub fn push(&self, record: &PointRecord) -> Option<ReconstructionResult> {
        self.inner.lock().push(record)
    }

    /// Serialized [`Detector::clear`]
    pub fn clear(&self) {
        self.inner.lock().clear()
    }

    /// Serialized [`Detector::phase`]
    pub fn phase(&self) -> DetectorPhase {
        self.inner.lock().phase()
    }

    /// Run a closure with exclusive access to the detector
    pub fn with<T>(&self, f: impl FnOnce(&mut Detector) -> T) -> T {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::detector::DetectorOptions;
    use crate::features::schema::{FEATURE_NAMES, NUM_FEATURES, SCHEMA_VERSION};
    use crate::features::scaler::RobustScaler;
    use crate::model::ReconstructionModel;
    use chrono::Utc;
    use ndarray::{Array2, ArrayView2};

    struct IdentityModel;

    impl ReconstructionModel for IdentityModel {
        fn input_width(&self) -> usize {
            NUM_FEATURES
        }
        fn reconstruct(&self, sequence: ArrayView2<'_, f64>) -> crate::Result<Array2<f64>> {
            Ok(sequence.to_owned())
        }
    }

    fn shared() -> SharedDetector {
        let scaler = RobustScaler {
            schema_version: SCHEMA_VERSION.to_string(),
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            centers: vec![0.0; NUM_FEATURES],
            scales: vec![1.0; NUM_FEATURES],
        };
        let options = DetectorOptions {
            seq_len: 8,
            stride: 1,
            buffer_slack: 2,
            ..DetectorOptions::default()
        };
        SharedDetector::new(Detector::new(options, scaler, Box::new(IdentityModel)).unwrap())
    }

    fn record(i: usize) -> PointRecord {
        PointRecord {
            timestamp: Utc::now(),
            x: (i as i32) * 5,
            y: (i as i32) % 7,
            deltatime: 0.05,
        }
    }

    #[test]
    fn test_push_through_handle() {
        let detector = shared();
        let capacity = detector.with(|d| d.capacity());

        let mut result = None;
        for i in 0..capacity {
            result = detector.push(&record(i));
        }
        assert!(result.is_some());
        assert_eq!(detector.phase(), DetectorPhase::Ready);
    }

    #[test]
    fn test_concurrent_producers_never_overlap_cycles() {
        let detector = shared();
        let capacity = detector.with(|d| d.capacity());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let detector = detector.clone();
                std::thread::spawn(move || {
                    for i in 0..capacity {
                        detector.push(&record(t * capacity + i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // All pushes landed; the ring is full and consistent
        assert_eq!(detector.phase(), DetectorPhase::Ready);
    }

    #[test]
    fn test_clear_through_handle() {
        let detector = shared();
        let capacity = detector.with(|d| d.capacity());
        for i in 0..capacity {
            detector.push(&record(i));
        }
        detector.clear();
        assert_eq!(detector.phase(), DetectorPhase::Filling);
    }
}
