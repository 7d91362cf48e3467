//! Best-effort telemetry channel
//!
//! Carries feature snapshots and scores toward a visualization host over a
//! lock-free SPSC ring. Emission is strictly non-blocking: when the ring is
//! full the frame is dropped and a counter incremented — drop-on-full is a
//! property of the sink, not an error. The detector never stalls on a slow
//! or absent consumer.

use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default ring capacity (must be a power of 2)
pub const DEFAULT_CAPACITY: usize = 1024;

/// One telemetry emission
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryFrame {
    /// A completed inference step
    Sample {
        /// Scaled feature row for the most recent point
        features: Vec<f64>,
        /// Smoothed reconstruction error
        raw_error: f64,
        /// Threshold in effect for the decision
        threshold: f64,
    },
    /// A new logical session was declared
    SessionBoundary,
}

/// Counters shared between both halves of the channel
#[derive(Debug, Default)]
pub struct TelemetryStats {
    /// Frames accepted into the ring
    pub emitted: AtomicU64,
    /// Frames dropped because the ring was full
    pub dropped: AtomicU64,
    /// Frames taken by the consumer
    pub consumed: AtomicU64,
}

/// Create a telemetry channel with the given capacity.
///
/// # Panics
/// Panics if capacity is not a power of 2.
pub fn channel(capacity: usize) -> (TelemetrySender, TelemetryReceiver) {
    assert!(
        capacity.is_power_of_two(),
        "Telemetry capacity must be a power of 2"
    );
    let (producer, consumer) = RingBuffer::new(capacity);
    let stats = Arc::new(TelemetryStats::default());
    (
        TelemetrySender {
            inner: producer,
            stats: Arc::clone(&stats),
        },
        TelemetryReceiver {
            inner: consumer,
            stats,
        },
    )
}

/// Producer half, owned by the detector
pub struct TelemetrySender {
    inner: Producer<TelemetryFrame>,
    stats: Arc<TelemetryStats>,
}

impl TelemetrySender {
    /// Push a frame without blocking. Returns false if it was dropped.
    #[inline]
    pub fn send(&mut self, frame: TelemetryFrame) -> bool {
        match self.inner.push(frame) {
            Ok(()) => {
                self.stats.emitted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Shared counters
    pub fn stats(&self) -> Arc<TelemetryStats> {
        Arc::clone(&self.stats)
    }
}

/// Consumer half, owned by the visualization host
pub struct TelemetryReceiver {
    inner: Consumer<TelemetryFrame>,
    stats: Arc<TelemetryStats>,
}

impl TelemetryReceiver {
    /// Take the next frame, if any
    #[inline]
    pub fn recv(&mut self) -> Option<TelemetryFrame> {
        match self.inner.pop() {
            Ok(frame) => {
                self.stats.consumed.fetch_add(1, Ordering::Relaxed);
                Some(frame)
            }
            Err(_) => None,
        }
    }

    /// Take up to `max` frames at once
    pub fn recv_batch(&mut self, max: usize) -> Vec<TelemetryFrame> {
        let mut batch = Vec::with_capacity(max);
        for _ in 0..max {
            match self.recv() {
                Some(frame) => batch.push(frame),
                None => break,
            }
        }
        batch
    }

    /// Frames currently waiting in the ring
    pub fn available(&self) -> usize {
        self.inner.slots()
    }

    /// Shared counters
    pub fn stats(&self) -> Arc<TelemetryStats> {
        Arc::clone(&self.stats)
    }
}
