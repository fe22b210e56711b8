//! Latency distribution for successful transform calls.
//!
//! One [`LatencyHist`] is shared by every processor in the pool. Samples
//! are recorded in milliseconds into power-of-two buckets with a handful
//! of atomic operations, so recording stays O(1) and contention-friendly;
//! aggregation happens only when a [`snapshot`](LatencyHist::snapshot)
//! is taken.

use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;

/// Metric name for the transform latency distribution.
pub const TRANSFORM_LATENCY_METRIC: &str = "engine_gate/transform";

/// Number of log2 buckets: bucket 0 is 0ms, bucket n covers
/// `[2^(n-1), 2^n)` ms, with everything above the range clamped into the
/// last bucket.
const BUCKETS: usize = 32;

/// A thread-safe log2-bucketed distribution of call latencies.
pub struct LatencyHist {
   name: &'static str,
   count: AtomicU64,
   sum_ms: AtomicU64,
   min_ms: AtomicU64,
   max_ms: AtomicU64,
   buckets: [AtomicU64; BUCKETS],
}

/// A point-in-time copy of a [`LatencyHist`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencySnapshot {
   /// Metric name the histogram is keyed by.
   pub name: &'static str,
   /// Number of samples recorded.
   pub count: u64,
   /// Sum of all samples, in milliseconds.
   pub sum_ms: u64,
   /// Smallest sample, `None` if empty.
   pub min_ms: Option<u64>,
   /// Largest sample, `None` if empty.
   pub max_ms: Option<u64>,
   /// Per-bucket sample counts.
   pub buckets: [u64; BUCKETS],
}

impl LatencyHist {
   /// Creates an empty histogram keyed by
   /// [`TRANSFORM_LATENCY_METRIC`].
   pub const fn new() -> Self {
      Self::with_name(TRANSFORM_LATENCY_METRIC)
   }

   /// Creates an empty histogram with an explicit metric name.
   pub const fn with_name(name: &'static str) -> Self {
      #[allow(clippy::declare_interior_mutable_const)]
      const ZERO: AtomicU64 = AtomicU64::new(0);
      Self {
         name,
         count: AtomicU64::new(0),
         sum_ms: AtomicU64::new(0),
         min_ms: AtomicU64::new(u64::MAX),
         max_ms: AtomicU64::new(0),
         buckets: [ZERO; BUCKETS],
      }
   }

   /// Metric name the histogram is keyed by.
   pub fn name(&self) -> &'static str {
      self.name
   }

   /// Records one sample.
   pub fn record(&self, elapsed: Duration) {
      let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
      self.count.fetch_add(1, Ordering::Relaxed);
      self.sum_ms.fetch_add(ms, Ordering::Relaxed);
      self.min_ms.fetch_min(ms, Ordering::Relaxed);
      self.max_ms.fetch_max(ms, Ordering::Relaxed);
      self.buckets[Self::bucket_of(ms)].fetch_add(1, Ordering::Relaxed);
   }

   /// Bucket index for a millisecond value: 0 -> 0, otherwise
   /// `floor(log2(ms)) + 1`, clamped into range.
   #[inline]
   fn bucket_of(ms: u64) -> usize {
      ((u64::BITS - ms.leading_zeros()) as usize).min(BUCKETS - 1)
   }

   /// Takes a point-in-time copy of the distribution.
   pub fn snapshot(&self) -> LatencySnapshot {
      let count = self.count.load(Ordering::Relaxed);
      let min = self.min_ms.load(Ordering::Relaxed);
      let mut buckets = [0u64; BUCKETS];
      for (out, bucket) in buckets.iter_mut().zip(&self.buckets) {
         *out = bucket.load(Ordering::Relaxed);
      }
      LatencySnapshot {
         name: self.name,
         count,
         sum_ms: self.sum_ms.load(Ordering::Relaxed),
         min_ms: (count > 0).then_some(min),
         max_ms: (count > 0).then(|| self.max_ms.load(Ordering::Relaxed)),
         buckets,
      }
   }
}

impl Default for LatencyHist {
   fn default() -> Self {
      Self::new()
   }
}

impl LatencySnapshot {
   /// Mean latency in milliseconds, `None` if empty.
   pub fn mean_ms(&self) -> Option<f64> {
      (self.count > 0).then(|| self.sum_ms as f64 / self.count as f64)
   }
}
