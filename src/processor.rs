//! Per-item transform pipeline.
//!
//! A [`TransformProcessor`] wraps one worker's view of the shared engine:
//! it feeds items through [`Engine::transform`], times each call, and
//! routes the outcome: transformed output to the success sink with one
//! latency sample, or an [`ErrorRecord`] to the error sink. A failing
//! item never stops the worker and never touches the shared engine
//! state; exactly one output is produced per item, never both, never
//! neither.

use std::time::Instant;

use crate::engine::Engine;
use crate::error::ErrorRecord;
use crate::metrics::LatencyHist;
use crate::sink::RecordSink;

/// Step label stamped on error records produced by the processor.
pub const TRANSFORM_STEP: &str = "TransformProcessor";

/// One unit of input data.
///
/// Immutable; created upstream and consumed exactly once by
/// [`TransformProcessor::process`]. The optional `id` identifies the
/// item in error records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
   id: Option<String>,
   data: Vec<u8>,
}

impl Item {
   /// An item with no identifier.
   pub fn new(data: impl Into<Vec<u8>>) -> Self {
      Self {
         id: None,
         data: data.into(),
      }
   }

   /// An item carrying a source identifier.
   pub fn with_id(id: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
      Self {
         id: Some(id.into()),
         data: data.into(),
      }
   }

   pub fn id(&self) -> Option<&str> {
      self.id.as_deref()
   }

   pub fn data(&self) -> &[u8] {
      &self.data
   }
}

/// A worker's per-item pipeline around the shared, initialized engine.
///
/// Holds no locks and adds no cross-worker coordination: `process` calls
/// on different workers only meet inside the engine, which is required
/// to support concurrent `transform` calls.
pub struct TransformProcessor<'a, E> {
   engine: &'a E,
   metrics: &'a LatencyHist,
   success: &'a dyn RecordSink<String>,
   errors: &'a dyn RecordSink<ErrorRecord>,
}

impl<'a, E: Engine> TransformProcessor<'a, E> {
   /// Wires a processor to an initialized engine, the shared latency
   /// histogram and the two output sinks.
   pub fn new(
      engine: &'a E,
      metrics: &'a LatencyHist,
      success: &'a dyn RecordSink<String>,
      errors: &'a dyn RecordSink<ErrorRecord>,
   ) -> Self {
      Self {
         engine,
         metrics,
         success,
         errors,
      }
   }

   /// Transforms one item, emitting exactly one output.
   ///
   /// On success the call latency is recorded and the transformed string
   /// goes to the success sink. On failure an [`ErrorRecord`], tagged
   /// with [`TRANSFORM_STEP`] and the item's id if any, goes to the
   /// error sink; no latency sample is recorded and the failure does not
   /// propagate to the caller.
   pub fn process(&self, item: &Item) {
      let start = Instant::now();
      match self.engine.transform(&item.data) {
         Ok(output) => {
            self.metrics.record(start.elapsed());
            self.success.emit(output);
         }
         Err(err) => {
            tracing::debug!(
               error = %err,
               id = item.id.as_deref().unwrap_or(""),
               "transform failed for item",
            );
            let mut record = ErrorRecord::of(err.as_ref(), TRANSFORM_STEP);
            if let Some(id) = &item.id {
               record = record.with_source(id.clone());
            }
            self.errors.emit(record);
         }
      }
   }
}
