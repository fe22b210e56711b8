//! Output channels the pipeline emits into but does not own.
//!
//! Successes and error records leave the processor through a
//! [`RecordSink`]. The trait is the seam the surrounding runtime plugs
//! its own channels into; [`VecSink`] collects in memory (handy in
//! tests), [`NullSink`] discards, and any `std::sync::mpsc::Sender` can
//! be used directly.

use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};

/// An output channel for one kind of record.
///
/// `emit` must never block indefinitely on other emitters and must never
/// panic the calling worker.
pub trait RecordSink<T>: Send + Sync {
   /// Emits one record into the channel.
   fn emit(&self, value: T);
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl<T> RecordSink<T> for NullSink {
   fn emit(&self, _value: T) {}
}

/// A sink that collects records in memory, in emission order.
#[derive(Debug, Default)]
pub struct VecSink<T> {
   values: Mutex<Vec<T>>,
}

impl<T> VecSink<T> {
   pub fn new() -> Self {
      Self {
         values: Mutex::new(Vec::new()),
      }
   }

   /// Number of records collected so far.
   pub fn len(&self) -> usize {
      self.lock().len()
   }

   pub fn is_empty(&self) -> bool {
      self.lock().is_empty()
   }

   /// Drains and returns everything collected so far.
   pub fn take(&self) -> Vec<T> {
      std::mem::take(&mut *self.lock())
   }

   fn lock(&self) -> std::sync::MutexGuard<'_, Vec<T>> {
      self.values.lock().unwrap_or_else(PoisonError::into_inner)
   }
}

impl<T: Send> RecordSink<T> for VecSink<T> {
   fn emit(&self, value: T) {
      self.lock().push(value);
   }
}

impl<T: Send> RecordSink<T> for mpsc::Sender<T> {
   fn emit(&self, value: T) {
      if self.send(value).is_err() {
         tracing::warn!("record sink receiver disconnected; dropping record");
      }
   }
}
