//! Error taxonomy for the gate and the per-item pipeline.
//!
//! Two failure worlds are kept deliberately distinct:
//!
//! - [`InitError`] is fail-fast: it propagates out of
//!   [`ensure_ready`](crate::EngineGate::ensure_ready) because a broken
//!   configuration is systemic. It is `Clone` because one failed attempt
//!   fans out to every thread that was parked on it.
//! - Per-item transform failures never propagate; they are converted into
//!   an [`ErrorRecord`] and routed to the error sink so the worker keeps
//!   going.

use core::fmt;

use thiserror::Error;

/// Error raised by the external transform engine.
///
/// The engine's own error types are out of scope here; they cross the
/// boundary as a boxed error.
pub type EngineError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure to fetch configuration text from a [`ConfigSource`].
///
/// [`ConfigSource`]: crate::ConfigSource
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to load configuration from `{path}`: {reason}")]
pub struct LoadError {
   /// The location the load was attempted from.
   pub path: String,
   /// Why the load failed.
   pub reason: String,
}

impl LoadError {
   pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
      Self {
         path: path.into(),
         reason: reason.into(),
      }
   }
}

/// Failure of a single initialization attempt.
///
/// The gate resets after producing one of these, so a later
/// [`ensure_ready`](crate::EngineGate::ensure_ready) call may retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
   /// Fetching the configuration text failed.
   #[error(transparent)]
   Load(#[from] LoadError),
   /// The engine rejected the configuration.
   #[error("engine rejected configuration: {0}")]
   Engine(String),
   /// The attempt ended without recording an outcome, e.g. the
   /// initializing thread panicked.
   #[error("initialization attempt ended before completing")]
   Aborted,
}

/// A structured record of one failure, routed to the error sink.
///
/// Immutable once constructed: built in one expression via
/// [`ErrorRecord::of`] and [`ErrorRecord::with_source`], then only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
   cause: String,
   step: &'static str,
   sources: Vec<String>,
}

impl ErrorRecord {
   /// Builds a record from any displayable failure and the name of the
   /// component it happened in. Pure construction, no I/O.
   pub fn of<C: fmt::Display + ?Sized>(cause: &C, step: &'static str) -> Self {
      Self {
         cause: cause.to_string(),
         step,
         sources: Vec::new(),
      }
   }

   /// Attaches the single source identifier (the failed item's id).
   #[must_use]
   pub fn with_source(mut self, id: impl Into<String>) -> Self {
      self.sources = vec![id.into()];
      self
   }

   /// Human-readable description of the failure.
   pub fn cause(&self) -> &str {
      &self.cause
   }

   /// Name of the component the failure originated in.
   pub fn step(&self) -> &'static str {
      self.step
   }

   /// Zero or one identifiers of the input that failed.
   pub fn sources(&self) -> &[String] {
      &self.sources
   }
}

impl fmt::Display for ErrorRecord {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "[{}] {}", self.step, self.cause)?;
      if let [id] = self.sources.as_slice() {
         write!(f, " (source: {id})")?;
      }
      Ok(())
   }
}
