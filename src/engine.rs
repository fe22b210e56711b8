//! Boundary trait for the external transform engine.

use crate::error::EngineError;

/// An expensive, fallible transform engine shared by a pool of workers.
///
/// The crate does not define what the engine actually does; it only
/// coordinates access to it. Implementations must uphold:
///
/// - `initialize` is called at most once per successful lifetime of a
///   gate; the gate guarantees exclusive access (`&mut self`) while it
///   runs, and may call it again on the same instance after a failed
///   attempt.
/// - `transform` must be safe for concurrent calls once `initialize` has
///   returned `Ok` (enforced here by `&self` plus the `Sync` bound); the
///   gate adds no locking of its own after the engine is published.
pub trait Engine: Send + Sync {
   /// Applies the configuration, making the engine usable.
   fn initialize(&mut self, config: &str) -> Result<(), EngineError>;

   /// Transforms one input payload into an output string.
   fn transform(&self, data: &[u8]) -> Result<String, EngineError>;
}
