//! Thread-safe, lazy, retryable initialization of a shared transform
//! engine, plus the per-item pipeline that feeds it.
//!
//! Many worker threads share one expensive, fallible engine. This crate
//! coordinates them:
//!
//! - [`EngineGate<E>`]: ensures the engine is initialized exactly once,
//!   on first use. The first caller runs the initialization; concurrent
//!   callers block (futex-based parking, no spinning) until it finishes.
//!   A failed attempt resets the gate, with its failure delivered to
//!   every thread that waited on it, so a later call can retry once the
//!   configuration is fixed.
//! - [`TransformProcessor`]: feeds items through the shared engine,
//!   routing each outcome to a success or error sink and recording a
//!   latency sample per successful call. A bad item never crashes its
//!   worker or stalls its peers.
//!
//! # Features
//!
//! - **Lock-free fast path**: once the engine is ready, reaching it
//!   requires a single atomic load.
//! - **Retry after failure**: the gate is generation-scoped; a failed
//!   attempt never leaves a permanently signaled latch behind.
//! - **Guaranteed release**: the initializer reopens the gate on every
//!   exit path, including panic unwind, so waiters cannot deadlock.
//! - **Split error worlds**: initialization failures are loud and
//!   fail-fast ([`InitError`]); per-item failures are quiet
//!   [`ErrorRecord`]s on the error sink.
//!
//! # Example
//!
//! ```rust
//! use engine_gate::{
//!    ConfigSource, Engine, EngineConfig, EngineError, EngineGate, Item,
//!    LatencyHist, LoadError, TransformProcessor, VecSink,
//! };
//!
//! struct UpperEngine;
//!
//! impl Engine for UpperEngine {
//!    fn initialize(&mut self, config: &str) -> Result<(), EngineError> {
//!       if config != "uppercase" {
//!          return Err("unknown configuration".into());
//!       }
//!       Ok(())
//!    }
//!
//!    fn transform(&self, data: &[u8]) -> Result<String, EngineError> {
//!       let text = std::str::from_utf8(data).map_err(EngineError::from)?;
//!       Ok(text.to_uppercase())
//!    }
//! }
//!
//! struct NoSource;
//!
//! impl ConfigSource for NoSource {
//!    fn load(&self, path: &str) -> Result<String, LoadError> {
//!       Err(LoadError::new(path, "source not available"))
//!    }
//! }
//!
//! // Inline configuration wins, so the source is never consulted.
//! let gate = EngineGate::new(UpperEngine, EngineConfig::from_text("uppercase"));
//! let engine = gate.ensure_ready(&NoSource).unwrap();
//!
//! let metrics = LatencyHist::new();
//! let successes = VecSink::new();
//! let failures = VecSink::new();
//! let processor = TransformProcessor::new(engine, &metrics, &successes, &failures);
//!
//! processor.process(&Item::with_id("a", "hello"));
//! assert_eq!(successes.take(), vec!["HELLO".to_string()]);
//! assert!(failures.is_empty());
//! assert_eq!(metrics.snapshot().count, 1);
//! ```

/// Engine configuration and the loading boundary.
mod config;

/// Boundary trait for the external engine.
mod engine;

/// Error taxonomy and structured error records.
mod error;

/// The initialization gate.
mod gate;

/// Latency distribution for successful transforms.
mod metrics;

/// Per-item transform pipeline.
mod processor;

/// Output sinks.
mod sink;

/// Internal synchronization state management.
mod state;

pub use config::{ConfigSource, EngineConfig, FsConfigSource};
pub use engine::Engine;
pub use error::{EngineError, ErrorRecord, InitError, LoadError};
pub use gate::EngineGate;
pub use metrics::{LatencyHist, LatencySnapshot, TRANSFORM_LATENCY_METRIC};
pub use processor::{Item, TransformProcessor, TRANSFORM_STEP};
pub use sink::{NullSink, RecordSink, VecSink};
