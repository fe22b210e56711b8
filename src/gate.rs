//! Lazy, retryable one-time initialization of a shared engine.
//!
//! [`EngineGate`] owns the engine for its whole lifetime. It starts out
//! holding the raw engine plus its unresolved configuration, and on first
//! demand exactly one caller resolves the configuration, initializes the
//! engine and publishes it; every other concurrent caller parks (futex
//! wait, no spinning) until that attempt ends. A failed attempt resets
//! the gate so a later call can retry, and hands the failure to every
//! caller that waited on it.

use core::cell::UnsafeCell;
use core::fmt;
use core::mem;
use core::sync::atomic::Ordering;
use std::sync::{Mutex, PoisonError};

use crate::config::{ConfigSource, EngineConfig};
use crate::engine::Engine;
use crate::error::InitError;
use crate::state::{Claim, GateLock, InitGuard, Observation};

/// What the engine slot currently holds.
enum Slot<E> {
   /// Not initialized yet: the raw engine and its unresolved
   /// configuration, waiting for the first caller.
   Pending { engine: E, config: EngineConfig },
   /// Transient state while the initializer moves the engine from
   /// `Pending` to `Ready`; never observable outside that window.
   Vacant,
   /// Initialized and published; read-only from here on.
   Ready(E),
}

/// Coordinates one-time, retryable initialization of an engine shared by
/// many worker threads.
///
/// Lifecycle per attempt: not-started -> in-progress -> ready, or back to
/// not-started on failure. Once ready, the gate stays ready for the rest
/// of its lifetime and [`ensure_ready`](EngineGate::ensure_ready) is a
/// lock-free read.
pub struct EngineGate<E> {
   lock: GateLock,
   slot: UnsafeCell<Slot<E>>,
   /// Outcome of the most recent failed attempt, handed to its waiters.
   failure: Mutex<Option<InitError>>,
}

// SAFETY:
// `&EngineGate<E>` hands out `&E` across threads once ready, so `E: Sync`
// is required; `E: Send` because the engine moves from the constructing
// thread to whichever thread runs the initializer and finally drops it.
// All slot mutation happens under the gate's lock discipline.
unsafe impl<E: Send + Sync> Sync for EngineGate<E> {}
// SAFETY: `EngineGate<E>` owns `E` and can move with it between threads.
unsafe impl<E: Send> Send for EngineGate<E> {}

impl<E: Engine> EngineGate<E> {
   /// Creates a gate around a raw (uninitialized) engine and the
   /// configuration it will be initialized with on first use.
   pub fn new(engine: E, config: EngineConfig) -> Self {
      Self {
         lock: GateLock::new(),
         slot: UnsafeCell::new(Slot::Pending { engine, config }),
         failure: Mutex::new(None),
      }
   }

   /// Checks whether the engine has been initialized. Never blocks.
   #[inline]
   pub fn is_ready(&self) -> bool {
      self.lock.is_ready(Ordering::Acquire)
   }

   /// Returns the initialized engine, or `None` if initialization has
   /// not completed. Never blocks.
   #[inline]
   pub fn engine(&self) -> Option<&E> {
      if self.is_ready() {
         // SAFETY: READY was observed with Acquire ordering.
         Some(unsafe { self.engine_unchecked() })
      } else {
         None
      }
   }

   /// Makes sure the engine is initialized, then returns it.
   ///
   /// Callable concurrently by any number of threads:
   ///
   /// - The first caller resolves the configuration (inline text wins
   ///   over `source`), runs [`Engine::initialize`] and publishes the
   ///   engine. On failure it returns the error (fail-fast) and the gate
   ///   resets so a subsequent call retries.
   /// - Concurrent callers park until the attempt ends, then return
   ///   `Ok(&engine)` or that attempt's error.
   /// - Once ready, returns immediately without blocking, forever.
   #[inline]
   pub fn ensure_ready<S>(&self, source: &S) -> Result<&E, InitError>
   where
      S: ConfigSource + ?Sized,
   {
      if self.is_ready() {
         // SAFETY: READY was observed with Acquire ordering.
         return Ok(unsafe { self.engine_unchecked() });
      }
      self.ensure_ready_slow(source)
   }

   /// Cold path: become the initializer or wait for the current one.
   #[cold]
   fn ensure_ready_slow<S>(&self, source: &S) -> Result<&E, InitError>
   where
      S: ConfigSource + ?Sized,
   {
      match self.lock.claim() {
         // SAFETY: `claim` observed READY with Acquire ordering.
         Claim::Ready => Ok(unsafe { self.engine_unchecked() }),
         Claim::Initializer(guard) => self.run_attempt(guard, source),
         Claim::Contended(snapshot) => {
            tracing::info!("waiting for engine initialization to finish");
            loop {
               self.lock.park(snapshot);
               match self.lock.observe(snapshot) {
                  // SAFETY: READY observed with Acquire ordering.
                  Observation::Ready => return Ok(unsafe { self.engine_unchecked() }),
                  Observation::AttemptFailed => return Err(self.recorded_failure()),
                  Observation::Unchanged => {}
               }
            }
         }
      }
   }

   /// Runs one initialization attempt as the lock holder.
   ///
   /// The engine stays in the slot while `initialize` runs, so a panic
   /// unwinding through here leaves the slot `Pending` and the guard's
   /// drop reopens the gate for a retry.
   fn run_attempt<S>(&self, guard: InitGuard<'_>, source: &S) -> Result<&E, InitError>
   where
      S: ConfigSource + ?Sized,
   {
      tracing::info!("initializing the transform engine");
      // SAFETY: We hold the lock, so we have exclusive slot access.
      let slot = unsafe { &mut *self.slot.get() };
      let (engine, config) = match slot {
         Slot::Pending { engine, config } => (engine, config),
         _ => unreachable!("claimed the gate but the engine is not pending"),
      };

      let outcome = config
         .resolve(source)
         .and_then(|text| {
            engine
               .initialize(&text)
               .map_err(|e| InitError::Engine(e.to_string()))
         });

      match outcome {
         Ok(()) => {
            // Move the engine into its published position. No panic is
            // possible between these two statements, so `Vacant` never
            // escapes.
            let Slot::Pending { engine, .. } = mem::replace(slot, Slot::Vacant) else {
               unreachable!("pending slot vanished while locked");
            };
            *slot = Slot::Ready(engine);
            *self.failure_slot() = None;
            guard.open_ready();
            // SAFETY: The slot now holds `Ready` and we just published it.
            Ok(unsafe { self.engine_unchecked() })
         }
         Err(err) => {
            tracing::error!(error = %err, "unable to initialize the transform engine");
            // Record the failure before the guard's drop advances the
            // generation; the Release swap there orders this write
            // before any waiter observing the failed generation.
            *self.failure_slot() = Some(err.clone());
            drop(guard); // Reopen the gate and wake waiters.
            Err(err)
         }
      }
   }

   /// The error recorded by the attempt that just failed.
   fn recorded_failure(&self) -> InitError {
      self.failure_slot().clone().unwrap_or(InitError::Aborted)
   }

   fn failure_slot(&self) -> std::sync::MutexGuard<'_, Option<InitError>> {
      self.failure.lock().unwrap_or_else(PoisonError::into_inner)
   }

   /// Returns the published engine.
   ///
   /// # Safety
   ///
   /// The caller must have observed READY with Acquire ordering; the
   /// Release publication in the initializer guarantees the slot then
   /// holds `Ready` and is never written again.
   unsafe fn engine_unchecked(&self) -> &E {
      match &*self.slot.get() {
         Slot::Ready(engine) => engine,
         _ => unreachable!("gate is ready but holds no engine"),
      }
   }
}

impl<E: Engine + fmt::Debug> fmt::Debug for EngineGate<E> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("EngineGate");
      match self.engine() {
         Some(engine) => d.field(engine),
         None => d.field(&format_args!("<uninit>")),
      };
      d.finish()
   }
}
