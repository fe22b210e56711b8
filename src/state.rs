//! Internal synchronization primitive for the engine gate.
//!
//! This module implements the gate's state machine using a single packed
//! `AtomicU8` and futex-based waiting via `parking_lot_core`:
//! - Bit 0: READY   - Engine is initialized and published
//! - Bit 1: LOCKED  - An initialization attempt is in progress
//! - Bit 2: WAITING - At least one thread is parked on this attempt
//! - Bits 3-7: GENERATION - Attempt counter
//!
//! Every attempt ends by advancing the generation, whether it succeeded
//! (READY becomes set) or failed (all flags clear again). A parked waiter
//! that wakes to a new generation without READY therefore knows the
//! attempt it waited on failed, without ever competing to run the
//! initializer itself. This replaces a one-shot latch: a fresh attempt
//! always gets a fresh generation, so a reopened gate is never confused
//! with the gate of a failed attempt.

use core::mem;
use core::sync::atomic::{AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// Atomic state word for [`crate::EngineGate`].
#[repr(transparent)]
pub(crate) struct GateLock(AtomicU8);

/// Outcome of [`GateLock::claim`].
pub(crate) enum Claim<'a> {
   /// The engine is initialized; no work to do.
   Ready,
   /// The caller won the race and must run the initialization attempt.
   Initializer(InitGuard<'a>),
   /// Another thread holds the lock; the caller should park on this
   /// state snapshot.
   Contended(u8),
}

/// What a parked waiter sees after waking up.
pub(crate) enum Observation {
   /// The attempt succeeded; the engine is published.
   Ready,
   /// The generation advanced without READY: the attempt failed.
   AttemptFailed,
   /// Spurious wakeup; park again on the same snapshot.
   Unchanged,
}

impl GateLock {
   /// Bit flag: engine is initialized.
   const READY: u8 = 1;
   /// Bit flag: an initialization attempt holds the lock.
   const LOCKED: u8 = 2;
   /// Bit flag: at least one thread is parked.
   const WAITING: u8 = 4;
   /// Start of generation bits.
   const GEN_1: u8 = 8;
   /// Mask for generation bits.
   const GEN_MASK: u8 = !(Self::READY | Self::LOCKED | Self::WAITING);

   /// Calculates the next generation value based on the current state.
   #[inline(always)]
   const fn next_generation(current_state: u8) -> u8 {
      (current_state & Self::GEN_MASK).wrapping_add(Self::GEN_1) & Self::GEN_MASK
   }

   /// Creates a new state: not started, generation zero.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicU8::new(0))
   }

   /// Checks whether the READY flag is set.
   #[inline]
   pub(crate) fn is_ready(&self, ordering: Ordering) -> bool {
      self.0.load(ordering) & Self::READY != 0
   }

   /// Notifies all parked threads.
   #[inline]
   fn notify_all(&self) {
      // SAFETY: The address passed to unpark must match the address used
      // for park. We consistently use the address of the AtomicU8.
      unsafe {
         parking_lot_core::unpark_all(self.0.as_ptr() as usize, DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the calling thread while the state still equals `snapshot`.
   #[inline]
   pub(crate) fn park(&self, snapshot: u8) {
      // SAFETY: See safety comment in `notify_all`.
      unsafe {
         // park() re-checks the condition closure before sleeping, so a
         // state change between our last load and the park cannot become
         // a lost wakeup.
         let _ = parking_lot_core::park(
            self.0.as_ptr() as usize,
            || self.0.load(Ordering::Acquire) == snapshot,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// Classifies the state a waiter sees after waking from [`park`].
   ///
   /// Order matters: READY wins even if further attempts ran in the
   /// meantime, so a late waiter of a failed generation still observes
   /// success once a retry has completed.
   ///
   /// [`park`]: GateLock::park
   #[inline]
   pub(crate) fn observe(&self, snapshot: u8) -> Observation {
      let state = self.0.load(Ordering::Acquire);
      if state & Self::READY != 0 {
         Observation::Ready
      } else if state & Self::GEN_MASK != snapshot & Self::GEN_MASK {
         Observation::AttemptFailed
      } else {
         Observation::Unchanged
      }
   }

   /// Attempts to start an initialization attempt.
   ///
   /// The first caller to set LOCKED becomes the initializer and gets an
   /// [`InitGuard`]; everyone else is told the engine is ready or handed
   /// a snapshot to park on (with the WAITING flag set on their behalf).
   #[inline]
   pub(crate) fn claim(&self) -> Claim<'_> {
      loop {
         let current_state = self.0.load(Ordering::Acquire);
         // Fast path: already initialized?
         if current_state & Self::READY != 0 {
            return Claim::Ready;
         }

         // Try to acquire the lock if it's not held.
         if current_state & Self::LOCKED == 0 {
            let new_state = current_state | Self::LOCKED;
            match self.0.compare_exchange_weak(
               current_state,
               new_state,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Claim::Initializer(InitGuard::new(self)),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }

         // Lock is held by another thread. Make sure the WAITING flag is
         // set before we hand out the snapshot to park on.
         if current_state & Self::WAITING == 0 {
            let new_state = current_state | Self::WAITING;
            match self.0.compare_exchange_weak(
               current_state,
               new_state,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Claim::Contended(new_state),
               Err(_) => {
                  // CAS failed, retry the outer loop. The state might
                  // have changed (e.g. became READY).
                  std::hint::spin_loop();
                  continue;
               }
            }
         }
         return Claim::Contended(current_state);
      }
   }

   /// Sets READY, advances the generation and notifies waiters.
   ///
   /// Release ordering ensures that the write of the engine value
   /// happens-before any thread observing READY via an Acquire load.
   #[inline]
   fn finish_ready(&self) {
      let current_state = self.0.load(Ordering::Relaxed);
      let new_state = Self::READY | Self::next_generation(current_state);
      let prev_state = self.0.swap(new_state, Ordering::Release);
      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
   }

   /// Clears all flags, advances the generation and notifies waiters.
   ///
   /// Release ordering ensures the recorded failure happens-before a
   /// waiter observing the new generation.
   #[inline]
   fn finish_failed(&self) {
      let current_state = self.0.load(Ordering::Relaxed);
      let new_state = Self::next_generation(current_state);
      let prev_state = self.0.swap(new_state, Ordering::Release);
      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
   }
}

/// RAII guard held by the one thread running an initialization attempt.
///
/// The attempt ends exactly once, on every exit path: `open_ready` on
/// success, or `Drop` (explicit drop, early return or panic unwind) which
/// resets the state to not-started so a later call can retry. Either way
/// the generation advances and parked waiters are woken, so the gate can
/// never be left stuck in-progress.
pub(crate) struct InitGuard<'a> {
   state: &'a GateLock,
}

impl<'a> InitGuard<'a> {
   /// Creates a new guard. Assumes the LOCKED flag is already set.
   #[inline(always)]
   const fn new(state: &'a GateLock) -> Self {
      Self { state }
   }

   /// Marks the attempt as successful, publishing READY and waking
   /// waiters.
   #[inline(always)]
   pub(crate) fn open_ready(self) {
      self.state.finish_ready();
      mem::forget(self); // Prevent Drop from resetting the state.
   }
}

impl Drop for InitGuard<'_> {
   /// Called when the attempt failed or unwound: resets the state to
   /// not-started and wakes waiters so they can observe the failure.
   #[inline(always)]
   fn drop(&mut self) {
      self.state.finish_failed();
   }
}
