//! Shared test doubles: a scriptable engine and an in-memory config
//! source.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use engine_gate::{ConfigSource, Engine, EngineError, LoadError};

/// Installs a fmt subscriber once so `RUST_LOG` can surface gate logging
/// in test output.
pub fn init_tracing() {
   use tracing_subscriber::EnvFilter;
   let _ = tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env())
      .with_test_writer()
      .try_init();
}

/// A fake engine with programmable initialization outcomes and a fixed
/// transform table.
///
/// Call counters and observed configs are handed out as `Arc`s so tests
/// can keep watching them after the engine moves into a gate.
#[derive(Debug)]
pub struct ScriptedEngine {
   init_outcomes: Mutex<VecDeque<Result<(), String>>>,
   init_calls: Arc<AtomicUsize>,
   init_delay: Duration,
   seen_configs: Arc<Mutex<Vec<String>>>,
   transforms: HashMap<Vec<u8>, Result<String, String>>,
}

impl ScriptedEngine {
   pub fn new() -> Self {
      Self {
         init_outcomes: Mutex::new(VecDeque::new()),
         init_calls: Arc::new(AtomicUsize::new(0)),
         init_delay: Duration::ZERO,
         seen_configs: Arc::new(Mutex::new(Vec::new())),
         transforms: HashMap::new(),
      }
   }

   /// Scripts the next `initialize` call to fail with `message`.
   /// Unscripted calls succeed.
   pub fn fail_next_init(self, message: &str) -> Self {
      self
         .init_outcomes
         .lock()
         .unwrap()
         .push_back(Err(message.to_string()));
      self
   }

   /// Makes every `initialize` call sleep first, to hold the gate open
   /// long enough for other threads to pile up on it.
   pub fn with_init_delay(mut self, delay: Duration) -> Self {
      self.init_delay = delay;
      self
   }

   /// Scripts `transform(input)` to succeed with `output`.
   pub fn transforms_to(mut self, input: &str, output: &str) -> Self {
      self
         .transforms
         .insert(input.as_bytes().to_vec(), Ok(output.to_string()));
      self
   }

   /// Scripts `transform(input)` to fail with `message`.
   pub fn fails_on(mut self, input: &str, message: &str) -> Self {
      self
         .transforms
         .insert(input.as_bytes().to_vec(), Err(message.to_string()));
      self
   }

   /// Handle on the number of `initialize` calls.
   pub fn init_calls(&self) -> Arc<AtomicUsize> {
      Arc::clone(&self.init_calls)
   }

   /// Handle on the configuration strings `initialize` received.
   pub fn seen_configs(&self) -> Arc<Mutex<Vec<String>>> {
      Arc::clone(&self.seen_configs)
   }
}

impl Engine for ScriptedEngine {
   fn initialize(&mut self, config: &str) -> Result<(), EngineError> {
      self.init_calls.fetch_add(1, Ordering::SeqCst);
      if !self.init_delay.is_zero() {
         thread::sleep(self.init_delay);
      }
      self.seen_configs.lock().unwrap().push(config.to_string());
      match self.init_outcomes.lock().unwrap().pop_front() {
         Some(Err(message)) => Err(message.into()),
         _ => Ok(()),
      }
   }

   fn transform(&self, data: &[u8]) -> Result<String, EngineError> {
      match self.transforms.get(data) {
         Some(Ok(output)) => Ok(output.clone()),
         Some(Err(message)) => Err(message.clone().into()),
         None => Err(format!("no transform scripted for {:?}", data).into()),
      }
   }
}

/// An in-memory [`ConfigSource`] that counts how often it is consulted.
pub struct MapSource {
   entries: HashMap<String, String>,
   load_calls: AtomicUsize,
}

impl MapSource {
   /// A source with no entries; every load fails.
   pub fn empty() -> Self {
      Self {
         entries: HashMap::new(),
         load_calls: AtomicUsize::new(0),
      }
   }

   /// A source with a single `path -> text` entry.
   pub fn with(path: &str, text: &str) -> Self {
      let mut source = Self::empty();
      source
         .entries
         .insert(path.to_string(), text.to_string());
      source
   }

   pub fn load_calls(&self) -> usize {
      self.load_calls.load(Ordering::SeqCst)
   }
}

impl ConfigSource for MapSource {
   fn load(&self, path: &str) -> Result<String, LoadError> {
      self.load_calls.fetch_add(1, Ordering::SeqCst);
      self
         .entries
         .get(path)
         .cloned()
         .ok_or_else(|| LoadError::new(path, "no such entry"))
   }
}
