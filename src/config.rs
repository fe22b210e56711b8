//! Engine configuration and the boundary for loading it.
//!
//! A configuration is either supplied verbatim as text or named by a
//! path resolved through a [`ConfigSource`]. The precedence rule is
//! fixed: non-empty inline text always wins, and the source is consulted
//! only when no inline text was given.

use crate::error::{InitError, LoadError};

/// Where the engine configuration comes from.
///
/// The internal syntax of the configuration text is owned entirely by
/// the engine; this type only carries it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
   text: String,
   path: String,
}

impl EngineConfig {
   /// A configuration given both inline and by path. Non-empty `text`
   /// wins; `path` is the fallback.
   pub fn new(text: impl Into<String>, path: impl Into<String>) -> Self {
      Self {
         text: text.into(),
         path: path.into(),
      }
   }

   /// A configuration supplied verbatim; no source will be consulted.
   pub fn from_text(text: impl Into<String>) -> Self {
      Self::new(text, "")
   }

   /// A configuration to be loaded from `path` on first use.
   pub fn from_path(path: impl Into<String>) -> Self {
      Self::new("", path)
   }

   /// Produces the configuration text, loading from the source only if
   /// no inline text was supplied.
   pub fn resolve<S: ConfigSource + ?Sized>(&self, source: &S) -> Result<String, InitError> {
      if !self.text.is_empty() {
         return Ok(self.text.clone());
      }
      Ok(source.load(&self.path)?)
   }
}

/// Capability to fetch configuration text from a named location.
pub trait ConfigSource: Send + Sync {
   /// Returns the raw configuration text stored at `path`.
   fn load(&self, path: &str) -> Result<String, LoadError>;
}

/// A [`ConfigSource`] reading UTF-8 text from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsConfigSource;

impl ConfigSource for FsConfigSource {
   fn load(&self, path: &str) -> Result<String, LoadError> {
      std::fs::read_to_string(path).map_err(|e| LoadError::new(path, e.to_string()))
   }
}
