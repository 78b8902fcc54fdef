//! Dotted-name resolution for factory references.
//!
//! Definition files name factories with strings like `"pkg.Widget.build"`.
//! Rather than reflective symbol loading, the host application registers the
//! names it is willing to expose. An entry may be a single callable, or a
//! mapping acting as a module namespace whose members are reached by
//! attribute-walking the remainder of the dotted name.

use dashmap::DashMap;

use crate::error::{BoxError, Error, Result};
use crate::value::{lookup_attr, Args, Value};

/// Registry of dotted names available to factory-call definitions.
///
/// Lookup takes the longest registered prefix of the requested name and
/// walks the remaining segments as attributes, so `pkg.Widget.build` is
/// satisfied by an entry for `pkg.Widget.build` itself, or by an entry for
/// `pkg` holding a mapping with a `Widget` mapping with a `build` callable.
#[derive(Default)]
pub struct Registry {
  entries: DashMap<String, Value>,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers a value under a dotted name, replacing any previous entry.
  pub fn register(&self, name: impl Into<String>, value: Value) {
    self.entries.insert(name.into(), value);
  }

  /// Registers a function as a callable factory.
  pub fn register_fn<F>(&self, name: impl Into<String>, f: F)
  where
    F: Fn(Args) -> Result<Value, BoxError> + Send + Sync + 'static,
  {
    self.register(name, Value::callable(f));
  }

  /// Resolves a dotted name to a registered value.
  ///
  /// The longest registered prefix wins; leftover segments are walked with
  /// plain attribute access. A name with no registered prefix at all fails
  /// with [`Error::ModuleNotFound`] naming its first segment; a prefix match
  /// with a missing member fails with [`Error::AttributeNotFound`].
  pub fn resolve(&self, dotted: &str) -> Result<Value> {
    let mut prefix = dotted;
    let mut attrs: Vec<&str> = Vec::new();
    loop {
      if let Some(entry) = self.entries.get(prefix) {
        let mut value = entry.value().clone();
        drop(entry);
        for attr in &attrs {
          value = lookup_attr(&value, attr)?;
        }
        return Ok(value);
      }
      match prefix.rfind('.') {
        Some(split) => {
          attrs.insert(0, &prefix[split + 1..]);
          prefix = &prefix[..split];
        }
        None => return Err(Error::ModuleNotFound(prefix.to_owned())),
      }
    }
  }
}
