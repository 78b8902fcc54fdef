//! The service container: definition store, instance cache and the
//! resolution engine.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use tracing::{debug, trace};

use crate::definition::Definition;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::value::{lookup_attr, Args, Value};

/// A container of named, lazily-constructed services.
///
/// Definitions are loaded up front (typically from YAML) and resolved on
/// first lookup; resolved values are cached per name until the name is
/// redefined, deleted or the whole cache is expired. A definition may refer
/// to another service by enclosing its name in angle brackets:
///
/// ```yaml
/// db_url: sqlite:///test.db
/// engine:
///   "::": sql.create_engine
///   url: <db_url>
/// app:
///   "::": myapp.App
///   engine: <engine>
/// ```
///
/// Services can be defined in any order; resolution follows references and
/// builds dependencies as it encounters them. Factory names on the right of
/// the `"::"` marker are looked up in the container's [`Registry`], which the
/// host populates with the callables it wants to expose.
///
/// The container is thread-safe: one lookup builds at a time, so concurrent
/// first access to a service runs its factory exactly once. The build
/// section is re-entrant, so a factory may itself query the container.
pub struct Container {
  definitions: DashMap<String, Definition>,
  services: DashMap<String, Value>,
  registry: Registry,
  factory_marker: String,
  splat_marker: String,
  // Exclusive build section. The inner set holds the names currently being
  // resolved, for loop detection; it is only touched while the section is
  // held, and borrows never span a factory call.
  build_lock: ReentrantMutex<RefCell<HashSet<String>>>,
}

impl Default for Container {
  fn default() -> Self {
    Self::with_markers("::", "=")
  }
}

impl Container {
  /// Creates an empty container with the default `"::"` factory marker and
  /// `"="` splat marker.
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates an empty container with custom marker keys. A mapping
  /// definition containing `factory_marker` is treated as a factory call;
  /// its `splat_marker` entry, if any, supplies positional arguments.
  pub fn with_markers(factory_marker: impl Into<String>, splat_marker: impl Into<String>) -> Self {
    Self {
      definitions: DashMap::new(),
      services: DashMap::new(),
      registry: Registry::new(),
      factory_marker: factory_marker.into(),
      splat_marker: splat_marker.into(),
      build_lock: ReentrantMutex::new(RefCell::new(HashSet::new())),
    }
  }

  /// The registry of dotted factory names available to definitions.
  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  // --- Definition loading ---

  /// Merges a batch of definitions into the store. Redefined names drop any
  /// cached instance so the next lookup rebuilds from the new definition.
  pub fn load<I>(&self, definitions: I)
  where
    I: IntoIterator<Item = (String, Definition)>,
  {
    let _section = self.build_lock.lock();
    let mut count = 0_usize;
    for (name, definition) in definitions {
      self.services.remove(&name);
      self.definitions.insert(name, definition);
      count += 1;
    }
    debug!(count, "loaded service definitions");
  }

  /// Parses a YAML mapping of `name: definition` and merges it.
  pub fn load_yaml(&self, text: &str) -> Result<()> {
    let parsed: BTreeMap<String, Definition> = serde_yaml::from_str(text)?;
    self.load(parsed);
    Ok(())
  }

  /// Loads a YAML definition file. When `required` is false a file that
  /// cannot be read is skipped silently; parse errors always surface.
  pub fn load_yaml_file(&self, path: impl AsRef<Path>, required: bool) -> Result<()> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
      Ok(text) => self.load_yaml(&text),
      Err(err) if !required => {
        debug!(path = %path.display(), %err, "skipping optional definition file");
        Ok(())
      }
      Err(err) => Err(err.into()),
    }
  }

  /// Redefines a single service. Existing resolved instances held by
  /// callers are unaffected; the next lookup builds from the new definition.
  pub fn set(&self, name: impl Into<String>, definition: impl Into<Definition>) {
    let _section = self.build_lock.lock();
    let name = name.into();
    self.services.remove(&name);
    self.definitions.insert(name, definition.into());
  }

  /// Whether a definition exists for `name`.
  pub fn contains(&self, name: &str) -> bool {
    self.definitions.contains_key(name)
  }

  // --- Cache invalidation ---

  /// Drops the cached instance for one name, if any. The definition stays;
  /// the next lookup returns a fresh instance.
  pub fn delete(&self, name: &str) {
    let _section = self.build_lock.lock();
    self.services.remove(name);
  }

  /// Drops every cached instance. Definitions stay, and values already
  /// handed out remain usable; only future lookups rebuild.
  pub fn expire(&self) {
    let _section = self.build_lock.lock();
    self.services.clear();
  }

  // --- Resolution ---

  /// Returns the service for `name`, building it (and anything it
  /// references) on first access.
  pub fn get(&self, name: &str) -> Result<Value> {
    if let Some(cached) = self.services.get(name) {
      trace!(service = name, "cache hit");
      return Ok(cached.value().clone());
    }
    let section = self.build_lock.lock();
    // Loop detection is scoped to a single public lookup.
    section.borrow_mut().clear();
    self.resolve_service(&section, name)
  }

  /// Builds every defined service eagerly, returning the full name→value
  /// mapping. Useful to pay startup cost up front or to surface definition
  /// errors early; error semantics match [`Container::get`].
  pub fn resolve_all(&self) -> Result<BTreeMap<String, Value>> {
    let names: Vec<String> = self.definitions.iter().map(|e| e.key().clone()).collect();
    let mut resolved = BTreeMap::new();
    for name in names {
      let value = self.get(&name)?;
      resolved.insert(name, value);
    }
    Ok(resolved)
  }

  fn resolve_service(&self, building: &RefCell<HashSet<String>>, name: &str) -> Result<Value> {
    if let Some(cached) = self.services.get(name) {
      return Ok(cached.value().clone());
    }
    let definition = match self.definitions.get(name) {
      Some(entry) => entry.value().clone(),
      None => return Err(Error::UndefinedService(name.to_owned())),
    };
    if !building.borrow_mut().insert(name.to_owned()) {
      return Err(Error::DependencyLoop(name.to_owned()));
    }
    debug!(service = name, "building service");
    let value = self
      .resolve_value(building, &definition)
      .map_err(|err| err.while_resolving(name))?;
    self.services.insert(name.to_owned(), value.clone());
    Ok(value)
  }

  fn resolve_value(&self, building: &RefCell<HashSet<String>>, definition: &Definition) -> Result<Value> {
    match definition {
      Definition::Null => Ok(Value::Null),
      Definition::Bool(b) => Ok(Value::Bool(*b)),
      Definition::Int(n) => Ok(Value::Int(*n)),
      Definition::Float(x) => Ok(Value::Float(*x)),
      Definition::Value(value) => Ok(value.clone()),
      Definition::String(s) => self.resolve_string(building, s),
      Definition::Mapping(entries) => {
        if entries.contains_key(&self.factory_marker) {
          self.invoke_factory(building, entries)
        } else {
          let mut resolved = BTreeMap::new();
          for (key, entry) in entries {
            resolved.insert(key.clone(), self.resolve_value(building, entry)?);
          }
          Ok(Value::Mapping(resolved))
        }
      }
      Definition::Sequence(items) => {
        let mut resolved = Vec::with_capacity(items.len());
        for item in items {
          resolved.push(self.resolve_value(building, item)?);
        }
        Ok(Value::Sequence(resolved))
      }
    }
  }

  fn resolve_string(&self, building: &RefCell<HashSet<String>>, s: &str) -> Result<Value> {
    // "<<name>" escapes to the literal "<name>" without any lookup.
    if let Some(rest) = s.strip_prefix("<<") {
      return Ok(Value::String(format!("<{}", rest)));
    }
    if let Some(inner) = s.strip_prefix('<') {
      if let Some((head, _)) = inner.rsplit_once('>') {
        // "<name.a.b>": first dot segment is the service, the rest is an
        // attribute path walked on the resolved value.
        let mut segments = head.split('.');
        let name = segments.next().unwrap_or("");
        let mut value = self.resolve_service(building, name)?;
        for attr in segments.filter(|a| !a.is_empty()) {
          value = lookup_attr(&value, attr)?;
        }
        return Ok(value);
      }
    }
    // Anything else, malformed markers included, is a plain string.
    Ok(Value::String(s.to_owned()))
  }

  fn invoke_factory(
    &self,
    building: &RefCell<HashSet<String>>,
    entries: &BTreeMap<String, Definition>,
  ) -> Result<Value> {
    let marker = &entries[&self.factory_marker];
    let factory = match self.resolve_value(building, marker)? {
      // A string factory reference is a dotted registry name.
      Value::String(dotted) => self.registry.resolve(&dotted)?,
      resolved => resolved,
    };

    let mut positional = Vec::new();
    let mut named = BTreeMap::new();
    for (key, entry) in entries {
      if key == &self.factory_marker {
        continue;
      }
      let resolved = self.resolve_value(building, entry)?;
      if key == &self.splat_marker {
        // A non-sequence splat value is promoted to a single argument.
        positional = match resolved {
          Value::Sequence(items) => items,
          single => vec![single],
        };
      } else {
        named.insert(key.clone(), resolved);
      }
    }

    let callable = match factory.as_object() {
      Some(object) => object,
      None => {
        return Err(Error::FactoryCall {
          factory: marker.to_string(),
          source: format!("'{}' value is not callable", factory.kind()).into(),
        })
      }
    };
    callable
      .call(Args::new(positional, named))
      .map_err(|err| Error::FactoryCall {
        factory: marker.to_string(),
        source: err,
      })
  }
}
