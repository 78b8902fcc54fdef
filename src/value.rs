//! The runtime value model.
//!
//! Definitions resolve into [`Value`]s. Plain data (scalars, sequences,
//! mappings) is represented structurally; anything constructed by a factory
//! that is not plain data lives behind the [`Object`] trait, which also
//! carries the attribute-lookup and call capabilities the resolution engine
//! needs.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, Error};

/// A host-provided object managed by the container.
///
/// Implementors get attribute lookup (for reference expressions like
/// `<service.field>`) and invocation (for use as a factory) for free as
/// opt-in overrides; the defaults expose neither.
pub trait Object: Any + Send + Sync {
  /// Plain attribute access, used when walking a reference's attribute path.
  fn attr(&self, name: &str) -> Option<Value> {
    let _ = name;
    None
  }

  /// Invoke this object as a factory.
  fn call(&self, args: Args) -> Result<Value, BoxError> {
    let _ = args;
    Err(format!("'{}' object is not callable", self.type_name()).into())
  }

  /// Name used in error messages.
  fn type_name(&self) -> &'static str {
    std::any::type_name::<Self>()
  }

  /// Access to the concrete type, for downcasting by the host.
  fn as_any(&self) -> &dyn Any;
}

/// Arguments passed to a factory: resolved splat ("positional") values
/// followed by resolved named values.
#[derive(Clone, Debug, Default)]
pub struct Args {
  positional: Vec<Value>,
  named: BTreeMap<String, Value>,
}

impl Args {
  pub fn new(positional: Vec<Value>, named: BTreeMap<String, Value>) -> Self {
    Self { positional, named }
  }

  pub fn positional(&self) -> &[Value] {
    &self.positional
  }

  pub fn named(&self) -> &BTreeMap<String, Value> {
    &self.named
  }

  /// A named argument, if present.
  pub fn get(&self, name: &str) -> Option<&Value> {
    self.named.get(name)
  }

  /// A positional argument, if present.
  pub fn pos(&self, index: usize) -> Option<&Value> {
    self.positional.get(index)
  }

  /// A positional-or-named argument: position `index` if supplied, else the
  /// named entry. Mirrors how definitions may freely mix splat and named
  /// argument forms for the same factory.
  pub fn arg(&self, index: usize, name: &str) -> Option<&Value> {
    self.pos(index).or_else(|| self.get(name))
  }

  /// Like [`Args::arg`] but failing with a ready-to-return factory error.
  pub fn require(&self, index: usize, name: &str) -> Result<&Value, BoxError> {
    self
      .arg(index, name)
      .ok_or_else(|| format!("missing required argument '{}'", name).into())
  }
}

pub(crate) struct Callable {
  f: Box<dyn Fn(Args) -> Result<Value, BoxError> + Send + Sync>,
}

impl Object for Callable {
  fn call(&self, args: Args) -> Result<Value, BoxError> {
    (self.f)(args)
  }

  fn type_name(&self) -> &'static str {
    "callable"
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

/// A resolved service value.
#[derive(Clone)]
pub enum Value {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  String(String),
  Sequence(Vec<Value>),
  Mapping(BTreeMap<String, Value>),
  Object(Arc<dyn Object>),
}

impl Value {
  /// Wraps a host object.
  pub fn object<T: Object>(object: T) -> Value {
    Value::Object(Arc::new(object))
  }

  /// Wraps an already-shared host object, preserving its identity.
  pub fn shared<T: Object>(object: Arc<T>) -> Value {
    Value::Object(object)
  }

  /// Wraps a function as a callable object, usable as a factory.
  pub fn callable<F>(f: F) -> Value
  where
    F: Fn(Args) -> Result<Value, BoxError> + Send + Sync + 'static,
  {
    Value::object(Callable { f: Box::new(f) })
  }

  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Value::Int(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Int(n) => Some(*n as f64),
      Value::Float(x) => Some(*x),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_sequence(&self) -> Option<&[Value]> {
    match self {
      Value::Sequence(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_mapping(&self) -> Option<&BTreeMap<String, Value>> {
    match self {
      Value::Mapping(entries) => Some(entries),
      _ => None,
    }
  }

  pub fn as_object(&self) -> Option<&Arc<dyn Object>> {
    match self {
      Value::Object(object) => Some(object),
      _ => None,
    }
  }

  /// Downcasts an object value to its concrete type.
  pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
    self.as_object()?.as_any().downcast_ref::<T>()
  }

  /// Kind label used in error messages.
  pub fn kind(&self) -> &'static str {
    match self {
      Value::Null => "null",
      Value::Bool(_) => "bool",
      Value::Int(_) => "int",
      Value::Float(_) => "float",
      Value::String(_) => "string",
      Value::Sequence(_) => "sequence",
      Value::Mapping(_) => "mapping",
      Value::Object(object) => object.type_name(),
    }
  }
}

/// Plain attribute access on a resolved value.
///
/// Mappings expose their keys as attributes; objects answer through
/// [`Object::attr`]. Everything else has no attributes.
pub fn lookup_attr(value: &Value, attr: &str) -> Result<Value, Error> {
  let found = match value {
    Value::Mapping(entries) => entries.get(attr).cloned(),
    Value::Object(object) => object.attr(attr),
    _ => None,
  };
  found.ok_or_else(|| Error::AttributeNotFound {
    target: value.kind().to_owned(),
    attr: attr.to_owned(),
  })
}

impl PartialEq for Value {
  fn eq(&self, other: &Value) -> bool {
    match (self, other) {
      (Value::Null, Value::Null) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Int(a), Value::Int(b)) => a == b,
      (Value::Float(a), Value::Float(b)) => a == b,
      (Value::String(a), Value::String(b)) => a == b,
      (Value::Sequence(a), Value::Sequence(b)) => a == b,
      (Value::Mapping(a), Value::Mapping(b)) => a == b,
      // Objects compare by identity, not contents.
      (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}

impl PartialEq<str> for Value {
  fn eq(&self, other: &str) -> bool {
    self.as_str() == Some(other)
  }
}

impl PartialEq<&str> for Value {
  fn eq(&self, other: &&str) -> bool {
    self.as_str() == Some(*other)
  }
}

impl PartialEq<i64> for Value {
  fn eq(&self, other: &i64) -> bool {
    self.as_i64() == Some(*other)
  }
}

impl PartialEq<bool> for Value {
  fn eq(&self, other: &bool) -> bool {
    self.as_bool() == Some(*other)
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Null => f.write_str("Null"),
      Value::Bool(b) => write!(f, "Bool({:?})", b),
      Value::Int(n) => write!(f, "Int({:?})", n),
      Value::Float(x) => write!(f, "Float({:?})", x),
      Value::String(s) => write!(f, "String({:?})", s),
      Value::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
      Value::Mapping(entries) => f.debug_tuple("Mapping").field(entries).finish(),
      Value::Object(object) => write!(f, "Object({})", object.type_name()),
    }
  }
}

impl From<()> for Value {
  fn from(_: ()) -> Value {
    Value::Null
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Value {
    Value::Bool(b)
  }
}

impl From<i64> for Value {
  fn from(n: i64) -> Value {
    Value::Int(n)
  }
}

impl From<i32> for Value {
  fn from(n: i32) -> Value {
    Value::Int(n as i64)
  }
}

impl From<f64> for Value {
  fn from(x: f64) -> Value {
    Value::Float(x)
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Value {
    Value::String(s.to_owned())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Value {
    Value::String(s)
  }
}

impl From<Vec<Value>> for Value {
  fn from(items: Vec<Value>) -> Value {
    Value::Sequence(items)
  }
}

impl From<BTreeMap<String, Value>> for Value {
  fn from(entries: BTreeMap<String, Value>) -> Value {
    Value::Mapping(entries)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Point {
    x: i64,
    y: i64,
  }

  impl Object for Point {
    fn attr(&self, name: &str) -> Option<Value> {
      match name {
        "x" => Some(Value::Int(self.x)),
        "y" => Some(Value::Int(self.y)),
        _ => None,
      }
    }

    fn as_any(&self) -> &dyn Any {
      self
    }
  }

  #[test]
  fn attr_lookup_on_objects_and_mappings() {
    let point = Value::object(Point { x: 3, y: 4 });
    assert_eq!(lookup_attr(&point, "x").unwrap(), 3_i64);

    let mut entries = BTreeMap::new();
    entries.insert("inner".to_owned(), Value::from("deep"));
    let mapping = Value::Mapping(entries);
    assert_eq!(lookup_attr(&mapping, "inner").unwrap(), "deep");

    let err = lookup_attr(&point, "z").unwrap_err();
    assert!(err.to_string().contains("no attribute 'z'"));
    let err = lookup_attr(&Value::Int(1), "z").unwrap_err();
    assert!(err.to_string().contains("'int' has no attribute 'z'"));
  }

  #[test]
  fn object_equality_is_identity() {
    let shared = Arc::new(Point { x: 0, y: 0 });
    let a = Value::shared(shared.clone());
    let b = Value::shared(shared);
    let c = Value::object(Point { x: 0, y: 0 });
    assert_eq!(a, b);
    assert_ne!(a, c);
  }

  #[test]
  fn default_object_is_not_callable() {
    let point = Value::object(Point { x: 0, y: 0 });
    let err = point.as_object().unwrap().call(Args::default()).unwrap_err();
    assert!(err.to_string().contains("is not callable"));
  }

  #[test]
  fn args_positional_or_named() {
    let mut named = BTreeMap::new();
    named.insert("y".to_owned(), Value::Int(2));
    let args = Args::new(vec![Value::Int(1)], named);
    assert_eq!(args.arg(0, "x"), Some(&Value::Int(1)));
    assert_eq!(args.arg(1, "y"), Some(&Value::Int(2)));
    assert!(args.require(2, "z").is_err());
  }
}
