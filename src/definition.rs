//! Declarative service definitions.
//!
//! A [`Definition`] is pure data describing how to obtain a value: a scalar
//! literal, a reference expression (`"<other_service>"`), a mapping (either
//! an object literal or, when it carries the container's factory marker key,
//! a factory call), or a sequence of definitions. Nothing is resolved until
//! the service is first requested from a [`Container`](crate::Container).

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::value::Value;

/// The recipe for a service.
///
/// Deserializes untagged from YAML, so a definition file is simply a mapping
/// of service name to definition. The `Value` variant cannot appear in a
/// definition file; it lets host code install an already-built value (most
/// usefully a callable, so a Rust closure can serve as a factory referenced
/// by other definitions).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Definition {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  String(String),
  Sequence(Vec<Definition>),
  Mapping(BTreeMap<String, Definition>),
  #[serde(skip)]
  Value(Value),
}

impl fmt::Display for Definition {
  // Compact flow rendering, used to identify factory references in errors.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Definition::Null => f.write_str("null"),
      Definition::Bool(b) => write!(f, "{}", b),
      Definition::Int(n) => write!(f, "{}", n),
      Definition::Float(x) => write!(f, "{}", x),
      Definition::String(s) => f.write_str(s),
      Definition::Sequence(items) => {
        f.write_str("[")?;
        for (i, item) in items.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{}", item)?;
        }
        f.write_str("]")
      }
      Definition::Mapping(entries) => {
        f.write_str("{")?;
        for (i, (key, value)) in entries.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{}: {}", key, value)?;
        }
        f.write_str("}")
      }
      Definition::Value(value) => write!(f, "<{}>", value.kind()),
    }
  }
}

impl From<()> for Definition {
  fn from(_: ()) -> Definition {
    Definition::Null
  }
}

impl From<bool> for Definition {
  fn from(b: bool) -> Definition {
    Definition::Bool(b)
  }
}

impl From<i64> for Definition {
  fn from(n: i64) -> Definition {
    Definition::Int(n)
  }
}

impl From<i32> for Definition {
  fn from(n: i32) -> Definition {
    Definition::Int(n as i64)
  }
}

impl From<f64> for Definition {
  fn from(x: f64) -> Definition {
    Definition::Float(x)
  }
}

impl From<&str> for Definition {
  fn from(s: &str) -> Definition {
    Definition::String(s.to_owned())
  }
}

impl From<String> for Definition {
  fn from(s: String) -> Definition {
    Definition::String(s)
  }
}

impl From<Vec<Definition>> for Definition {
  fn from(items: Vec<Definition>) -> Definition {
    Definition::Sequence(items)
  }
}

impl From<BTreeMap<String, Definition>> for Definition {
  fn from(entries: BTreeMap<String, Definition>) -> Definition {
    Definition::Mapping(entries)
  }
}

impl From<Value> for Definition {
  fn from(value: Value) -> Definition {
    Definition::Value(value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(text: &str) -> Definition {
    serde_yaml::from_str(text).unwrap()
  }

  #[test]
  fn deserializes_scalars() {
    assert_eq!(parse("null"), Definition::Null);
    assert_eq!(parse("true"), Definition::Bool(true));
    assert_eq!(parse("123"), Definition::Int(123));
    assert_eq!(parse("1.5"), Definition::Float(1.5));
    assert_eq!(parse("hello"), Definition::String("hello".to_owned()));
    assert_eq!(parse("'<a>'"), Definition::String("<a>".to_owned()));
  }

  #[test]
  fn deserializes_nested_structure() {
    let def = parse("{outer: {\"::\": pkg.make, \"=\": [1, two]}, items: [x, 2]}");
    let Definition::Mapping(entries) = def else {
      panic!("expected mapping");
    };
    let Definition::Mapping(call) = &entries["outer"] else {
      panic!("expected factory mapping");
    };
    assert_eq!(call["::"], Definition::String("pkg.make".to_owned()));
    assert_eq!(
      call["="],
      Definition::Sequence(vec![Definition::Int(1), Definition::from("two")])
    );
    assert_eq!(
      entries["items"],
      Definition::Sequence(vec![Definition::from("x"), Definition::Int(2)])
    );
  }

  #[test]
  fn display_renders_factory_references_bare() {
    assert_eq!(parse("pkg.Widget.build").to_string(), "pkg.Widget.build");
    assert_eq!(parse("[1, a]").to_string(), "[1, a]");
    assert_eq!(parse("{b: 2}").to_string(), "{b: 2}");
  }
}
