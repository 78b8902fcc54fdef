//! # Canister
//!
//! A declarative, thread-safe service container for Rust.
//!
//! A container maps service names to definitions. A definition is plain
//! data: a literal, a reference to another service written as `<name>`, or a
//! factory call written as a mapping with a `"::"` marker key. Services are
//! built lazily on first lookup, cached per name, and can be redefined or
//! expired at runtime; the container resolves references in whatever order
//! the definitions require and reports loops instead of recursing forever.
//!
//! ## Core Concepts
//!
//! - **Container**: the store of definitions plus the cache of built values.
//! - **Definition**: the declarative recipe for a service, usually loaded
//!   from YAML.
//! - **Registry**: the dotted factory names the host chooses to expose to
//!   definitions. There is no reflective symbol loading; a name like
//!   `demo.greeting` resolves only if the host registered it.
//! - **Resolution**: turning a definition into a value, following `<name>`
//!   references (with optional attribute paths, `<svc.field>`) and invoking
//!   factories with splat (`"="`) and named arguments.
//!
//! ## Quick Start
//!
//! ```
//! use canister::{Container, Value};
//!
//! let container = Container::new();
//!
//! // Expose the factories that definitions may name.
//! container.registry().register_fn("demo.greeting", |args| {
//!   let name = args.require(0, "name")?.as_str().unwrap_or("world").to_owned();
//!   Ok(Value::from(format!("hello, {}", name)))
//! });
//!
//! container
//!   .load_yaml(
//!     r#"
//! who: operator
//! banner:
//!   "::": demo.greeting
//!   name: <who>
//! motd: [<banner>, "<<escaped>"]
//! "#,
//!   )
//!   .unwrap();
//!
//! let motd = container.get("motd").unwrap();
//! assert_eq!(
//!   motd,
//!   Value::Sequence(vec![
//!     Value::from("hello, operator"),
//!     Value::from("<escaped>"),
//!   ])
//! );
//! ```

mod container;
mod definition;
mod error;
mod refresh;
mod registry;
pub mod scope;
mod value;

pub use container::Container;
pub use definition::Definition;
pub use error::{BoxError, Error, Result};
pub use refresh::Refresher;
pub use registry::Registry;
pub use value::{lookup_attr, Args, Object, Value};
