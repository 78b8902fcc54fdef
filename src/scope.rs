//! Thread-scoped variable bindings.
//!
//! Request-style code often wants a few values (a session, a request id)
//! visible for the duration of one unit of work without threading them
//! through every signature. [`bind`] installs named values for the current
//! thread and returns a guard; dropping the guard restores whatever was
//! bound before, so scopes nest.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::value::Value;

thread_local! {
  static BINDINGS: RefCell<HashMap<String, Value>> = RefCell::new(HashMap::new());
}

/// The value currently bound to `name` on this thread, if any.
pub fn current(name: &str) -> Option<Value> {
  BINDINGS.with(|bindings| bindings.borrow().get(name).cloned())
}

/// Binds values on the current thread for the lifetime of the returned
/// guard. Existing bindings for the same names are shadowed and restored
/// when the guard drops.
pub fn bind<I, N>(values: I) -> ScopeGuard
where
  I: IntoIterator<Item = (N, Value)>,
  N: Into<String>,
{
  let mut saved = Vec::new();
  BINDINGS.with(|bindings| {
    let mut bindings = bindings.borrow_mut();
    for (name, value) in values {
      let name = name.into();
      let previous = bindings.insert(name.clone(), value);
      saved.push((name, previous));
    }
  });
  ScopeGuard { saved }
}

/// Restores the prior bindings when dropped.
#[must_use = "bindings are removed as soon as the guard is dropped"]
pub struct ScopeGuard {
  saved: Vec<(String, Option<Value>)>,
}

impl Drop for ScopeGuard {
  fn drop(&mut self) {
    BINDINGS.with(|bindings| {
      let mut bindings = bindings.borrow_mut();
      for (name, previous) in self.saved.drain(..) {
        match previous {
          Some(value) => {
            bindings.insert(name, value);
          }
          None => {
            bindings.remove(&name);
          }
        }
      }
    });
  }
}
