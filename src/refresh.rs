//! A caching factory with a limited validity window.
//!
//! A singleton built once at startup is sometimes not enough: the object may
//! log into a remote service whose credentials expire, while the material
//! needed to log in again lives in the container, not in the object. A
//! [`Refresher`] wraps one service key and, each time it is asked for the
//! value, either returns the container's current instance or forces the
//! container to build a fresh one once the validity window has passed.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::container::Container;
use crate::error::{BoxError, Result};
use crate::value::{Args, Object, Value};

/// Hands out a container-managed service, rebuilding it after `validity`.
///
/// Implements [`Object`], so it can be installed as a service itself
/// (via [`Definition::Value`](crate::Definition)) and invoked as a factory
/// from other definitions.
pub struct Refresher {
  container: Arc<Container>,
  key: String,
  validity: Duration,
  deadline: Mutex<Option<Instant>>,
}

impl Refresher {
  pub fn new(container: Arc<Container>, key: impl Into<String>, validity: Duration) -> Self {
    Self {
      container,
      key: key.into(),
      validity,
      deadline: Mutex::new(None),
    }
  }

  /// The current instance, or a fresh one if the previous has expired.
  pub fn get(&self) -> Result<Value> {
    let now = Instant::now();
    {
      let mut deadline = self.deadline.lock();
      match *deadline {
        None => *deadline = Some(now + self.validity),
        Some(at) if now >= at => {
          debug!(service = %self.key, "validity window elapsed, dropping cached instance");
          self.container.delete(&self.key);
          *deadline = Some(now + self.validity);
        }
        Some(_) => {}
      }
    }
    self.container.get(&self.key)
  }
}

impl Object for Refresher {
  fn call(&self, _args: Args) -> Result<Value, BoxError> {
    self.get().map_err(|err| Box::new(err) as BoxError)
  }

  fn type_name(&self) -> &'static str {
    "Refresher"
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}
