use std::any::Any;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use canister::{Container, Error, Object, Value};

// --- Test Fixtures ---

struct Session {
  user: String,
}

impl Object for Session {
  fn attr(&self, name: &str) -> Option<Value> {
    (name == "user").then(|| Value::from(self.user.clone()))
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

// --- Tests ---

#[test]
fn concurrent_first_access_builds_exactly_once() {
  let c = Arc::new(Container::new());
  let factory_runs = Arc::new(AtomicUsize::new(0));
  let runs = factory_runs.clone();
  c.registry().register_fn("app.session", move |_args| {
    runs.fetch_add(1, Ordering::SeqCst);
    // Widen the race window; a second builder would be counted.
    thread::sleep(Duration::from_millis(50));
    Ok(Value::object(Session {
      user: "shared".to_owned(),
    }))
  });
  c.load_yaml("session: {\"::\": app.session}\n").unwrap();

  let resolved: Mutex<Vec<Value>> = Mutex::new(Vec::new());
  thread::scope(|s| {
    for _ in 0..8 {
      s.spawn(|| {
        let value = c.get("session").unwrap();
        resolved.lock().unwrap().push(value);
      });
    }
  });

  assert_eq!(factory_runs.load(Ordering::SeqCst), 1);
  let resolved = resolved.into_inner().unwrap();
  let first = resolved[0].as_object().unwrap();
  for value in &resolved[1..] {
    assert!(Arc::ptr_eq(first, value.as_object().unwrap()));
  }
}

#[test]
fn construction_is_serialized_across_services() {
  let c = Arc::new(Container::new());
  let active = Arc::new(AtomicUsize::new(0));
  let peak = Arc::new(AtomicUsize::new(0));
  for name in ["one", "two"] {
    let active = active.clone();
    let peak = peak.clone();
    c.registry().register_fn(format!("app.{}", name), move |_args| {
      let now = active.fetch_add(1, Ordering::SeqCst) + 1;
      peak.fetch_max(now, Ordering::SeqCst);
      thread::sleep(Duration::from_millis(30));
      active.fetch_sub(1, Ordering::SeqCst);
      Ok(Value::from(name))
    });
  }
  c.load_yaml("one: {\"::\": app.one}\ntwo: {\"::\": app.two}\n")
    .unwrap();

  thread::scope(|s| {
    s.spawn(|| c.get("one").unwrap());
    s.spawn(|| c.get("two").unwrap());
  });

  // Unrelated services never build at the same time.
  assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[test]
fn direct_and_indirect_loops_are_detected() {
  let c = Container::new();
  c.load_yaml("a: <b>\nb: <a>\nme: <me>\n").unwrap();

  let err = c.get("a").unwrap_err();
  assert!(matches!(err.root(), Error::DependencyLoop(name) if name == "a"));
  assert!(err.to_string().contains("Loop detected while resolving service 'a'"));

  let err = c.get("me").unwrap_err();
  assert!(matches!(err.root(), Error::DependencyLoop(name) if name == "me"));
}

#[test]
fn loop_state_resets_between_lookups() {
  let c = Container::new();
  c.load_yaml("a: <b>\nb: <a>\nok: fine\n").unwrap();

  assert!(c.get("a").is_err());
  // The failed build does not poison later lookups.
  assert_eq!(c.get("ok").unwrap(), "fine");
  assert!(c.get("b").is_err());
}

#[test]
fn factories_may_query_the_container_reentrantly() {
  // A factory receives the container handle and looks services up by name
  // while its own construction still holds the build section. This relies
  // on the section being re-entrant for the owning thread.
  let c = Arc::new(Container::new());
  let handle = c.clone();
  c.registry().register_fn("app.dynamic", move |_args| {
    let user = handle.get("dynamic/username")?;
    let password = handle.get("dynamic/password")?;
    let mut built = BTreeMap::new();
    built.insert("user".to_owned(), user);
    built.insert("password".to_owned(), password);
    Ok(Value::Mapping(built))
  });
  c.load_yaml(
    r#"
dynamic/object: {"::": app.dynamic}
dynamic/username: abc
dynamic/password: xyzzy
"#,
  )
  .unwrap();

  let resolved = c.get("dynamic/object").unwrap();
  assert_eq!(resolved.as_mapping().unwrap()["user"], "abc");
  assert_eq!(resolved.as_mapping().unwrap()["password"], "xyzzy");
}

#[test]
fn concurrent_registration_and_resolution() {
  let c = Arc::new(Container::new());
  c.set("common", "steady");

  thread::scope(|s| {
    for i in 0..10_i64 {
      let c = c.clone();
      s.spawn(move || {
        c.set(format!("thread_service_{}", i), i);
        for _ in 0..100 {
          assert_eq!(c.get("common").unwrap(), "steady");
        }
        assert_eq!(c.get(&format!("thread_service_{}", i)).unwrap(), i);
      });
    }
  });

  assert_eq!(c.get("thread_service_5").unwrap(), 5_i64);
}
