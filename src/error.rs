use thiserror::Error;

/// Boxed error type returned by user factories and callable objects.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for `canister` operations.
#[derive(Debug, Error)]
pub enum Error {
  /// Lookup of a name that has no definition in the container.
  #[error("Undefined service '{0}'")]
  UndefinedService(String),

  /// A service was found to (transitively) depend on itself during a
  /// single build operation.
  #[error("Loop detected while resolving service '{0}'")]
  DependencyLoop(String),

  /// A factory raised an error. The original error is preserved as the
  /// source; the message gains context identifying the factory reference.
  #[error("{source} (while calling factory '{factory}')")]
  FactoryCall {
    factory: String,
    #[source]
    source: BoxError,
  },

  /// Context frame added for each service whose definition failed to
  /// resolve. The underlying error is unchanged, only annotated.
  #[error("{source} (while resolving service '{name}')")]
  Resolving {
    name: String,
    #[source]
    source: Box<Error>,
  },

  /// A dotted name had no registered entry under any prefix.
  #[error("no module named '{0}'")]
  ModuleNotFound(String),

  /// Attribute-path traversal failed, either on a reference expression
  /// or while walking the tail of a dotted name.
  #[error("'{target}' has no attribute '{attr}'")]
  AttributeNotFound { target: String, attr: String },

  /// Failure reading a definition source.
  #[error("failed to read definition source: {0}")]
  Io(#[from] std::io::Error),

  /// Failure parsing a definition source.
  #[error("failed to parse definitions: {0}")]
  Parse(#[from] serde_yaml::Error),
}

impl Error {
  /// Strips the `Resolving` context frames and returns the underlying
  /// error, e.g. to match on `UndefinedService` or `DependencyLoop`.
  pub fn root(&self) -> &Error {
    match self {
      Error::Resolving { source, .. } => source.root(),
      other => other,
    }
  }

  pub(crate) fn while_resolving(self, name: &str) -> Error {
    Error::Resolving {
      name: name.to_owned(),
      source: Box::new(self),
    }
  }
}

/// A specialized `Result` type for `canister` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
