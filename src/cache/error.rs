//! Error types for the caching layer and the remote call boundary.

use thiserror::Error;

/// Failure reported by the remote call boundary.
///
/// These are passed through the cache layer unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
  #[error("{0} not found")]
  NotFound(String),
  #[error("invalid parameters: {0}")]
  InvalidParams(String),
  #[error("remote unavailable: {0}")]
  Unavailable(String),
  #[error("remote call timed out")]
  Timeout,
}

/// Errors surfaced by the cache layer.
///
/// A cache miss is not an error; lookups return `Option` instead.
#[derive(Debug, Error)]
pub enum CacheError {
  /// Params or a payload could not be serialized or deserialized.
  #[error("failed to {action}: {source}")]
  Serialization {
    action: &'static str,
    #[source]
    source: serde_json::Error,
  },

  /// The remote call failed. The cache was not written.
  #[error(transparent)]
  Remote(#[from] RemoteError),

  /// A previous holder of the shared cache panicked.
  #[error("response cache lock poisoned")]
  LockPoisoned,
}

impl CacheError {
  pub(crate) fn encode(source: serde_json::Error) -> Self {
    Self::Serialization {
      action: "serialize payload",
      source,
    }
  }

  pub(crate) fn decode(source: serde_json::Error) -> Self {
    Self::Serialization {
      action: "deserialize payload",
      source,
    }
  }

  pub(crate) fn params(source: serde_json::Error) -> Self {
    Self::Serialization {
      action: "serialize request params",
      source,
    }
  }

  /// Returns the remote failure if this error came from the call boundary.
  pub fn as_remote(&self) -> Option<&RemoteError> {
    match self {
      Self::Remote(e) => Some(e),
      _ => None,
    }
  }
}
