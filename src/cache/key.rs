//! Cache key construction.

use serde::Serialize;
use std::fmt;

use super::error::CacheError;

/// Separates the endpoint segment from the serialized params.
/// Never valid inside an endpoint identifier.
pub const KEY_SEPARATOR: char = '@';

/// Key for one endpoint + params combination.
///
/// Built as `endpoint` alone, or `endpoint@<params as JSON>` when params are
/// given. Params go through `serde_json::Value` first, whose object maps are
/// ordered, so field order in the caller's type never changes the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
  pub fn build<P>(endpoint: &str, params: Option<&P>) -> Result<Self, CacheError>
  where
    P: Serialize + ?Sized,
  {
    debug_assert!(
      !endpoint.contains(KEY_SEPARATOR),
      "endpoint identifier must not contain {KEY_SEPARATOR}"
    );

    let Some(params) = params else {
      return Ok(Self(endpoint.to_string()));
    };

    let canonical = serde_json::to_value(params)
      .and_then(|value| serde_json::to_string(&value))
      .map_err(CacheError::params)?;

    Ok(Self(format!("{endpoint}{KEY_SEPARATOR}{canonical}")))
  }

  /// The endpoint identifier this key was built from.
  pub fn endpoint(&self) -> &str {
    match self.0.split_once(KEY_SEPARATOR) {
      Some((endpoint, _)) => endpoint,
      None => &self.0,
    }
  }

  /// The serialized params, if any.
  pub fn params(&self) -> Option<&str> {
    self.0.split_once(KEY_SEPARATOR).map(|(_, params)| params)
  }

  /// True if the endpoint segment equals or starts with `prefix`.
  ///
  /// Only the endpoint segment is inspected, so text inside params never
  /// matches.
  pub fn has_endpoint_prefix(&self, prefix: &str) -> bool {
    self.endpoint().starts_with(prefix)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl AsRef<str> for CacheKey {
  fn as_ref(&self) -> &str {
    &self.0
  }
}
