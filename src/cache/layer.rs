//! Cache layer that orchestrates caching logic with remote fetching.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use tracing::debug;

use super::error::{CacheError, RemoteError};
use super::executor::RequestExecutor;
use super::key::CacheKey;
use super::session::Session;
use super::storage::SharedCache;
use super::traits::CacheResult;

/// Read-through cache in front of a remote call boundary.
///
/// Concurrent misses on the same key are not coalesced: each one runs its
/// own fetch and the last write wins.
#[derive(Clone)]
pub struct CacheLayer {
  cache: SharedCache,
  executor: RequestExecutor,
}

impl CacheLayer {
  pub fn new(session: &Session) -> Self {
    Self {
      cache: session.cache().clone(),
      executor: session.executor().clone(),
    }
  }

  /// Fetch with read-through caching.
  ///
  /// 1. Build the key from `endpoint` and `params`
  /// 2. On hit, decode the stored body and return it without calling `fetcher`
  /// 3. On miss, run `fetcher` through the executor, store the body, return it
  ///
  /// A failed fetch or an undecodable response leaves the cache untouched.
  pub async fn fetch_with_cache<T, F, Fut>(
    &self,
    endpoint: &str,
    params: Option<&Value>,
    fetcher: F,
  ) -> Result<CacheResult<Option<T>>, CacheError>
  where
    T: DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value, RemoteError>>,
  {
    let key = CacheKey::build(endpoint, params)?;

    let cached = self.cache.lock()?.get(&key).cloned();
    if let Some(entry) = cached {
      debug!(%key, "cache hit");
      let data = serde_json::from_str(&entry.body).map_err(CacheError::decode)?;
      return Ok(CacheResult::from_cache(data, entry.cached_at));
    }

    debug!(%key, "cache miss");
    let value = self.executor.execute(fetcher()).await?;

    let body = serde_json::to_string(&value).map_err(CacheError::encode)?;
    let data = serde_json::from_value(value).map_err(CacheError::decode)?;

    // No await between here and the return, so the write is atomic with
    // respect to other tasks on this session
    self.cache.lock()?.set(key.clone(), body);
    debug!(%key, "stored response");

    Ok(CacheResult::from_network(data))
  }

  /// Fetch straight from the remote. Neither reads nor populates the cache.
  pub async fn fetch_without_cache<T, F, Fut>(
    &self,
    endpoint: &str,
    fetcher: F,
  ) -> Result<CacheResult<Option<T>>, CacheError>
  where
    T: DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value, RemoteError>>,
  {
    debug!(endpoint, "uncached fetch");
    let value = self.executor.execute(fetcher()).await?;
    let data = serde_json::from_value(value).map_err(CacheError::decode)?;
    Ok(CacheResult::from_network(data))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::traits::CacheSource;
  use serde_json::json;
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn layer() -> (CacheLayer, Session) {
    let session = Session::default();
    (CacheLayer::new(&session), session)
  }

  #[tokio::test]
  async fn test_second_fetch_served_from_cache() {
    let (layer, _session) = layer();
    let calls = AtomicUsize::new(0);
    let params = json!({"page": 0});

    let fetch = || async {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok(json!({"data": [1, 2, 3], "nextPage": 1}))
    };

    let first: CacheResult<Option<Value>> = layer
      .fetch_with_cache("paginatedTransactions", Some(&params), fetch)
      .await
      .unwrap();
    let second: CacheResult<Option<Value>> = layer
      .fetch_with_cache("paginatedTransactions", Some(&params), fetch)
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::Cache);
    assert!(second.cached_at.is_some());
    assert_eq!(first.data, second.data);
  }

  #[tokio::test]
  async fn test_different_params_are_separate_entries() {
    let (layer, session) = layer();
    let calls = AtomicUsize::new(0);
    let fetch = || async {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok(json!([]))
    };

    for page in [0, 1, 0, 1] {
      let params = json!({ "page": page });
      let _: CacheResult<Option<Vec<u32>>> = layer
        .fetch_with_cache("paginatedTransactions", Some(&params), fetch)
        .await
        .unwrap();
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(session.cache().len().unwrap(), 2);
  }

  #[tokio::test]
  async fn test_null_response_is_cached_as_none() {
    let (layer, _session) = layer();
    let calls = AtomicUsize::new(0);
    let fetch = || async {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok(Value::Null)
    };

    let first: CacheResult<Option<Vec<u32>>> =
      layer.fetch_with_cache("employees", None, fetch).await.unwrap();
    let second: CacheResult<Option<Vec<u32>>> =
      layer.fetch_with_cache("employees", None, fetch).await.unwrap();

    assert_eq!(first.data, None);
    assert_eq!(second.data, None);
    assert!(second.is_cached());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_failed_fetch_is_not_cached() {
    let (layer, session) = layer();

    let result: Result<CacheResult<Option<Value>>, _> = layer
      .fetch_with_cache("employees", None, || async { Err(RemoteError::Timeout) })
      .await;

    let err = result.unwrap_err();
    assert_eq!(err.as_remote(), Some(&RemoteError::Timeout));
    assert!(session.cache().is_empty().unwrap());
    assert!(!session.loading());
  }

  #[tokio::test]
  async fn test_undecodable_response_is_not_cached() {
    let (layer, session) = layer();

    let result: Result<CacheResult<Option<Vec<u32>>>, _> = layer
      .fetch_with_cache("employees", None, || async { Ok(json!({"not": "a list"})) })
      .await;

    assert!(matches!(result, Err(CacheError::Serialization { .. })));
    assert!(session.cache().is_empty().unwrap());
  }

  #[tokio::test]
  async fn test_corrupt_cached_body_surfaces_error() {
    let (layer, session) = layer();
    let key = CacheKey::build::<Value>("employees", None).unwrap();
    session.cache().lock().unwrap().set(key.clone(), "{not json".to_string());

    let result: Result<CacheResult<Option<Value>>, _> = layer
      .fetch_with_cache("employees", None, || async { Ok(json!([])) })
      .await;

    assert!(matches!(result, Err(CacheError::Serialization { .. })));
    assert_eq!(session.cache().peek(&key).unwrap().unwrap().body, "{not json");
  }

  #[tokio::test]
  async fn test_fetch_without_cache_never_populates() {
    let (layer, session) = layer();
    let calls = AtomicUsize::new(0);
    let fetch = || async {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok(json!([1]))
    };

    for _ in 0..3 {
      let result: CacheResult<Option<Vec<u32>>> =
        layer.fetch_without_cache("employees", fetch).await.unwrap();
      assert_eq!(result.data, Some(vec![1]));
    }
    assert!(session.cache().is_empty().unwrap());

    let _: CacheResult<Option<Vec<u32>>> =
      layer.fetch_with_cache("employees", None, fetch).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
  }
}
