//! Transactions client with transparent caching.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

use crate::cache::{CacheError, CacheLayer, CacheMaintainer, PatchSummary, Session};

use super::cache::transaction_policy;
use super::endpoint::Endpoint;
use super::remote::RemoteSource;
use super::types::{
  Employee, PaginatedRequestParams, PaginatedResponse, RequestByEmployeeParams,
  SetTransactionApprovalParams, Transaction,
};

/// Transactions API client backed by the session's response cache.
///
/// Every client built from the same [`Session`] shares one cache and one
/// loading flag.
pub struct TransactionClient<R> {
  remote: Arc<R>,
  session: Session,
  cache: CacheLayer,
  maintainer: CacheMaintainer,
}

impl<R: RemoteSource> TransactionClient<R> {
  pub fn new(remote: R, session: &Session) -> Self {
    Self {
      remote: Arc::new(remote),
      session: session.clone(),
      cache: CacheLayer::new(session),
      maintainer: CacheMaintainer::new(session, transaction_policy()),
    }
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  pub fn remote(&self) -> &R {
    &self.remote
  }

  /// Fetch through the cache. A repeated call with equal params is served
  /// without contacting the remote.
  pub async fn fetch_with_cache<T: DeserializeOwned>(
    &self,
    endpoint: Endpoint,
    params: Option<Value>,
  ) -> Result<Option<T>, CacheError> {
    let result = self
      .cache
      .fetch_with_cache(endpoint.as_str(), params.as_ref(), || {
        self.remote.call(endpoint, params.clone())
      })
      .await?;

    Ok(result.data)
  }

  /// Fetch from the remote, bypassing the cache in both directions.
  pub async fn fetch_without_cache<T: DeserializeOwned>(
    &self,
    endpoint: Endpoint,
    params: Option<Value>,
  ) -> Result<Option<T>, CacheError> {
    let result = self
      .cache
      .fetch_without_cache(endpoint.as_str(), || self.remote.call(endpoint, params))
      .await?;

    Ok(result.data)
  }

  pub fn clear_cache(&self) -> Result<(), CacheError> {
    self.maintainer.clear_all()
  }

  /// Drop every entry whose endpoint starts with one of `endpoints`.
  pub fn clear_cache_by_endpoint<I, S>(&self, endpoints: I) -> Result<usize, CacheError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    self.maintainer.clear_by_endpoint_prefix(endpoints)
  }

  /// Set a transaction's approval flag in every cached copy, evicting the
  /// per-employee views.
  pub fn update_record_in_cache(
    &self,
    record_id: &str,
    new_status: bool,
  ) -> Result<PatchSummary, CacheError> {
    self.maintainer.patch_record(record_id, new_status)
  }

  pub fn loading(&self) -> bool {
    self.session.loading()
  }

  pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
    self.session.executor().subscribe()
  }

  // ==========================================================================
  // Typed endpoints
  // ==========================================================================

  /// All employees (cached).
  pub async fn employees(&self) -> Result<Option<Vec<Employee>>, CacheError> {
    self.fetch_with_cache(Endpoint::Employees, None).await
  }

  /// One page of transactions.
  ///
  /// The first page is cached; later pages always come from the remote so
  /// they never collide with the cached first page.
  pub async fn transactions_page(
    &self,
    page: u32,
  ) -> Result<Option<PaginatedResponse<Vec<Transaction>>>, CacheError> {
    let params = to_params(&PaginatedRequestParams { page: Some(page) })?;
    if page == 0 {
      self
        .fetch_with_cache(Endpoint::PaginatedTransactions, Some(params))
        .await
    } else {
      self
        .fetch_without_cache(Endpoint::PaginatedTransactions, Some(params))
        .await
    }
  }

  /// All transactions for one employee (cached).
  pub async fn transactions_by_employee(
    &self,
    employee_id: &str,
  ) -> Result<Option<Vec<Transaction>>, CacheError> {
    let params = to_params(&RequestByEmployeeParams {
      employee_id: employee_id.to_string(),
    })?;
    self
      .fetch_with_cache(Endpoint::TransactionsByEmployee, Some(params))
      .await
  }

  /// Write the approval flag to the remote, then mirror it in the cache.
  pub async fn set_transaction_approval(
    &self,
    transaction_id: &str,
    value: bool,
  ) -> Result<PatchSummary, CacheError> {
    let params = to_params(&SetTransactionApprovalParams {
      transaction_id: transaction_id.to_string(),
      value,
    })?;
    self
      .fetch_without_cache::<Value>(Endpoint::SetTransactionApproval, Some(params))
      .await?;

    self.update_record_in_cache(transaction_id, value)
  }
}

impl<R> Clone for TransactionClient<R> {
  fn clone(&self) -> Self {
    Self {
      remote: Arc::clone(&self.remote),
      session: self.session.clone(),
      cache: self.cache.clone(),
      maintainer: self.maintainer.clone(),
    }
  }
}

fn to_params<P: Serialize>(params: &P) -> Result<Value, CacheError> {
  serde_json::to_value(params).map_err(CacheError::params)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::{CountingRemote, GatedRemote};
  use crate::api::MockRemote;
  use crate::cache::{CacheKey, RemoteError};
  use serde_json::json;

  fn client() -> TransactionClient<CountingRemote<MockRemote>> {
    TransactionClient::new(CountingRemote::builtin(), &Session::default())
  }

  fn approvals(page: &PaginatedResponse<Vec<Transaction>>) -> Vec<(String, bool)> {
    page
      .data
      .iter()
      .map(|t| (t.id.clone(), t.approved))
      .collect()
  }

  #[tokio::test]
  async fn test_repeat_fetch_skips_remote() {
    let client = client();

    let first = client.employees().await.unwrap();
    let second = client.employees().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(client.remote().calls(Endpoint::Employees), 1);
  }

  #[tokio::test]
  async fn test_fetch_without_cache_does_not_populate() {
    let client = client();

    for _ in 0..3 {
      let _: Option<Vec<Employee>> = client
        .fetch_without_cache(Endpoint::Employees, None)
        .await
        .unwrap();
    }
    assert_eq!(client.remote().calls(Endpoint::Employees), 3);

    client.clear_cache().unwrap();
    client.employees().await.unwrap();
    client.employees().await.unwrap();

    assert_eq!(client.remote().calls(Endpoint::Employees), 4);
  }

  #[tokio::test]
  async fn test_later_pages_are_not_cached() {
    let client = client();

    client.transactions_page(0).await.unwrap();
    client.transactions_page(1).await.unwrap();
    client.transactions_page(0).await.unwrap();
    client.transactions_page(1).await.unwrap();

    assert_eq!(client.remote().calls(Endpoint::PaginatedTransactions), 3);
    assert_eq!(client.session().cache().len().unwrap(), 1);
  }

  #[tokio::test]
  async fn test_clear_cache_by_endpoint_prefix() {
    let client = client();
    client.employees().await.unwrap();
    client.transactions_page(0).await.unwrap();
    client.transactions_by_employee("e1").await.unwrap();
    client.transactions_by_employee("e2").await.unwrap();

    let removed = client.clear_cache_by_endpoint(["transactions"]).unwrap();

    assert_eq!(removed, 2);
    let keys = client.session().cache().keys().unwrap();
    let mut endpoints: Vec<&str> = keys.iter().map(|k| k.endpoint()).collect();
    endpoints.sort_unstable();
    assert_eq!(endpoints, vec!["employees", "paginatedTransactions"]);
  }

  #[tokio::test]
  async fn test_clear_cache_by_endpoint_accepts_endpoints() {
    let client = client();
    client.employees().await.unwrap();
    client.transactions_page(0).await.unwrap();

    client
      .clear_cache_by_endpoint([Endpoint::PaginatedTransactions])
      .unwrap();

    let key = CacheKey::build::<Value>(Endpoint::Employees.as_str(), None).unwrap();
    assert_eq!(client.session().cache().keys().unwrap(), vec![key]);
  }

  #[tokio::test]
  async fn test_update_record_patches_cached_page() {
    let client = client();
    let before = client.transactions_page(0).await.unwrap().unwrap();
    assert!(!before.data[0].approved);

    client.update_record_in_cache("t1", true).unwrap();
    let after = client.transactions_page(0).await.unwrap().unwrap();

    assert_eq!(client.remote().calls(Endpoint::PaginatedTransactions), 1);
    let mut expected = approvals(&before);
    expected[0].1 = true;
    assert_eq!(approvals(&after), expected);
    assert_eq!(after.next_page, before.next_page);
    assert_eq!(after.data[1..], before.data[1..]);
  }

  #[tokio::test]
  async fn test_update_record_twice_matches_once() {
    let client = client();
    client.transactions_page(0).await.unwrap();

    client.update_record_in_cache("t2", true).unwrap();
    let once = client.transactions_page(0).await.unwrap();
    client.update_record_in_cache("t2", true).unwrap();
    let twice = client.transactions_page(0).await.unwrap();

    assert_eq!(once, twice);
  }

  #[tokio::test]
  async fn test_set_transaction_approval() {
    let client = client();
    client.transactions_page(0).await.unwrap();
    client.transactions_by_employee("e1").await.unwrap();

    let summary = client.set_transaction_approval("t1", true).await.unwrap();

    assert_eq!(summary.patched, 1);
    assert_eq!(summary.evicted, 1);
    assert_eq!(client.remote().inner().approval("t1"), Some(true));

    let page = client.transactions_page(0).await.unwrap().unwrap();
    assert!(page.data[0].approved);
    assert_eq!(client.remote().calls(Endpoint::PaginatedTransactions), 1);

    let by_employee = client.transactions_by_employee("e1").await.unwrap().unwrap();
    assert!(by_employee.iter().any(|t| t.id == "t1" && t.approved));
    assert_eq!(client.remote().calls(Endpoint::TransactionsByEmployee), 2);
  }

  #[tokio::test]
  async fn test_failed_approval_leaves_cache_alone() {
    let client = client();
    client.transactions_page(0).await.unwrap();
    let key = client.session().cache().keys().unwrap().remove(0);
    let before = client.session().cache().peek(&key).unwrap();

    let err = client
      .set_transaction_approval("missing", true)
      .await
      .unwrap_err();

    assert!(matches!(err.as_remote(), Some(RemoteError::NotFound(_))));
    assert_eq!(client.session().cache().peek(&key).unwrap(), before);
    assert!(!client.loading());
  }

  #[tokio::test]
  async fn test_loading_flag_lifecycle() {
    let remote = GatedRemote::new(Ok(json!([])));
    let client = TransactionClient::new(remote.clone(), &Session::default());
    assert!(!client.loading());

    let task = tokio::spawn({
      let client = client.clone();
      async move { client.employees().await }
    });

    remote.wait_entered().await;
    assert!(client.loading());

    remote.release();
    assert_eq!(task.await.unwrap().unwrap(), Some(vec![]));
    assert!(!client.loading());
  }

  #[tokio::test]
  async fn test_loading_flag_cleared_on_remote_failure() {
    let remote = GatedRemote::new(Err(RemoteError::Unavailable("down".to_string())));
    let client = TransactionClient::new(remote.clone(), &Session::default());
    let mut loading = client.subscribe_loading();

    let task = tokio::spawn({
      let client = client.clone();
      async move { client.employees().await }
    });

    loading.wait_for(|l| *l).await.unwrap();
    remote.release();

    let err = task.await.unwrap().unwrap_err();
    assert_eq!(
      err.as_remote(),
      Some(&RemoteError::Unavailable("down".to_string()))
    );
    assert!(!client.loading());
    assert!(client.session().cache().is_empty().unwrap());
  }

  #[tokio::test]
  async fn test_clients_share_session_state() {
    let session = Session::default();
    let a = TransactionClient::new(CountingRemote::builtin(), &session);
    let b = TransactionClient::new(CountingRemote::builtin(), &session);

    a.employees().await.unwrap();
    b.employees().await.unwrap();

    assert_eq!(a.remote().calls(Endpoint::Employees), 1);
    assert_eq!(b.remote().total_calls(), 0);
  }
}
