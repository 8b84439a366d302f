//! Stateful views over the transactions client.
//!
//! Each resource owns the data one screen needs and tracks its own loading
//! state, while all of them share the session cache through the client.
//!
//! # Example
//!
//! ```ignore
//! let mut transactions = PaginatedTransactionsResource::new(client.clone());
//!
//! // First call loads page 0, each later call appends the next page
//! transactions.fetch_all().await?;
//! transactions.fetch_all().await?;
//!
//! match transactions.state() {
//!     ResourceState::Ready(page) => render(&page.data),
//!     ResourceState::Failed(e) => render_error(e),
//!     _ => render_spinner(),
//! }
//! ```

use crate::api::types::{Employee, PaginatedResponse, Transaction};
use crate::api::{RemoteSource, TransactionClient};
use crate::cache::CacheError;

/// The state of a resource
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceState<T> {
  /// Nothing requested yet, or invalidated
  Idle,
  /// A request is in flight
  Loading,
  /// Data is available
  Ready(T),
  /// The last request failed
  Failed(String),
}

impl<T> ResourceState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, ResourceState::Loading)
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      ResourceState::Ready(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      ResourceState::Failed(e) => Some(e),
      _ => None,
    }
  }

  fn settle(&mut self, result: Result<T, CacheError>) -> Result<(), CacheError> {
    match result {
      Ok(data) => {
        *self = ResourceState::Ready(data);
        Ok(())
      }
      Err(e) => {
        *self = ResourceState::Failed(e.to_string());
        Err(e)
      }
    }
  }
}

impl<T> Default for ResourceState<T> {
  fn default() -> Self {
    ResourceState::Idle
  }
}

/// Employee list for the filter picker.
pub struct EmployeesResource<R> {
  client: TransactionClient<R>,
  state: ResourceState<Vec<Employee>>,
}

impl<R: RemoteSource> EmployeesResource<R> {
  pub fn new(client: TransactionClient<R>) -> Self {
    Self {
      client,
      state: ResourceState::Idle,
    }
  }

  pub fn state(&self) -> &ResourceState<Vec<Employee>> {
    &self.state
  }

  pub async fn fetch_all(&mut self) -> Result<(), CacheError> {
    self.state = ResourceState::Loading;
    let result = self.client.employees().await.map(Option::unwrap_or_default);
    self.state.settle(result)
  }

  pub fn invalidate(&mut self) {
    self.state = ResourceState::Idle;
  }
}

/// All transactions, loaded one page at a time and accumulated.
pub struct PaginatedTransactionsResource<R> {
  client: TransactionClient<R>,
  state: ResourceState<PaginatedResponse<Vec<Transaction>>>,
}

impl<R: RemoteSource> PaginatedTransactionsResource<R> {
  pub fn new(client: TransactionClient<R>) -> Self {
    Self {
      client,
      state: ResourceState::Idle,
    }
  }

  pub fn state(&self) -> &ResourceState<PaginatedResponse<Vec<Transaction>>> {
    &self.state
  }

  /// True until the last page has been loaded.
  pub fn has_more(&self) -> bool {
    match self.state.data() {
      Some(page) => page.next_page.is_some(),
      None => true,
    }
  }

  /// Load the next page and append it. A no-op once every page is loaded.
  pub async fn fetch_all(&mut self) -> Result<(), CacheError> {
    let page = match self.state.data() {
      None => 0,
      Some(current) => match current.next_page {
        Some(next) => next,
        None => return Ok(()),
      },
    };

    let previous = std::mem::replace(&mut self.state, ResourceState::Loading);
    let result = self.client.transactions_page(page).await.map(|response| {
      let mut merged = match previous {
        ResourceState::Ready(current) => current,
        _ => PaginatedResponse {
          data: Vec::new(),
          next_page: None,
        },
      };
      match response {
        Some(response) => {
          merged.data.extend(response.data);
          merged.next_page = response.next_page;
        }
        None => merged.next_page = None,
      }
      merged
    });
    self.state.settle(result)
  }

  pub fn invalidate(&mut self) {
    self.state = ResourceState::Idle;
  }
}

/// Transactions for the currently selected employee.
pub struct TransactionsByEmployeeResource<R> {
  client: TransactionClient<R>,
  state: ResourceState<Vec<Transaction>>,
}

impl<R: RemoteSource> TransactionsByEmployeeResource<R> {
  pub fn new(client: TransactionClient<R>) -> Self {
    Self {
      client,
      state: ResourceState::Idle,
    }
  }

  pub fn state(&self) -> &ResourceState<Vec<Transaction>> {
    &self.state
  }

  pub async fn fetch_by_id(&mut self, employee_id: &str) -> Result<(), CacheError> {
    self.state = ResourceState::Loading;
    let result = self
      .client
      .transactions_by_employee(employee_id)
      .await
      .map(Option::unwrap_or_default);
    self.state.settle(result)
  }

  pub fn invalidate(&mut self) {
    self.state = ResourceState::Idle;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::CountingRemote;
  use crate::api::{Endpoint, MockRemote};
  use crate::cache::{RemoteError, Session};
  use serde_json::Value;
  use std::future::Future;

  fn client() -> TransactionClient<CountingRemote<MockRemote>> {
    TransactionClient::new(CountingRemote::builtin(), &Session::default())
  }

  struct DownRemote;

  impl RemoteSource for DownRemote {
    fn call(
      &self,
      _endpoint: Endpoint,
      _params: Option<Value>,
    ) -> impl Future<Output = Result<Value, RemoteError>> + Send {
      async { Err(RemoteError::Timeout) }
    }
  }

  #[tokio::test]
  async fn test_employees_resource() {
    let mut employees = EmployeesResource::new(client());
    assert_eq!(employees.state(), &ResourceState::Idle);

    employees.fetch_all().await.unwrap();

    assert_eq!(employees.state().data().map(Vec::len), Some(4));
  }

  #[tokio::test]
  async fn test_paginated_resource_accumulates_pages() {
    let client = client();
    let mut transactions = PaginatedTransactionsResource::new(client.clone());

    while transactions.has_more() {
      transactions.fetch_all().await.unwrap();
    }

    let loaded = transactions.state().data().unwrap();
    assert_eq!(loaded.data.len(), 12);
    assert_eq!(loaded.next_page, None);
    assert_eq!(client.remote().calls(Endpoint::PaginatedTransactions), 3);

    // Exhausted: no further remote calls
    transactions.fetch_all().await.unwrap();
    assert_eq!(client.remote().calls(Endpoint::PaginatedTransactions), 3);
  }

  #[tokio::test]
  async fn test_paginated_resource_first_page_comes_from_cache_after_invalidate() {
    let client = client();
    let mut transactions = PaginatedTransactionsResource::new(client.clone());
    transactions.fetch_all().await.unwrap();

    transactions.invalidate();
    assert_eq!(transactions.state(), &ResourceState::Idle);
    transactions.fetch_all().await.unwrap();

    assert_eq!(transactions.state().data().unwrap().data.len(), 5);
    assert_eq!(client.remote().calls(Endpoint::PaginatedTransactions), 1);
  }

  #[tokio::test]
  async fn test_by_employee_resource_replaces_data() {
    let mut by_employee = TransactionsByEmployeeResource::new(client());

    by_employee.fetch_by_id("e1").await.unwrap();
    assert!(by_employee
      .state()
      .data()
      .unwrap()
      .iter()
      .all(|t| t.employee.id == "e1"));

    by_employee.fetch_by_id("e4").await.unwrap();
    assert!(by_employee
      .state()
      .data()
      .unwrap()
      .iter()
      .all(|t| t.employee.id == "e4"));
  }

  #[tokio::test]
  async fn test_failure_is_recorded() {
    let client = TransactionClient::new(DownRemote, &Session::default());
    let mut employees = EmployeesResource::new(client);

    assert!(employees.fetch_all().await.is_err());
    assert_eq!(employees.state().error(), Some("remote call timed out"));
  }
}
