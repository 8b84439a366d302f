//! In-memory remote that serves the transactions API from a fixed dataset.

use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::cache::RemoteError;

use super::endpoint::Endpoint;
use super::remote::RemoteSource;
use super::types::{
  Employee, PaginatedRequestParams, PaginatedResponse, RequestByEmployeeParams,
  SetTransactionApprovalParams, Transaction,
};

pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Employees and transactions served by [`MockRemote`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
  pub employees: Vec<Employee>,
  pub transactions: Vec<Transaction>,
}

impl Dataset {
  /// Load a dataset from a JSON file.
  pub fn load(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read dataset {}: {}", path.display(), e))?;

    serde_json::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse dataset {}: {}", path.display(), e))
  }

  /// Small dataset used when no file is configured.
  pub fn builtin() -> Self {
    let employees = vec![
      employee("e1", "James", "Smith"),
      employee("e2", "Mary", "Johnson"),
      employee("e3", "Robert", "Williams"),
      employee("e4", "Patricia", "Brown"),
    ];

    let rows: [(&str, f64, usize, &str, &str); 12] = [
      ("t1", 250.0, 0, "Wirebase", "2021-09-15"),
      ("t2", 35.5, 1, "Vinta", "2021-09-17"),
      ("t3", 1200.0, 2, "Fieldmark", "2021-09-20"),
      ("t4", 42.99, 3, "Social Media Ads Inc", "2021-09-21"),
      ("t5", 89.0, 0, "Coffee Co", "2021-09-22"),
      ("t6", 310.25, 1, "Cloudhost", "2021-09-24"),
      ("t7", 15.0, 2, "Taxi Express", "2021-09-25"),
      ("t8", 640.0, 3, "Office Supply Depot", "2021-09-27"),
      ("t9", 77.7, 0, "Wirebase", "2021-09-28"),
      ("t10", 5.25, 1, "Coffee Co", "2021-09-29"),
      ("t11", 980.0, 2, "Cloudhost", "2021-09-30"),
      ("t12", 120.0, 3, "Vinta", "2021-10-01"),
    ];

    let transactions = rows
      .iter()
      .map(|&(id, amount, owner, merchant, date)| Transaction {
        id: id.to_string(),
        amount,
        employee: employees[owner].clone(),
        merchant: merchant.to_string(),
        date: date.to_string(),
        approved: false,
      })
      .collect();

    Self {
      employees,
      transactions,
    }
  }
}

fn employee(id: &str, first_name: &str, last_name: &str) -> Employee {
  Employee {
    id: id.to_string(),
    first_name: first_name.to_string(),
    last_name: last_name.to_string(),
  }
}

/// Remote that answers from an in-memory [`Dataset`] after a simulated delay.
///
/// Approval writes are applied to the dataset, so later reads observe them.
#[derive(Clone)]
pub struct MockRemote {
  data: Arc<Mutex<Dataset>>,
  latency: Duration,
  page_size: usize,
}

impl MockRemote {
  pub fn new(dataset: Dataset) -> Self {
    Self {
      data: Arc::new(Mutex::new(dataset)),
      latency: Duration::ZERO,
      page_size: DEFAULT_PAGE_SIZE,
    }
  }

  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }

  pub fn with_page_size(mut self, page_size: usize) -> Self {
    self.page_size = page_size.max(1);
    self
  }

  /// Current approval flag of a transaction, read straight from the dataset.
  pub fn approval(&self, transaction_id: &str) -> Option<bool> {
    let data = self.data.lock().ok()?;
    data
      .transactions
      .iter()
      .find(|t| t.id == transaction_id)
      .map(|t| t.approved)
  }

  fn respond(&self, endpoint: Endpoint, params: Option<Value>) -> Result<Value, RemoteError> {
    let mut data = self
      .data
      .lock()
      .map_err(|e| RemoteError::Unavailable(format!("dataset lock poisoned: {}", e)))?;

    match endpoint {
      Endpoint::Employees => to_json(&data.employees),

      Endpoint::PaginatedTransactions => {
        let params: PaginatedRequestParams = parse_params(endpoint, params)?;
        let page = params
          .page
          .ok_or_else(|| RemoteError::InvalidParams("page is required".to_string()))?;
        to_json(&self.paginate(&data.transactions, page)?)
      }

      Endpoint::TransactionsByEmployee => {
        let params: RequestByEmployeeParams = parse_params(endpoint, params)?;
        if params.employee_id.is_empty() {
          return Err(RemoteError::InvalidParams("employeeId is required".to_string()));
        }
        let matching: Vec<&Transaction> = data
          .transactions
          .iter()
          .filter(|t| t.employee.id == params.employee_id)
          .collect();
        to_json(&matching)
      }

      Endpoint::SetTransactionApproval => {
        let params: SetTransactionApprovalParams = parse_params(endpoint, params)?;
        let transaction = data
          .transactions
          .iter_mut()
          .find(|t| t.id == params.transaction_id)
          .ok_or_else(|| RemoteError::NotFound(format!("transaction {}", params.transaction_id)))?;
        transaction.approved = params.value;
        Ok(Value::Null)
      }
    }
  }

  fn paginate(
    &self,
    transactions: &[Transaction],
    page: u32,
  ) -> Result<PaginatedResponse<Vec<Transaction>>, RemoteError> {
    let out_of_range = || RemoteError::InvalidParams(format!("page {} is out of range", page));

    let start = (page as usize)
      .checked_mul(self.page_size)
      .ok_or_else(out_of_range)?;
    if start > 0 && start >= transactions.len() {
      return Err(out_of_range());
    }

    let end = start
      .saturating_add(self.page_size)
      .min(transactions.len());
    let next_page = (end < transactions.len()).then_some(page + 1);

    Ok(PaginatedResponse {
      data: transactions[start..end].to_vec(),
      next_page,
    })
  }
}

impl RemoteSource for MockRemote {
  fn call(
    &self,
    endpoint: Endpoint,
    params: Option<Value>,
  ) -> impl Future<Output = Result<Value, RemoteError>> + Send {
    let remote = self.clone();
    async move {
      if !remote.latency.is_zero() {
        tokio::time::sleep(remote.latency).await;
      }
      debug!(%endpoint, "mock remote call");
      remote.respond(endpoint, params)
    }
  }
}

fn parse_params<P: DeserializeOwned>(
  endpoint: Endpoint,
  params: Option<Value>,
) -> Result<P, RemoteError> {
  let params =
    params.ok_or_else(|| RemoteError::InvalidParams(format!("{} requires params", endpoint)))?;
  serde_json::from_value(params)
    .map_err(|e| RemoteError::InvalidParams(format!("{}: {}", endpoint, e)))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value, RemoteError> {
  serde_json::to_value(value).map_err(|e| RemoteError::Unavailable(e.to_string()))
}
