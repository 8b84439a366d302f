use std::fmt;

/// Logical remote operations exposed by the transactions API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
  /// List all employees
  Employees,
  /// One page of all transactions
  PaginatedTransactions,
  /// All transactions for one employee
  TransactionsByEmployee,
  /// Set a transaction's approval flag
  SetTransactionApproval,
}

impl Endpoint {
  pub const ALL: [Endpoint; 4] = [
    Endpoint::Employees,
    Endpoint::PaginatedTransactions,
    Endpoint::TransactionsByEmployee,
    Endpoint::SetTransactionApproval,
  ];

  /// Identifier used as the endpoint segment of cache keys.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Employees => "employees",
      Self::PaginatedTransactions => "paginatedTransactions",
      Self::TransactionsByEmployee => "transactionsByEmployee",
      Self::SetTransactionApproval => "setTransactionApproval",
    }
  }
}

impl AsRef<str> for Endpoint {
  fn as_ref(&self) -> &str {
    self.as_str()
  }
}

impl fmt::Display for Endpoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
