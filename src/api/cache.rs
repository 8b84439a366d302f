//! Cache policy for the transactions API.

use crate::cache::RecordPolicy;

use super::endpoint::Endpoint;

/// Endpoints whose cached payloads contain transactions that can be patched
/// in place.
pub const PATCHED_ENDPOINTS: [Endpoint; 1] = [Endpoint::PaginatedTransactions];

/// Per-employee views of the same transactions. We cannot tell whether every
/// copy was enumerated, so these are dropped after an approval change.
pub const EVICTED_ENDPOINTS: [Endpoint; 1] = [Endpoint::TransactionsByEmployee];

/// Record policy for transaction approval updates.
pub fn transaction_policy() -> RecordPolicy {
  RecordPolicy {
    id_field: "id".to_string(),
    status_field: "approved".to_string(),
    patch_groups: PATCHED_ENDPOINTS.iter().map(|e| e.as_str().to_string()).collect(),
    evict_groups: EVICTED_ENDPOINTS.iter().map(|e| e.as_str().to_string()).collect(),
  }
}
