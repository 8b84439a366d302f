use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::cache::RemoteError;

use super::endpoint::Endpoint;

/// The remote call boundary supplied by the host application.
///
/// Implementations do their own transport and timeouts; nothing here retries.
pub trait RemoteSource: Send + Sync {
  fn call(
    &self,
    endpoint: Endpoint,
    params: Option<Value>,
  ) -> impl Future<Output = Result<Value, RemoteError>> + Send;
}

impl<R: RemoteSource> RemoteSource for Arc<R> {
  fn call(
    &self,
    endpoint: Endpoint,
    params: Option<Value>,
  ) -> impl Future<Output = Result<Value, RemoteError>> + Send {
    (**self).call(endpoint, params)
  }
}
