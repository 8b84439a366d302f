//! Remote doubles for tests.

use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::cache::RemoteError;

use super::endpoint::Endpoint;
use super::mock::{Dataset, MockRemote};
use super::remote::RemoteSource;

/// Wraps another remote and counts calls per endpoint.
#[derive(Clone)]
pub struct CountingRemote<R> {
  inner: R,
  calls: Arc<Mutex<HashMap<Endpoint, usize>>>,
}

impl CountingRemote<MockRemote> {
  pub fn builtin() -> Self {
    Self::new(MockRemote::new(Dataset::builtin()))
  }
}

impl<R: RemoteSource> CountingRemote<R> {
  pub fn new(inner: R) -> Self {
    Self {
      inner,
      calls: Arc::default(),
    }
  }

  pub fn inner(&self) -> &R {
    &self.inner
  }

  pub fn calls(&self, endpoint: Endpoint) -> usize {
    self
      .calls
      .lock()
      .unwrap()
      .get(&endpoint)
      .copied()
      .unwrap_or(0)
  }

  pub fn total_calls(&self) -> usize {
    self.calls.lock().unwrap().values().sum()
  }
}

impl<R: RemoteSource> RemoteSource for CountingRemote<R> {
  fn call(
    &self,
    endpoint: Endpoint,
    params: Option<Value>,
  ) -> impl Future<Output = Result<Value, RemoteError>> + Send {
    *self.calls.lock().unwrap().entry(endpoint).or_default() += 1;
    self.inner.call(endpoint, params)
  }
}

/// Remote whose calls block until released, then answer with a fixed result.
#[derive(Clone)]
pub struct GatedRemote {
  gate: Arc<Notify>,
  entered: Arc<Notify>,
  result: Result<Value, RemoteError>,
}

impl GatedRemote {
  pub fn new(result: Result<Value, RemoteError>) -> Self {
    Self {
      gate: Arc::new(Notify::new()),
      entered: Arc::new(Notify::new()),
      result,
    }
  }

  /// Wait until a call is blocked on the gate.
  pub async fn wait_entered(&self) {
    self.entered.notified().await;
  }

  /// Let one blocked call finish.
  pub fn release(&self) {
    self.gate.notify_one();
  }
}

impl RemoteSource for GatedRemote {
  fn call(
    &self,
    _endpoint: Endpoint,
    _params: Option<Value>,
  ) -> impl Future<Output = Result<Value, RemoteError>> + Send {
    let remote = self.clone();
    async move {
      remote.entered.notify_one();
      remote.gate.notified().await;
      remote.result.clone()
    }
  }
}
