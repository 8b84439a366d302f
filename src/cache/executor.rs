//! Request execution with a session-wide loading flag.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

struct LoadingState {
  in_flight: AtomicUsize,
  tx: watch::Sender<bool>,
}

/// Runs remote operations and tracks whether any are outstanding.
///
/// The loading flag is true while at least one `execute` call is pending.
/// Clones share the same flag.
#[derive(Clone)]
pub struct RequestExecutor {
  state: Arc<LoadingState>,
}

impl RequestExecutor {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(false);
    Self {
      state: Arc::new(LoadingState {
        in_flight: AtomicUsize::new(0),
        tx,
      }),
    }
  }

  /// Current value of the loading flag.
  pub fn loading(&self) -> bool {
    *self.state.tx.borrow()
  }

  /// Watch the loading flag for changes.
  pub fn subscribe(&self) -> watch::Receiver<bool> {
    self.state.tx.subscribe()
  }

  /// Run `operation`, holding the loading flag for its duration.
  ///
  /// Errors are returned unchanged. The flag is released on success, on
  /// error, and if the returned future is dropped before completion.
  pub async fn execute<T, E, Fut>(&self, operation: Fut) -> Result<T, E>
  where
    Fut: Future<Output = Result<T, E>>,
  {
    let _guard = LoadingGuard::acquire(&self.state);
    operation.await
  }
}

impl Default for RequestExecutor {
  fn default() -> Self {
    Self::new()
  }
}

struct LoadingGuard<'a> {
  state: &'a LoadingState,
}

impl<'a> LoadingGuard<'a> {
  fn acquire(state: &'a LoadingState) -> Self {
    // Counter updates happen under the watch lock so flag and count agree
    state.tx.send_if_modified(|loading| {
      state.in_flight.fetch_add(1, Ordering::SeqCst);
      let changed = !*loading;
      *loading = true;
      changed
    });
    Self { state }
  }
}

impl Drop for LoadingGuard<'_> {
  fn drop(&mut self) {
    let state = self.state;
    state.tx.send_if_modified(|loading| {
      let remaining = state.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
      if remaining == 0 && *loading {
        *loading = false;
        true
      } else {
        false
      }
    });
  }
}
