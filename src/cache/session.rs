use super::executor::RequestExecutor;
use super::storage::{ResponseCache, SharedCache};

/// State owned by one application session.
///
/// The host builds one `Session` and hands it to every consumer; clones share
/// the same cache and loading flag.
#[derive(Clone, Default)]
pub struct Session {
  cache: SharedCache,
  executor: RequestExecutor,
}

impl Session {
  pub fn new(cache: ResponseCache) -> Self {
    Self {
      cache: SharedCache::new(cache),
      executor: RequestExecutor::new(),
    }
  }

  pub fn cache(&self) -> &SharedCache {
    &self.cache
  }

  pub fn executor(&self) -> &RequestExecutor {
    &self.executor
  }

  /// Whether any request is outstanding.
  pub fn loading(&self) -> bool {
    self.executor.loading()
  }
}
