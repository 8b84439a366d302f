//! Session-scoped response caching.
//!
//! This module is API-agnostic. It provides:
//! - Deterministic cache keys from an endpoint identifier plus params
//! - An in-memory response store shared by one session
//! - A request executor that owns the session's loading flag
//! - Read-through and cache-bypassing fetches
//! - Invalidation by endpoint prefix and in-place patching of cached records

mod error;
mod executor;
mod key;
mod layer;
mod maintainer;
mod session;
mod storage;
mod traits;

pub use error::{CacheError, RemoteError};
pub use executor::RequestExecutor;
pub use key::{CacheKey, KEY_SEPARATOR};
pub use layer::CacheLayer;
pub use maintainer::{CacheMaintainer, PatchSummary, Payload, RecordPolicy};
pub use session::Session;
pub use storage::{CachedEntry, ResponseCache, SharedCache};
pub use traits::{CacheResult, CacheSource};
