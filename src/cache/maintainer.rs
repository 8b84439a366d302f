//! Invalidation and in-place patching of cached payloads.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::CacheError;
use super::key::CacheKey;
use super::session::Session;
use super::storage::SharedCache;

/// Shape of a cached payload, as far as record patching is concerned.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
  /// Paginated wrapper: an object whose `data` field is a list of records
  Envelope(Map<String, Value>),
  /// A bare list of records
  Sequence(Vec<Value>),
  /// Anything else. Never patched.
  Unrecognized(Value),
}

impl Payload {
  pub fn decode(value: Value) -> Self {
    match value {
      Value::Object(map) if map.get("data").is_some_and(Value::is_array) => Self::Envelope(map),
      Value::Array(items) => Self::Sequence(items),
      other => Self::Unrecognized(other),
    }
  }

  pub fn encode(self) -> Value {
    match self {
      Self::Envelope(map) => Value::Object(map),
      Self::Sequence(items) => Value::Array(items),
      Self::Unrecognized(value) => value,
    }
  }

  /// The records carried by this payload, if it has a recognized shape.
  pub fn records_mut(&mut self) -> Option<&mut Vec<Value>> {
    match self {
      Self::Envelope(map) => map.get_mut("data").and_then(Value::as_array_mut),
      Self::Sequence(items) => Some(items),
      Self::Unrecognized(_) => None,
    }
  }
}

/// Which cache entries hold records and how records are identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPolicy {
  /// Field holding the stable record id
  pub id_field: String,
  /// Field holding the mutable status flag
  pub status_field: String,
  /// Endpoints whose cached payloads are patched in place
  pub patch_groups: Vec<String>,
  /// Endpoints whose cached payloads are evicted after a patch
  pub evict_groups: Vec<String>,
}

impl RecordPolicy {
  fn patches(&self, endpoint: &str) -> bool {
    self.patch_groups.iter().any(|group| group == endpoint)
  }

  fn evicts(&self, endpoint: &str) -> bool {
    self.evict_groups.iter().any(|group| group == endpoint)
  }

  /// Set the status on every record with a matching id.
  /// Returns the number of records matched.
  fn apply(&self, records: &mut [Value], record_id: &str, new_status: bool) -> usize {
    let mut matched = 0;
    for record in records.iter_mut() {
      let Some(fields) = record.as_object_mut() else {
        continue;
      };
      if fields.get(&self.id_field).and_then(Value::as_str) != Some(record_id) {
        continue;
      }
      fields.insert(self.status_field.clone(), Value::Bool(new_status));
      matched += 1;
    }
    matched
  }
}

/// Outcome of a patch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchSummary {
  /// Entries rewritten with the new status
  pub patched: usize,
  /// Entries removed because they belong to an evict group
  pub evicted: usize,
  /// Entries in a patch group left alone because they could not be decoded
  /// or had an unrecognized shape
  pub skipped: usize,
}

/// Bulk invalidation and record patching over the session cache.
#[derive(Clone)]
pub struct CacheMaintainer {
  cache: SharedCache,
  policy: Arc<RecordPolicy>,
}

impl CacheMaintainer {
  pub fn new(session: &Session, policy: RecordPolicy) -> Self {
    Self {
      cache: session.cache().clone(),
      policy: Arc::new(policy),
    }
  }

  pub fn policy(&self) -> &RecordPolicy {
    &self.policy
  }

  /// Drop every cached entry.
  pub fn clear_all(&self) -> Result<(), CacheError> {
    let mut cache = self.cache.lock()?;
    let removed = cache.len();
    cache.clear();
    info!(removed, "cleared response cache");
    Ok(())
  }

  /// Remove every entry whose endpoint segment starts with one of `prefixes`.
  /// Returns the number of entries removed.
  pub fn clear_by_endpoint_prefix<I, S>(&self, prefixes: I) -> Result<usize, CacheError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let prefixes: Vec<S> = prefixes.into_iter().collect();
    let mut cache = self.cache.lock()?;

    let mut removed = 0;
    for key in cache.keys() {
      if prefixes.iter().any(|p| key.has_endpoint_prefix(p.as_ref())) && cache.delete(&key) {
        debug!(%key, "invalidated");
        removed += 1;
      }
    }

    info!(removed, "cleared cache entries by endpoint prefix");
    Ok(removed)
  }

  /// Set `new_status` on the record `record_id` wherever it is cached.
  ///
  /// Entries in the policy's patch groups are rewritten in place; entries in
  /// its evict groups are removed. Payloads that fail to decode or have an
  /// unrecognized shape are left as they are.
  pub fn patch_record(&self, record_id: &str, new_status: bool) -> Result<PatchSummary, CacheError> {
    let policy = &self.policy;
    let mut summary = PatchSummary::default();
    let mut cache = self.cache.lock()?;

    // Work out every change first so a failure leaves the cache as it was
    let mut evictions: Vec<CacheKey> = Vec::new();
    let mut rewrites: Vec<(CacheKey, String)> = Vec::new();

    for key in cache.keys() {
      let endpoint = key.endpoint();

      if policy.evicts(endpoint) {
        evictions.push(key);
        continue;
      }
      if !policy.patches(endpoint) {
        continue;
      }

      let Some(entry) = cache.peek(&key) else {
        continue;
      };
      let value: Value = match serde_json::from_str(&entry.body) {
        Ok(value) => value,
        Err(e) => {
          warn!(%key, error = %e, "cached payload is not valid JSON, leaving it untouched");
          summary.skipped += 1;
          continue;
        }
      };

      let mut payload = Payload::decode(value);
      let Some(records) = payload.records_mut() else {
        debug!(%key, "unrecognized payload shape, leaving it untouched");
        summary.skipped += 1;
        continue;
      };
      if policy.apply(records, record_id, new_status) == 0 {
        continue;
      }

      let body = serde_json::to_string(&payload.encode()).map_err(CacheError::encode)?;
      rewrites.push((key, body));
    }

    for key in evictions {
      if cache.delete(&key) {
        debug!(%key, "evicted derived entry");
        summary.evicted += 1;
      }
    }
    for (key, body) in rewrites {
      cache.set(key, body);
      summary.patched += 1;
    }

    info!(
      record_id,
      new_status,
      patched = summary.patched,
      evicted = summary.evicted,
      skipped = summary.skipped,
      "patched record in cache"
    );
    Ok(summary)
  }
}
