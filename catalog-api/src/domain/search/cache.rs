//! Short-lived memoization of search responses.
//!
//! The cache is an injected service with an explicit lifecycle: build it with
//! [`SearchCache::new`], optionally [`SearchCache::start_sweeper`], and
//! [`SearchCache::dispose`] it on shutdown. Clones share the same entries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;
use serde_json::{Map, Value};
use time::{Duration, OffsetDateTime};
use tokio::task::JoinHandle;
use tracing::debug;

use super::parser::normalize_query;
use super::types::SearchFilters;
use crate::domain::clock::Clock;

/// Default time-to-live for cached responses.
pub const DEFAULT_TTL: Duration = Duration::minutes(5);

struct CacheEntry<V> {
    value: Arc<V>,
    expires_at: OffsetDateTime,
}

/// Hit/miss counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because they expired.
    pub evictions: u64,
    pub entries: usize,
}

struct Inner<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    disposed: AtomicBool,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

/// TTL key/value store.
///
/// Concurrent callers racing on one key may both miss and both write; the
/// last write wins.
pub struct SearchCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for SearchCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Send + Sync + 'static> SearchCache<V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(HashMap::new()),
                ttl,
                clock,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
                sweeper: Mutex::new(None),
            }),
        }
    }

    /// Cached value for `key`, if present and not expired.
    ///
    /// An expired entry is removed on access.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        if self.is_disposed() {
            return None;
        }

        let now = self.inner.clock.now();
        let expired = {
            let entries = self.read();
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => {
                    self.inner.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(Arc::clone(&entry.value));
                }
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            let mut entries = self.write();
            if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
                entries.remove(key);
                self.inner.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V) -> Arc<V> {
        let value = Arc::new(value);
        if self.is_disposed() {
            return value;
        }

        let entry = CacheEntry {
            value: Arc::clone(&value),
            expires_at: self.inner.clock.now() + self.inner.ttl,
        };
        self.write().insert(key.into(), entry);
        value
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Drop every entry whose key contains `needle`. Returns how many.
    pub fn clear_by_substring(&self, needle: &str) -> usize {
        self.retain(|key, _| !key.contains(needle))
    }

    /// Drop every entry for which `predicate` holds. Returns how many.
    pub fn invalidate_if<F>(&self, predicate: F) -> usize
    where
        F: Fn(&str, &V) -> bool,
    {
        self.retain(|key, value| !predicate(key, value))
    }

    /// Remove all expired entries. Returns how many.
    pub fn purge_expired(&self) -> usize {
        let now = self.inner.clock.now();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let purged = before - entries.len();
        self.inner
            .evictions
            .fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            evictions: self.inner.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Spawn a task purging expired entries every `period`.
    ///
    /// Replaces a previously started sweeper. Does nothing once disposed.
    pub fn start_sweeper(&self, period: std::time::Duration) {
        if self.is_disposed() {
            return;
        }

        let cache = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if cache.is_empty() {
                    continue;
                }
                let purged = cache.purge_expired();
                if purged > 0 {
                    debug!(purged, "Purged expired search cache entries");
                }
            }
        });

        let mut sweeper = self
            .inner
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = sweeper.replace(handle) {
            previous.abort();
        }
    }

    /// Stop the sweeper and drop all entries. The cache stays empty afterwards.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        if let Some(handle) = self
            .inner
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    fn retain<F>(&self, keep: F) -> usize
    where
        F: Fn(&str, &V) -> bool,
    {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|key, entry| keep(key, &entry.value));
        before - entries.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Canonical cache key for a filter bag.
///
/// Field order, absent vs. null fields, and search-text spacing or case do
/// not change the key. Returns `None` if the filters cannot be serialized.
pub fn cache_key(filters: &SearchFilters) -> Option<String> {
    let mut value = serde_json::to_value(filters).ok()?;

    if let Some(object) = value.as_object_mut() {
        match object.get("search").and_then(Value::as_str).map(normalize_query) {
            Some(search) if !search.is_empty() => {
                object.insert("search".to_string(), Value::String(search));
            }
            _ => {
                object.remove("search");
            }
        }
    }

    serde_json::to_string(&canonicalize(value)).ok()
}

/// Drop nulls and empty objects, and sort object keys, recursively.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut fields: Vec<(String, Value)> = object
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, canonicalize(v)))
                .filter(|(_, v)| !matches!(v, Value::Object(o) if o.is_empty()))
                .collect();
            fields.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(fields.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
