//! Content-addressed resource cache with single-flight production.
//!
//! [`ResourceCache::remember`] memoizes the result of an expensive producer
//! (typically a transform) under the key derived from a caller-supplied
//! [`Fingerprint`], tagged for bulk invalidation.
//!
//! # Guarantees
//!
//! - **Hit**: the stored mapping is returned and the producer is never called.
//! - **Miss**: the producer runs exactly once per key at a time. Concurrent
//!   callers for the same key wait for the in-flight production and then read
//!   its result (single-flight). A failed or cancelled production is not
//!   stored; waiters wake up and one of them becomes the next producer.
//! - **Invalidation**: [`ResourceCache::invalidate_by_tag`] purges every entry
//!   carrying the tag. A production that raced an invalidation of one of its
//!   tags is returned to its caller but not stored.
//! - **Expiry**: entries stored with a TTL are misses once it elapses and are
//!   swept from the backend on a later write or by
//!   [`ResourceCache::purge_expired`]. A TTL too large to represent never
//!   expires.
//! - **Degradation**: backend errors are logged and treated as misses; the
//!   cache never fails a request.
//!
//! # Coordination
//!
//! In-flight productions are tracked in a DashMap of [`Notify`] handles. The
//! first caller reserves the slot; later callers register on the handle
//! *before* releasing the map entry so a completion between the two steps is
//! never missed. The slot is released by a drop guard, so a producer future
//! that is dropped mid-flight (client disconnect) still wakes its waiters.

mod backend;
mod fingerprint;

pub use backend::{CacheBackend, CacheEntry, MemoryBackend};
pub use fingerprint::{CacheKey, Fingerprint, KeyPart};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::constants::PENDING_STATE_TIMEOUT;
use crate::core::TransformError;
use crate::model::Mapping;

#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    productions: AtomicU64,
    coalesced: AtomicU64,
    backend_errors: AtomicU64,
}

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    /// Producer invocations, including failed ones
    pub productions: u64,
    /// Hits served after waiting on another caller's production
    pub coalesced: u64,
    pub backend_errors: u64,
}

impl CacheStatsSnapshot {
    /// Hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Releases an in-flight slot and wakes its waiters when dropped.
struct FlightGuard<'a> {
    in_flight: &'a DashMap<CacheKey, Arc<Notify>>,
    key: CacheKey,
    notify: Arc<Notify>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove_if(&self.key, |_, current| Arc::ptr_eq(current, &self.notify));
        self.notify.notify_waiters();
    }
}

/// Invalidation counters; stores compare them under the read lock,
/// invalidations and clears bump them under the write lock.
///
/// `tags` holds one counter per tag invalidated since the last clear, so it is
/// bounded by the tag vocabulary and emptied by [`ResourceCache::clear`].
#[derive(Debug, Default)]
struct TagEpochs {
    generation: u64,
    tags: HashMap<String, u64>,
}

impl TagEpochs {
    fn snapshot(&self, tags: &BTreeSet<String>) -> (u64, Vec<u64>) {
        let counters = tags.iter().map(|tag| self.tags.get(tag).copied().unwrap_or(0)).collect();
        (self.generation, counters)
    }
}

/// Tag-invalidated memoization layer with at-most-one production per key.
pub struct ResourceCache {
    backend: Arc<dyn CacheBackend>,
    in_flight: DashMap<CacheKey, Arc<Notify>>,
    tag_epochs: RwLock<TagEpochs>,
    default_ttl: Option<Duration>,
    pending_timeout: Duration,
    stats: CacheStats,
}

impl ResourceCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            in_flight: DashMap::new(),
            tag_epochs: RwLock::new(TagEpochs::default()),
            default_ttl: None,
            pending_timeout: PENDING_STATE_TIMEOUT,
            stats: CacheStats::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// TTL applied when `remember` is called without one.
    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// How long a caller waits on another caller's production before
    /// producing the value itself.
    #[must_use]
    pub fn with_pending_timeout(mut self, timeout: Duration) -> Self {
        self.pending_timeout = timeout;
        self
    }

    /// Return the cached mapping for `fingerprint`, producing and storing it on
    /// a miss.
    ///
    /// # Errors
    ///
    /// Returns the producer's error, or [`TransformError::Cancelled`] when
    /// `cancel` fires while waiting or producing. Backend failures are never
    /// returned.
    pub async fn remember<F, Fut, I>(
        &self,
        fingerprint: &Fingerprint,
        tags: I,
        ttl: Option<Duration>,
        cancel: &CancellationToken,
        producer: F,
    ) -> Result<Mapping, TransformError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Mapping, TransformError>>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let key = fingerprint.key();
        let tags: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        let mut waited = false;
        let mut guard = None;

        loop {
            if cancel.is_cancelled() {
                return Err(TransformError::Cancelled);
            }

            if let Some(value) = self.lookup(&key) {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                if waited {
                    self.stats.coalesced.fetch_add(1, Ordering::Relaxed);
                }
                tracing::debug!(target: "cache", "Cache hit for {key}");
                return Ok(value);
            }

            match self.in_flight.entry(key.clone()) {
                Entry::Occupied(entry) => {
                    let existing = entry.get().clone();
                    // Register before releasing the entry: Notify only wakes
                    // futures that already exist.
                    let notified = existing.notified();
                    drop(entry);
                    waited = true;

                    tracing::debug!(target: "cache", "Waiting for in-flight production of {key}");
                    tokio::select! {
                        _ = notified => continue,
                        _ = cancel.cancelled() => return Err(TransformError::Cancelled),
                        _ = tokio::time::sleep(self.pending_timeout) => {
                            // Leave the other producer's slot alone so its waiters stay attached.
                            tracing::warn!(
                                target: "cache",
                                "Timeout waiting for production of {key} - producing anyway"
                            );
                            break;
                        }
                    }
                }
                Entry::Vacant(entry) => {
                    let notify = Arc::new(Notify::new());
                    entry.insert(notify.clone());
                    guard = Some(FlightGuard {
                        in_flight: &self.in_flight,
                        key: key.clone(),
                        notify,
                    });
                    break;
                }
            }
        }

        // A production may have completed between our lookup and the reservation.
        if guard.is_some()
            && let Some(value) = self.lookup(&key)
        {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        let epochs = self.epochs_for(&tags);
        tracing::debug!(target: "cache", "Cache miss for {key}, producing");

        let produced = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransformError::Cancelled),
            result = producer() => result,
        };
        self.stats.productions.fetch_add(1, Ordering::Relaxed);

        if let Ok(value) = &produced {
            // A TTL too large to represent as an instant never expires.
            let expires_at = ttl.or(self.default_ttl).and_then(|ttl| Instant::now().checked_add(ttl));
            self.store_if_current(
                CacheEntry {
                    key,
                    value: value.clone(),
                    tags,
                    expires_at,
                },
                &epochs,
            );
        }

        drop(guard);
        produced
    }

    /// Purge every entry tagged with `tag`. Returns the number of entries
    /// removed (0 when the backend is unavailable).
    pub fn invalidate_by_tag(&self, tag: &str) -> usize {
        let mut epochs = self.tag_epochs.write().unwrap_or_else(PoisonError::into_inner);
        *epochs.tags.entry(tag.to_string()).or_insert(0) += 1;

        match self.backend.invalidate_by_tag(tag) {
            Ok(removed) => {
                tracing::debug!(target: "cache", "Invalidated {removed} entries tagged '{tag}'");
                removed
            }
            Err(error) => {
                self.stats.backend_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(target: "cache", "Failed to invalidate tag '{tag}': {error}");
                0
            }
        }
    }

    /// Drop every stored entry and reset the invalidation counters.
    ///
    /// Productions that started before the clear are not stored.
    pub fn clear(&self) {
        let mut epochs = self.tag_epochs.write().unwrap_or_else(PoisonError::into_inner);
        epochs.generation += 1;
        epochs.tags.clear();
        if let Err(error) = self.backend.clear() {
            self.stats.backend_errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(target: "cache", "Failed to clear cache: {error}");
        }
    }

    /// Remove expired entries from the backend. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        match self.backend.purge_expired(Instant::now()) {
            Ok(removed) => removed,
            Err(error) => {
                self.stats.backend_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(target: "cache", "Failed to purge expired entries: {error}");
                0
            }
        }
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            productions: self.stats.productions.load(Ordering::Relaxed),
            coalesced: self.stats.coalesced.load(Ordering::Relaxed),
            backend_errors: self.stats.backend_errors.load(Ordering::Relaxed),
        }
    }

    /// Number of productions currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn lookup(&self, key: &CacheKey) -> Option<Mapping> {
        match self.backend.get(key) {
            Ok(entry) => entry.filter(|entry| !entry.is_expired(Instant::now())).map(|entry| entry.value),
            Err(error) => {
                self.stats.backend_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(target: "cache", "Cache read failed for {key}, recomputing: {error}");
                None
            }
        }
    }

    fn epochs_for(&self, tags: &BTreeSet<String>) -> (u64, Vec<u64>) {
        self.tag_epochs.read().unwrap_or_else(PoisonError::into_inner).snapshot(tags)
    }

    fn store_if_current(&self, entry: CacheEntry, before: &(u64, Vec<u64>)) {
        let epochs = self.tag_epochs.read().unwrap_or_else(PoisonError::into_inner);
        if epochs.snapshot(&entry.tags) != *before {
            tracing::debug!(
                target: "cache",
                "Not storing {}: the cache was invalidated during production",
                entry.key
            );
            return;
        }

        let key = entry.key.clone();
        if let Err(error) = self.backend.set(entry) {
            self.stats.backend_errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(target: "cache", "Cache write failed for {key}: {error}");
        }
    }
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("in_flight", &self.in_flight.len())
            .field("default_ttl", &self.default_ttl)
            .field("pending_timeout", &self.pending_timeout)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
