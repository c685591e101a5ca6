//! Storage backends for the resource cache.

use dashmap::DashMap;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use super::fingerprint::CacheKey;
use crate::core::CacheError;
use crate::model::Mapping;

/// A stored mapping with its invalidation tags and expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub value: Mapping,
    pub tags: BTreeSet<String>,
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Key/value store with tag-based invalidation.
///
/// Errors are reported but never fail a request: the resource cache treats a
/// failing backend as a permanent miss.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    fn set(&self, entry: CacheEntry) -> Result<(), CacheError>;

    /// Remove every entry carrying `tag`; returns how many were removed.
    fn invalidate_by_tag(&self, tag: &str) -> Result<usize, CacheError>;

    fn clear(&self) -> Result<(), CacheError>;

    /// Remove every entry expired at `now`; returns how many were removed.
    ///
    /// Backends with native expiry can keep the default.
    fn purge_expired(&self, _now: Instant) -> Result<usize, CacheError> {
        Ok(0)
    }
}

/// In-process backend on top of DashMap.
///
/// Expired entries are swept on write once the earliest known expiry has
/// passed, and the tag index only holds keys of stored entries.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<CacheKey, CacheEntry>,
    tags: DashMap<String, HashSet<CacheKey>>,
    next_expiry: Mutex<Option<Instant>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of tags with at least one stored entry.
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    fn untag(&self, key: &CacheKey, tags: &BTreeSet<String>) {
        for tag in tags {
            if let Some(mut keys) = self.tags.get_mut(tag) {
                keys.remove(key);
            }
            self.tags.remove_if(tag, |_, keys| keys.is_empty());
        }
    }

    fn sweep(&self, now: Instant) -> usize {
        let mut expired = Vec::new();
        self.entries.retain(|key, entry| {
            if entry.is_expired(now) {
                expired.push((key.clone(), std::mem::take(&mut entry.tags)));
                false
            } else {
                true
            }
        });
        for (key, tags) in &expired {
            self.untag(key, tags);
        }

        let next = self.entries.iter().filter_map(|entry| entry.expires_at).min();
        *self.next_expiry.lock().unwrap_or_else(PoisonError::into_inner) = next;
        expired.len()
    }

    fn sweep_if_due(&self, now: Instant) {
        let due = self
            .next_expiry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some_and(|next| next <= now);
        if due {
            let removed = self.sweep(now);
            tracing::debug!(target: "cache", "Swept {removed} expired entries");
        }
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let entry = match self.entries.get(key) {
            Some(entry) => entry.clone(),
            None => return Ok(None),
        };

        let now = Instant::now();
        if entry.is_expired(now) {
            if let Some((_, stored)) = self.entries.remove_if(key, |_, stored| stored.is_expired(now)) {
                self.untag(key, &stored.tags);
            }
            return Ok(None);
        }

        Ok(Some(entry))
    }

    fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.sweep_if_due(Instant::now());

        for tag in &entry.tags {
            self.tags.entry(tag.clone()).or_default().insert(entry.key.clone());
        }
        if let Some(expires_at) = entry.expires_at {
            let mut next = self.next_expiry.lock().unwrap_or_else(PoisonError::into_inner);
            *next = Some(next.map_or(expires_at, |current| current.min(expires_at)));
        }

        let key = entry.key.clone();
        let tags = entry.tags.clone();
        if let Some(previous) = self.entries.insert(key.clone(), entry) {
            let dropped: BTreeSet<String> = previous.tags.difference(&tags).cloned().collect();
            self.untag(&key, &dropped);
        }
        Ok(())
    }

    fn invalidate_by_tag(&self, tag: &str) -> Result<usize, CacheError> {
        let Some((_, keys)) = self.tags.remove(tag) else {
            return Ok(0);
        };

        let mut removed = 0;
        for key in &keys {
            if let Some((_, entry)) = self.entries.remove(key) {
                self.untag(key, &entry.tags);
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.entries.clear();
        self.tags.clear();
        *self.next_expiry.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn purge_expired(&self, now: Instant) -> Result<usize, CacheError> {
        Ok(self.sweep(now))
    }
}
