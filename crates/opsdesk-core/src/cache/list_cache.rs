//! List-result cache keyed by folder and filter signature.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::email_store::ttl_to_millis;
use super::model::CachedEmailList;
use crate::email::{EmailFilters, Folder};
use crate::storage::SharedStore;
use crate::time::SharedClock;

/// Prefix of every key owned by this cache.
pub const KEY_PREFIX: &str = "email_list_cache_";

/// Default list lifetime: three minutes.
pub const DEFAULT_TTL: Duration = Duration::from_millis(180_000);

fn folder_prefix(folder: Folder) -> String {
    format!("{KEY_PREFIX}{folder}_")
}

/// Borrowed form of [`CachedEmailList`] used for writes.
#[derive(Serialize)]
struct ListEntryRef<'a, T> {
    data: &'a [T],
    timestamp: i64,
    filters: String,
}

/// Persistent cache of ordered list results.
///
/// Each distinct filter combination owns one slot; expiry is all-or-nothing
/// per slot and there is no partial invalidation.
#[derive(Clone)]
pub struct ListCache {
    storage: SharedStore,
    clock: SharedClock,
    ttl_millis: i64,
}

impl ListCache {
    /// Creates a cache over `storage` with the default TTL.
    #[must_use]
    pub fn new(storage: SharedStore, clock: SharedClock) -> Self {
        Self {
            storage,
            clock,
            ttl_millis: ttl_to_millis(DEFAULT_TTL),
        }
    }

    /// Overrides the list lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_millis = ttl_to_millis(ttl);
        self
    }

    /// Storage key for `(folder, filters)`.
    #[must_use]
    pub fn key(folder: Folder, filters: &EmailFilters) -> String {
        format!("{}{}", folder_prefix(folder), filters.signature())
    }

    /// Returns the cached list if it is younger than the TTL.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, folder: Folder, filters: &EmailFilters) -> Option<Vec<T>> {
        let key = Self::key(folder, filters);
        let raw = match self.storage.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                debug!("List cache read {key} failed: {e}");
                return None;
            }
        };

        match serde_json::from_str::<CachedEmailList<T>>(&raw) {
            Ok(list) if self.clock.now_millis().saturating_sub(list.timestamp) < self.ttl_millis => {
                debug!("List cache hit {key} ({} items)", list.data.len());
                Some(list.data)
            }
            Ok(_) => {
                debug!("List cache entry {key} expired");
                self.evict(&key);
                None
            }
            Err(e) => {
                warn!("Dropping unreadable list cache entry {key}: {e}");
                self.evict(&key);
                None
            }
        }
    }

    /// Stores `data` verbatim for `(folder, filters)`.
    pub fn set<T: Serialize>(&self, folder: Folder, filters: &EmailFilters, data: &[T]) {
        let key = Self::key(folder, filters);
        let list = ListEntryRef {
            data,
            timestamp: self.clock.now_millis(),
            filters: filters.signature(),
        };
        let result = serde_json::to_string(&list)
            .map_err(|e| e.to_string())
            .and_then(|json| self.storage.set(&key, &json).map_err(|e| e.to_string()));
        match result {
            Ok(()) => debug!("Cached {} items under {key}", data.len()),
            Err(e) => warn!("Failed to cache list {key}: {e}"),
        }
    }

    /// Removes every cached list.
    pub fn clear(&self) {
        self.remove_prefix(KEY_PREFIX);
    }

    /// Removes every cached list for `folder`.
    pub fn clear_folder(&self, folder: Folder) {
        self.remove_prefix(&folder_prefix(folder));
    }

    fn remove_prefix(&self, prefix: &str) {
        match self.storage.remove_prefix(prefix) {
            Ok(removed) => debug!("Cleared {removed} cached lists"),
            Err(e) => warn!("Failed to clear cached lists: {e}"),
        }
    }

    fn evict(&self, key: &str) {
        if let Err(e) = self.storage.remove(key) {
            debug!("List cache evict {key} failed: {e}");
        }
    }
}
