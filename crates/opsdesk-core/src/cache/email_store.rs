//! Per-email persistent cache with a folder index.

use std::time::Duration;

use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, warn};

use super::model::{CachedEmail, CheckResult, EmailStorageIndex};
use crate::email::Folder;
use crate::storage::SharedStore;
use crate::time::SharedClock;

/// Prefix of every key owned by this cache, the index included.
pub const KEY_PREFIX: &str = "email_storage_";

/// Key of the folder index.
pub const INDEX_KEY: &str = "email_storage_index";

/// Default entry lifetime: five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

fn entry_key(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}

/// Persistent cache keyed by email id.
///
/// Every operation is infallible from the caller's point of view: storage
/// and parse failures are logged and behave like a miss.
#[derive(Clone)]
pub struct EmailStore {
    storage: SharedStore,
    clock: SharedClock,
    ttl_millis: i64,
}

impl EmailStore {
    /// Creates a cache over `storage` with the default TTL.
    #[must_use]
    pub fn new(storage: SharedStore, clock: SharedClock) -> Self {
        Self {
            storage,
            clock,
            ttl_millis: ttl_to_millis(DEFAULT_TTL),
        }
    }

    /// Overrides the entry lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_millis = ttl_to_millis(ttl);
        self
    }

    /// Returns the cached value for `id` if it is younger than the TTL.
    ///
    /// Stale or unreadable entries are removed.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, id: &str) -> Option<T> {
        let key = entry_key(id);
        let raw = self.read(&key)?;
        match serde_json::from_str::<CachedEmail<T>>(&raw) {
            Ok(entry) if self.is_fresh(entry.timestamp) => Some(entry.email),
            Ok(_) => {
                debug!("Email cache entry {id} expired");
                self.evict(&key);
                None
            }
            Err(e) => {
                warn!("Dropping unreadable email cache entry {id}: {e}");
                self.evict(&key);
                None
            }
        }
    }

    /// Stores `value` for `id` and records the id under `folder`.
    pub fn set<T: Serialize>(&self, id: &str, value: &T, folder: Folder) {
        self.set_many(&[(id, value)], folder);
    }

    /// Stores every `(id, value)` pair under `folder` and updates the index
    /// once, in a single storage write.
    pub fn set_many<T: Serialize>(&self, items: &[(&str, &T)], folder: Folder) {
        if items.is_empty() {
            return;
        }
        let now = self.clock.now_millis();
        let mut batch = Vec::with_capacity(items.len() + 1);
        let mut index = self.index();
        for (id, value) in items {
            let entry = CachedEmail {
                email: *value,
                timestamp: now,
                email_id: (*id).to_string(),
            };
            match serde_json::to_string(&entry) {
                Ok(json) => batch.push((entry_key(id), json)),
                Err(e) => {
                    warn!("Failed to serialize email {id}: {e}");
                    continue;
                }
            }
            let ids = index.ids_mut(folder);
            if !ids.iter().any(|known| known == id) {
                ids.push((*id).to_string());
            }
        }
        if batch.is_empty() {
            return;
        }
        index.last_updated = now;
        match serde_json::to_string(&index) {
            Ok(json) => batch.push((INDEX_KEY.to_string(), json)),
            Err(e) => warn!("Failed to serialize email index: {e}"),
        }

        if let Err(e) = self.storage.set_many(&batch) {
            warn!("Failed to cache {} emails: {e}", items.len());
        }
    }

    /// Returns the live values for `ids`, skipping misses.
    ///
    /// Callers needing a particular order must re-order the result themselves.
    #[must_use]
    pub fn get_many<T: DeserializeOwned>(&self, ids: &[String]) -> Vec<T> {
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    /// Splits `ids` into those with a live entry and those that must be fetched.
    #[must_use]
    pub fn check_ids(&self, ids: &[String]) -> CheckResult {
        let (cached, missing): (Vec<String>, Vec<String>) =
            ids.iter().cloned().partition(|id| self.is_live(id));
        CheckResult { cached, missing }
    }

    /// Returns true if `id` has a live entry.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.is_live(id)
    }

    /// Returns the folder index (empty when absent or unreadable).
    #[must_use]
    pub fn index(&self) -> EmailStorageIndex {
        self.read(INDEX_KEY)
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(index) => Some(index),
                Err(e) => {
                    warn!("Resetting unreadable email index: {e}");
                    None
                }
            })
            .unwrap_or_default()
    }

    /// Removes every entry and the index, regardless of age.
    pub fn clear(&self) {
        match self.storage.remove_prefix(KEY_PREFIX) {
            Ok(removed) => debug!("Cleared {removed} email cache keys"),
            Err(e) => warn!("Failed to clear email cache: {e}"),
        }
    }

    /// Removes the entries indexed under `folder` and empties its index list.
    pub fn clear_folder(&self, folder: Folder) {
        let mut index = self.index();
        let ids = std::mem::take(index.ids_mut(folder));
        for id in &ids {
            self.evict(&entry_key(id));
        }
        index.last_updated = self.clock.now_millis();
        self.write_index(&index);
        debug!("Cleared {} cached {folder} emails", ids.len());
    }

    fn is_live(&self, id: &str) -> bool {
        let key = entry_key(id);
        let Some(raw) = self.read(&key) else {
            return false;
        };
        match serde_json::from_str::<CachedEmail<IgnoredAny>>(&raw) {
            Ok(entry) if self.is_fresh(entry.timestamp) => true,
            _ => {
                self.evict(&key);
                false
            }
        }
    }

    fn is_fresh(&self, timestamp: i64) -> bool {
        self.clock.now_millis().saturating_sub(timestamp) < self.ttl_millis
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                debug!("Email cache read {key} failed: {e}");
                None
            }
        }
    }

    fn evict(&self, key: &str) {
        if let Err(e) = self.storage.remove(key) {
            debug!("Email cache evict {key} failed: {e}");
        }
    }

    fn write_index(&self, index: &EmailStorageIndex) {
        let result = serde_json::to_string(index)
            .map_err(|e| e.to_string())
            .and_then(|json| self.storage.set(INDEX_KEY, &json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!("Failed to update email index: {e}");
        }
    }
}

pub(crate) fn ttl_to_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreadable_literal)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};
    use crate::time::MockClock;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn fixture() -> (EmailStore, Arc<MemoryStore>, Arc<MockClock>) {
        let storage = Arc::new(MemoryStore::new());
        let clock = Arc::new(MockClock::at_millis(1_700_000_000_000));
        let store = EmailStore::new(storage.clone(), clock.clone());
        (store, storage, clock)
    }

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_set_then_get() {
        let (store, storage, _) = fixture();
        store.set("m1", &"body".to_string(), Folder::Inbox);

        assert_eq!(store.get::<String>("m1").as_deref(), Some("body"));
        let raw = storage.get("email_storage_m1").unwrap().unwrap();
        assert!(raw.contains(r#""emailId":"m1""#));
    }

    #[test]
    fn test_ttl_boundary() {
        let (store, storage, clock) = fixture();
        store.set("m1", &1u32, Folder::Inbox);

        clock.advance_millis(299_999);
        assert_eq!(store.get::<u32>("m1"), Some(1));

        clock.advance_millis(1);
        assert_eq!(store.get::<u32>("m1"), None);
        assert_eq!(storage.get("email_storage_m1").unwrap(), None, "evicted on read");
    }

    #[test]
    fn test_rewrite_does_not_duplicate_index_and_refreshes_timestamp() {
        let (store, _, clock) = fixture();
        store.set("m1", &1u32, Folder::Inbox);
        clock.advance_millis(200_000);
        store.set("m1", &2u32, Folder::Inbox);

        assert_eq!(store.index().inbox, ids(&["m1"]));
        clock.advance_millis(200_000);
        assert_eq!(store.get::<u32>("m1"), Some(2), "timestamp was refreshed");
    }

    #[test]
    fn test_get_many_skips_misses() {
        let (store, _, _) = fixture();
        store.set("a", &1u32, Folder::Inbox);
        store.set("c", &3u32, Folder::Sent);

        let mut values: Vec<u32> = store.get_many(&ids(&["a", "b", "c"]));
        values.sort_unstable();
        assert_eq!(values, vec![1, 3]);
    }

    #[test]
    fn test_check_ids_partitions_by_validity() {
        let (store, _, clock) = fixture();
        store.set("old", &1u32, Folder::Inbox);
        clock.advance_millis(250_000);
        store.set("new", &2u32, Folder::Inbox);
        clock.advance_millis(100_000);

        let result = store.check_ids(&ids(&["old", "new", "never"]));
        assert_eq!(result.cached, ids(&["new"]));
        assert_eq!(result.missing, ids(&["old", "never"]));
    }

    #[test]
    fn test_ghost_index_ids_are_misses() {
        let (store, _, clock) = fixture();
        store.set("m1", &1u32, Folder::Inbox);
        clock.advance_millis(400_000);

        assert_eq!(store.index().inbox, ids(&["m1"]));
        assert!(!store.contains("m1"));
        assert_eq!(store.get::<u32>("m1"), None);
    }

    #[test]
    fn test_clear_folder_only_touches_that_folder() {
        let (store, _, _) = fixture();
        store.set("i1", &1u32, Folder::Inbox);
        store.set("s1", &2u32, Folder::Sent);

        store.clear_folder(Folder::Inbox);
        assert_eq!(store.get::<u32>("i1"), None);
        assert_eq!(store.get::<u32>("s1"), Some(2));
        assert!(store.index().inbox.is_empty());
        assert_eq!(store.index().sent, ids(&["s1"]));
    }

    #[test]
    fn test_clear_removes_everything() {
        let (store, storage, _) = fixture();
        store.set("i1", &1u32, Folder::Inbox);
        store.set("s1", &2u32, Folder::Sent);
        storage.set("walmart-token-storage", "{}").unwrap();

        store.clear();
        assert_eq!(storage.keys().unwrap(), vec!["walmart-token-storage".to_string()]);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let (store, storage, _) = fixture();
        storage.set("email_storage_m1", "{oops").unwrap();
        assert_eq!(store.get::<u32>("m1"), None);
        assert_eq!(storage.get("email_storage_m1").unwrap(), None);
    }

    #[test]
    fn test_quota_failure_is_swallowed() {
        let storage = Arc::new(MemoryStore::with_quota(16));
        let clock = Arc::new(MockClock::new());
        let store = EmailStore::new(storage, clock);

        store.set("m1", &"a long body that will not fit".to_string(), Folder::Inbox);
        assert_eq!(store.get::<String>("m1"), None);
    }

    #[test]
    fn test_set_many_indexes_once() {
        let (store, storage, _) = fixture();
        store.set("a", &1u32, Folder::Inbox);
        store.set_many(&[("b", &2u32), ("a", &3u32), ("c", &4u32)], Folder::Inbox);

        assert_eq!(store.index().inbox, ids(&["a", "b", "c"]));
        assert_eq!(store.get::<u32>("a"), Some(3));
        assert!(storage.get("email_storage_c").unwrap().is_some());
    }

    proptest! {
        #[test]
        fn prop_hit_iff_younger_than_ttl(age in 0i64..600_000, ttl in 1u64..400_000) {
            let (store, _, clock) = fixture();
            let store = store.with_ttl(Duration::from_millis(ttl));
            store.set("m", &7u8, Folder::Inbox);
            clock.advance_millis(age);

            let expected = age < i64::try_from(ttl).unwrap();
            prop_assert_eq!(store.get::<u8>("m").is_some(), expected);
        }
    }
}
