//! Persistent token store with single-flight refresh.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use opsdesk_auth::{TokenEndpoint, TokenRecord};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::storage::SharedStore;
use crate::time::SharedClock;

/// Storage key for the endpoint called `name`.
#[must_use]
pub fn storage_key(name: &str) -> String {
    format!("{name}-token-storage")
}

/// One credential: its persisted record and the endpoint that renews it.
///
/// A failed refresh never touches the stored record; a stale token is
/// preferred over none. Callers that ask for a refresh while one is already
/// running wait for it and share its outcome.
pub struct TokenStore<E> {
    endpoint: E,
    key: String,
    storage: SharedStore,
    clock: SharedClock,
    refresh_lock: Mutex<()>,
    generation: AtomicU64,
    last_outcome: AtomicBool,
}

impl<E: TokenEndpoint> TokenStore<E> {
    /// Creates a store keyed `<endpoint name>-token-storage`.
    #[must_use]
    pub fn new(endpoint: E, storage: SharedStore, clock: SharedClock) -> Self {
        let key = storage_key(endpoint.name());
        Self {
            endpoint,
            key,
            storage,
            clock,
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            last_outcome: AtomicBool::new(false),
        }
    }

    /// The endpoint this store refreshes from.
    #[must_use]
    pub const fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Storage key of the record.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current record. Unreadable records count as absent.
    #[must_use]
    pub fn token(&self) -> Option<TokenRecord> {
        let raw = match self.storage.get(&self.key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read {}: {e}", self.key);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring unreadable token record {}: {e}", self.key);
                None
            }
        }
    }

    /// True when there is no record or it is at least `max_age_secs` old
    /// (declared lifetime minus the safety buffer by default).
    #[must_use]
    pub fn is_expired(&self, max_age_secs: Option<u64>) -> bool {
        self.token()
            .is_none_or(|record| record.is_expired_at(self.clock.now_millis(), max_age_secs))
    }

    /// True when a record exists and is not stale.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired(None)
    }

    /// Requests a new token and stores it.
    ///
    /// Returns false on any failure, leaving the previous record in place.
    pub async fn refresh(&self) -> bool {
        let observed = self.generation.load(Ordering::SeqCst);
        let _guard = self.refresh_lock.lock().await;
        if self.generation.load(Ordering::SeqCst) != observed {
            debug!("Joined in-flight {} refresh", self.endpoint.name());
            return self.last_outcome.load(Ordering::SeqCst);
        }

        let outcome = self.refresh_now().await;
        self.last_outcome.store(outcome, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    /// Refreshes only when the token is absent or stale.
    pub async fn ensure_fresh(&self) -> bool {
        if self.is_valid() {
            return true;
        }
        self.refresh().await
    }

    /// Deletes the stored record.
    pub fn clear(&self) {
        match self.storage.remove(&self.key) {
            Ok(()) => debug!("Cleared {}", self.key),
            Err(e) => warn!("Failed to clear {}: {e}", self.key),
        }
    }

    async fn refresh_now(&self) -> bool {
        let name = self.endpoint.name();
        let grant = match self.endpoint.request_token().await {
            Ok(grant) => grant,
            Err(e) => {
                warn!("{name} token refresh failed: {e}");
                return false;
            }
        };

        let record = grant.issue(self.clock.now_millis());
        let stored = serde_json::to_string(&record)
            .map_err(|e| e.to_string())
            .and_then(|json| self.storage.set(&self.key, &json).map_err(|e| e.to_string()));
        match stored {
            Ok(()) => {
                info!("Refreshed {name} token (expires in {}s)", record.expires_in);
                true
            }
            Err(e) => {
                warn!("Failed to store {name} token: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreadable_literal)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};
    use crate::time::MockClock;
    use opsdesk_auth::TokenGrant;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Endpoint that replays queued responses, then keeps issuing fresh tokens.
    pub struct ScriptedEndpoint {
        pub calls: AtomicUsize,
        pub delay: Duration,
        responses: std::sync::Mutex<VecDeque<opsdesk_auth::Result<TokenGrant>>>,
    }

    impl ScriptedEndpoint {
        pub fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                responses: std::sync::Mutex::new(VecDeque::new()),
            }
        }

        pub fn then(self, response: opsdesk_auth::Result<TokenGrant>) -> Self {
            self.responses.lock().unwrap().push_back(response);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TokenEndpoint for ScriptedEndpoint {
        fn name(&self) -> &str {
            "walmart"
        }

        async fn request_token(&self) -> opsdesk_auth::Result<TokenGrant> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let scripted = self.responses.lock().unwrap().pop_front();
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            scripted.unwrap_or_else(|| Ok(TokenGrant::new(format!("token-{n}"), "Bearer", 900)))
        }
    }

    fn fixture(endpoint: ScriptedEndpoint) -> (TokenStore<ScriptedEndpoint>, Arc<MemoryStore>, Arc<MockClock>) {
        let storage = Arc::new(MemoryStore::new());
        let clock = Arc::new(MockClock::at_millis(1_760_000_000_000));
        (TokenStore::new(endpoint, storage.clone(), clock.clone()), storage, clock)
    }

    #[tokio::test]
    async fn test_absent_is_expired() {
        let (store, _, _) = fixture(ScriptedEndpoint::new());
        assert_eq!(store.key(), "walmart-token-storage");
        assert!(store.token().is_none());
        assert!(store.is_expired(None));
        assert!(store.is_expired(Some(u64::MAX)));
    }

    #[tokio::test]
    async fn test_refresh_stamps_and_persists() {
        let (store, storage, clock) = fixture(ScriptedEndpoint::new());
        assert!(store.refresh().await);

        let record = store.token().unwrap();
        assert_eq!(record.token, "token-0");
        assert_eq!(record.timestamp, 1_760_000_000_000);
        assert!(storage.get("walmart-token-storage").unwrap().is_some());

        clock.advance_millis(839_000);
        assert!(store.is_valid());
        clock.advance_millis(1_000);
        assert!(store.is_expired(None));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_record() {
        let endpoint = ScriptedEndpoint::new()
            .then(Ok(TokenGrant::new("first", "Bearer", 900)))
            .then(Err(opsdesk_auth::Error::Rejected("invalid client".into())));
        let (store, _, clock) = fixture(endpoint);

        assert!(store.refresh().await);
        clock.advance_millis(900_000);
        assert!(!store.refresh().await);
        assert_eq!(store.token().unwrap().token, "first");
    }

    #[tokio::test]
    async fn test_unreadable_record_is_absent() {
        let (store, storage, _) = fixture(ScriptedEndpoint::new());
        storage.set("walmart-token-storage", "{not json").unwrap();
        assert!(store.token().is_none());
        assert!(store.is_expired(None));
    }

    #[tokio::test]
    async fn test_ensure_fresh_skips_valid_token() {
        let (store, _, clock) = fixture(ScriptedEndpoint::new());
        assert!(store.ensure_fresh().await);
        assert!(store.ensure_fresh().await);
        assert_eq!(store.endpoint().calls(), 1);

        clock.advance_millis(840_000);
        assert!(store.ensure_fresh().await);
        assert_eq!(store.endpoint().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refreshes_share_one_request() {
        let mut endpoint = ScriptedEndpoint::new();
        endpoint.delay = Duration::from_secs(2);
        let (store, _, _) = fixture(endpoint);

        let (a, b, c) = tokio::join!(store.refresh(), store.refresh(), store.refresh());
        assert!(a && b && c);
        assert_eq!(store.endpoint().calls(), 1);

        // A later call is a new refresh.
        assert!(store.refresh().await);
        assert_eq!(store.endpoint().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_joined_callers_share_failure() {
        let mut endpoint =
            ScriptedEndpoint::new().then(Err(opsdesk_auth::Error::InvalidResponse("empty".into())));
        endpoint.delay = Duration::from_secs(1);
        let (store, _, _) = fixture(endpoint);

        let (a, b) = tokio::join!(store.refresh(), store.refresh());
        assert!(!a && !b);
        assert_eq!(store.endpoint().calls(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let (store, _, _) = fixture(ScriptedEndpoint::new());
        store.refresh().await;
        store.clear();
        assert!(store.token().is_none());
    }
}
