//! Carrier token registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use opsdesk_auth::{Carrier, LogisticsEndpoint, TokenRecord};
use tokio::task::JoinSet;
use tracing::warn;

use super::store::TokenStore;
use crate::storage::SharedStore;
use crate::time::SharedClock;

/// One token store per configured carrier.
///
/// Records live under `logistics-<carrier>-token-storage`.
#[derive(Default)]
pub struct LogisticsTokens {
    stores: BTreeMap<Carrier, Arc<TokenStore<LogisticsEndpoint>>>,
}

impl LogisticsTokens {
    /// Creates a registry from carrier endpoints. A later endpoint for the
    /// same carrier replaces an earlier one.
    #[must_use]
    pub fn new(
        endpoints: impl IntoIterator<Item = LogisticsEndpoint>,
        storage: &SharedStore,
        clock: &SharedClock,
    ) -> Self {
        let stores = endpoints
            .into_iter()
            .map(|endpoint| {
                let carrier = endpoint.carrier;
                let store = TokenStore::new(endpoint, storage.clone(), clock.clone());
                (carrier, Arc::new(store))
            })
            .collect();
        Self { stores }
    }

    /// Configured carriers, in a stable order.
    pub fn carriers(&self) -> impl Iterator<Item = Carrier> + '_ {
        self.stores.keys().copied()
    }

    /// Store for `carrier`, if configured.
    #[must_use]
    pub fn store(&self, carrier: Carrier) -> Option<&Arc<TokenStore<LogisticsEndpoint>>> {
        self.stores.get(&carrier)
    }

    /// Current token for `carrier`.
    #[must_use]
    pub fn get(&self, carrier: Carrier) -> Option<TokenRecord> {
        self.store(carrier)?.token()
    }

    /// Every configured store.
    pub fn stores(&self) -> impl Iterator<Item = (Carrier, &Arc<TokenStore<LogisticsEndpoint>>)> {
        self.stores.iter().map(|(carrier, store)| (*carrier, store))
    }

    /// Refreshes every carrier concurrently and reports each outcome.
    pub async fn refresh_all(&self) -> Vec<(Carrier, bool)> {
        let mut tasks = JoinSet::new();
        for (carrier, store) in &self.stores {
            let carrier = *carrier;
            let store = store.clone();
            tasks.spawn(async move { (carrier, store.refresh().await) });
        }

        let mut outcomes = Vec::with_capacity(self.stores.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("Carrier token refresh task failed: {e}"),
            }
        }
        outcomes.sort_by_key(|(carrier, _)| *carrier);
        outcomes
    }

    /// Number of configured carriers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// True when no carrier is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};
    use crate::time::{MockClock, SystemClock};

    fn endpoint(carrier: Carrier) -> LogisticsEndpoint {
        // Nothing listens on the discard port, so every request fails fast.
        LogisticsEndpoint::new("http://127.0.0.1:9/api/auth/token", carrier, "ops", "secret").unwrap()
    }

    #[test]
    fn test_keys_per_carrier() {
        let storage: SharedStore = Arc::new(MemoryStore::new());
        let clock = SystemClock::shared();
        let tokens = LogisticsTokens::new(Carrier::ALL.map(endpoint), &storage, &clock);

        assert_eq!(tokens.len(), 2);
        assert_eq!(
            tokens.store(Carrier::Estes).unwrap().key(),
            "logistics-estes-token-storage"
        );
        assert_eq!(
            tokens.store(Carrier::Xpo).unwrap().key(),
            "logistics-xpo-token-storage"
        );
    }

    #[test]
    fn test_get_reads_each_carrier_independently() {
        let storage: SharedStore = Arc::new(MemoryStore::new());
        let clock: SharedClock = Arc::new(MockClock::new());
        storage
            .set(
                "logistics-xpo-token-storage",
                r#"{"token":"xpo-1","tokenType":"Bearer","expiresIn":3600,"timestamp":0}"#,
            )
            .unwrap();

        let tokens = LogisticsTokens::new(Carrier::ALL.map(endpoint), &storage, &clock);
        assert_eq!(tokens.get(Carrier::Xpo).unwrap().token, "xpo-1");
        assert!(tokens.get(Carrier::Estes).is_none());
    }

    #[test]
    fn test_unconfigured_carrier() {
        let storage: SharedStore = Arc::new(MemoryStore::new());
        let clock = SystemClock::shared();
        let tokens = LogisticsTokens::new([endpoint(Carrier::Estes)], &storage, &clock);

        assert!(tokens.store(Carrier::Xpo).is_none());
        assert_eq!(tokens.carriers().collect::<Vec<_>>(), vec![Carrier::Estes]);
    }

    #[tokio::test]
    async fn test_refresh_all_reports_failures_and_keeps_records() {
        let storage: SharedStore = Arc::new(MemoryStore::new());
        let clock = SystemClock::shared();
        let record = r#"{"token":"kept","tokenType":"Bearer","expiresIn":3600,"timestamp":0}"#;
        storage.set("logistics-estes-token-storage", record).unwrap();

        let tokens = LogisticsTokens::new(Carrier::ALL.map(endpoint), &storage, &clock);
        let outcomes = tokens.refresh_all().await;

        assert_eq!(outcomes, vec![(Carrier::Estes, false), (Carrier::Xpo, false)]);
        assert_eq!(tokens.get(Carrier::Estes).unwrap().token, "kept");
    }
}
