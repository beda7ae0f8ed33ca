//! Command implementations.

pub mod cache;
pub mod mail;
pub mod tokens;

use std::sync::Arc;

use anyhow::Context as _;
use opsdesk_auth::{LogisticsEndpoint, WalmartEndpoint};
use opsdesk_core::{
    FileStore, HttpEmailProvider, KeyringStore, LogisticsTokens, MailLoader, SharedClock,
    SharedStore, SystemClock, TokenStore,
};
use tracing::warn;

use crate::config::{AppConfig, TokenBackend};

/// Everything a command needs, built once from the configuration.
pub struct Context {
    pub config: AppConfig,
    pub storage: SharedStore,
    pub clock: SharedClock,
}

impl Context {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let store = match &config.storage_path {
            Some(path) => FileStore::open(path),
            None => FileStore::open_default(),
        }
        .context("opening cache storage")?;
        tracing::debug!("Using storage at {}", store.path().display());

        Ok(Self {
            config,
            storage: Arc::new(store),
            clock: SystemClock::shared(),
        })
    }

    /// Email loader over the configured backend.
    pub fn loader(&self) -> anyhow::Result<MailLoader<HttpEmailProvider>> {
        let provider = HttpEmailProvider::new(&self.config.email_api_url)
            .with_context(|| format!("invalid email API URL {}", self.config.email_api_url))?;
        let cache = &self.config.cache;
        Ok(
            MailLoader::new(provider, self.storage.clone(), self.clock.clone())
                .with_ttls(cache.email_ttl(), cache.list_ttl())
                .with_default_limit(cache.page_size),
        )
    }

    fn token_storage(&self) -> SharedStore {
        match self.config.token_backend {
            TokenBackend::File => self.storage.clone(),
            TokenBackend::Keyring => Arc::new(KeyringStore::new()),
        }
    }

    /// Walmart token store, if credentials are configured.
    pub fn walmart_tokens(&self) -> anyhow::Result<Option<Arc<TokenStore<WalmartEndpoint>>>> {
        let Some(walmart) = &self.config.walmart else {
            return Ok(None);
        };
        let endpoint = match &walmart.token_url {
            Some(url) => WalmartEndpoint::new(url, &walmart.client_id, &walmart.client_secret),
            None => WalmartEndpoint::production(&walmart.client_id, &walmart.client_secret),
        }
        .context("invalid Walmart configuration")?;

        Ok(Some(Arc::new(TokenStore::new(
            endpoint,
            self.token_storage(),
            self.clock.clone(),
        ))))
    }

    /// Carrier token stores. Carriers whose endpoint cannot be built are
    /// skipped with a warning.
    pub fn logistics_tokens(&self) -> LogisticsTokens {
        let Some(logistics) = &self.config.logistics else {
            return LogisticsTokens::default();
        };
        let endpoints = logistics.carriers.iter().filter_map(|carrier| {
            LogisticsEndpoint::new(
                &logistics.token_url,
                *carrier,
                &logistics.username,
                &logistics.password,
            )
            .inspect_err(|e| warn!("Skipping {carrier} tokens: {e}"))
            .ok()
        });
        LogisticsTokens::new(endpoints, &self.token_storage(), &self.clock)
    }
}
