//! Progressive, cache-first folder loading.
//!
//! The read path for a folder view:
//! 1. serve from the list cache when it already holds enough items (the
//!    list cache keeps summaries; full loads promote them from the email cache),
//! 2. otherwise fetch once from the provider,
//! 3. reuse per-email cache entries for ids seen before and project only the
//!    new ones,
//! 4. merge in provider order, apply client filters, write the summaries back.
//!
//! Cache problems never fail a load; provider errors always do.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::provider::EmailProvider;
use crate::cache::{EmailStore, ListCache};
use crate::email::{Email, EmailFilters, Folder, apply_filters};
use crate::error::{Error, Result};
use crate::storage::SharedStore;
use crate::time::SharedClock;

/// Page size used when neither the caller nor the filters name one.
pub const DEFAULT_LIMIT: usize = 50;

/// Per-call loading options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Consult the list cache before going to the network.
    pub use_cache: bool,
    /// Return content-stripped projections.
    pub lightweight: bool,
    /// Explicit item target for progressive paging.
    pub required_count: Option<usize>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            lightweight: true,
            required_count: None,
        }
    }
}

impl LoadOptions {
    /// Bypasses the list cache.
    #[must_use]
    pub const fn bypass_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// Returns full projections (bodies and attachment payloads).
    #[must_use]
    pub const fn full(mut self) -> Self {
        self.lightweight = false;
        self
    }

    /// Loads at least `count` items.
    #[must_use]
    pub const fn required(mut self, count: usize) -> Self {
        self.required_count = Some(count);
        self
    }
}

/// Folder loader owning the caches for one storage backend.
pub struct MailLoader<P> {
    provider: P,
    emails: EmailStore,
    lists: ListCache,
    session: RwLock<HashMap<String, Email>>,
    clock: SharedClock,
    default_limit: usize,
}

impl<P: EmailProvider> MailLoader<P> {
    /// Creates a loader with default TTLs and page size.
    #[must_use]
    pub fn new(provider: P, storage: SharedStore, clock: SharedClock) -> Self {
        Self {
            provider,
            emails: EmailStore::new(storage.clone(), clock.clone()),
            lists: ListCache::new(storage, clock.clone()),
            session: RwLock::new(HashMap::new()),
            clock,
            default_limit: DEFAULT_LIMIT,
        }
    }

    /// Overrides the per-email and list TTLs.
    #[must_use]
    pub fn with_ttls(mut self, email_ttl: Duration, list_ttl: Duration) -> Self {
        self.emails = self.emails.with_ttl(email_ttl);
        self.lists = self.lists.with_ttl(list_ttl);
        self
    }

    /// Overrides the default page size.
    #[must_use]
    pub const fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Per-email cache.
    #[must_use]
    pub const fn email_store(&self) -> &EmailStore {
        &self.emails
    }

    /// List-result cache.
    #[must_use]
    pub const fn list_cache(&self) -> &ListCache {
        &self.lists
    }

    /// Loads the inbox without cancellation.
    ///
    /// # Errors
    ///
    /// See [`MailLoader::load`].
    pub async fn load_inbox(&self, filters: &EmailFilters, options: LoadOptions) -> Result<Vec<Email>> {
        self.load(Folder::Inbox, filters, options, &CancellationToken::new())
            .await
    }

    /// Loads sent mail without cancellation.
    ///
    /// # Errors
    ///
    /// See [`MailLoader::load`].
    pub async fn load_sent(&self, filters: &EmailFilters, options: LoadOptions) -> Result<Vec<Email>> {
        self.load(Folder::Sent, filters, options, &CancellationToken::new())
            .await
    }

    /// Loads `folder`, returning filtered emails in provider order.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the fetch fails, or
    /// [`Error::Cancelled`] if `cancel` fires before the result is written back.
    pub async fn load(
        &self,
        folder: Folder,
        filters: &EmailFilters,
        options: LoadOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<Email>> {
        let needed = options
            .required_count
            .or(filters.limit)
            .unwrap_or(self.default_limit);
        let slot = filters.clone().with_limit(needed);

        if options.use_cache {
            if let Some(hit) = self.from_list_cache(folder, &slot, needed, options.lightweight) {
                return Ok(hit);
            }
        }

        let raw = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            fetched = self.provider.fetch(folder, needed) => fetched?,
        };
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let order: Vec<String> = raw.iter().map(|m| m.id.clone()).collect();
        let check = self.emails.check_ids(&order);
        info!(
            %folder,
            fetched = raw.len(),
            cached = check.cached.len(),
            missing = check.missing.len(),
            "fetched folder"
        );

        let mut by_id: HashMap<String, Email> = HashMap::with_capacity(order.len());
        for full in self.emails.get_many::<Email>(&check.cached) {
            self.remember(&full);
            by_id.insert(full.id.clone(), project(full, options.lightweight));
        }

        // Entries can lapse between the check and the read; anything still
        // absent is projected from the fresh payload.
        let mut seen = HashSet::with_capacity(raw.len());
        let mut fresh = Vec::new();
        for message in raw {
            if by_id.contains_key(&message.id) || !seen.insert(message.id.clone()) {
                continue;
            }
            let id = message.id.clone();
            match Email::from_raw(message, folder) {
                Ok(full) => fresh.push(full),
                Err(e) => warn!(%folder, %id, "skipping message: {e}"),
            }
        }
        let batch: Vec<(&str, &Email)> = fresh.iter().map(|e| (e.id.as_str(), e)).collect();
        self.emails.set_many(&batch, folder);
        for full in fresh {
            self.remember(&full);
            by_id.insert(full.id.clone(), project(full, options.lightweight));
        }

        let ordered: Vec<Email> = order.iter().filter_map(|id| by_id.remove(id)).collect();
        let filtered = apply_filters(ordered, filters, self.clock.today());

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let summaries: Vec<Email> = filtered.iter().map(Email::to_lightweight).collect();
        self.lists.set(folder, &slot, &summaries);
        Ok(filtered)
    }

    /// Serves `needed` rows from the list cache. Returns `None` when the
    /// cache cannot satisfy the request on its own.
    fn from_list_cache(
        &self,
        folder: Folder,
        slot: &EmailFilters,
        needed: usize,
        lightweight: bool,
    ) -> Option<Vec<Email>> {
        let cached = self.lists.get::<Email>(folder, slot)?;
        if cached.len() < needed {
            debug!(%folder, cached = cached.len(), needed, "cached list too short");
            return None;
        }
        let rows = cached.into_iter().take(needed);
        if lightweight {
            debug!(%folder, needed, "serving folder from list cache");
            return Some(rows.map(Email::into_lightweight).collect());
        }

        let promoted: Option<Vec<Email>> = rows.map(|row| self.cached_full(&row.id)).collect();
        if promoted.is_none() {
            debug!(%folder, "cached list has rows without content, refetching");
        }
        promoted
    }

    /// Upgrades a lightweight email to its full projection when one is known.
    ///
    /// Checks the session map, then the per-email cache. Returns the input
    /// unchanged when neither holds content.
    #[must_use]
    pub fn enrich(&self, email: Email) -> Email {
        if email.is_full() {
            return email;
        }
        if let Some(full) = self.session_get(&email.id) {
            return full;
        }
        match self.emails.get::<Email>(&email.id) {
            Some(full) if full.is_full() => {
                self.remember(&full);
                full
            }
            _ => email,
        }
    }

    /// Looks up the full projection of `id` without touching the network.
    #[must_use]
    pub fn cached_full(&self, id: &str) -> Option<Email> {
        self.session_get(id).or_else(|| {
            let full = self.emails.get::<Email>(id)?;
            self.remember(&full);
            Some(full)
        })
    }

    /// Drops every cached list, email and session entry for `folder`.
    pub fn invalidate(&self, folder: Folder) {
        self.lists.clear_folder(folder);
        self.emails.clear_folder(folder);
        self.session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, email| email.folder != folder);
    }

    /// Drops every cache this loader owns.
    pub fn clear(&self) {
        self.lists.clear();
        self.emails.clear();
        self.session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn session_get(&self, id: &str) -> Option<Email> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn remember(&self, full: &Email) {
        if !full.is_full() {
            return;
        }
        self.session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(full.id.clone(), full.clone());
    }
}

fn project(email: Email, lightweight: bool) -> Email {
    if lightweight {
        email.into_lightweight()
    } else {
        email
    }
}
