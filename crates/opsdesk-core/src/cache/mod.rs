//! Persistent email caches.
//!
//! Two TTL caches share one [`KeyValueStore`](crate::storage::KeyValueStore):
//! - [`EmailStore`]: one entry per email id plus a per-folder index
//! - [`ListCache`]: one ordered list per `(folder, filter signature)`
//!
//! Expired entries are evicted lazily when read; there is no background sweep.

pub mod email_store;
pub mod list_cache;
mod model;

pub use email_store::EmailStore;
pub use list_cache::ListCache;
pub use model::{CachedEmail, CachedEmailList, CheckResult, EmailStorageIndex};
