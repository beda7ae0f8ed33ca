//! # opsdesk-core
//!
//! Email caching and credential upkeep for the opsdesk back office.
//!
//! This crate provides:
//! - **Storage** - a synchronous key-value seam with memory, file and keyring backends
//! - **Caches** - per-email and list-result caches with lazy TTL eviction
//! - **Email projections** - strict parsing of provider messages, lightweight views
//! - **Loading** - cache-first, cancellable folder loads with client-side filters
//! - **Tokens** - persisted bearer tokens, single-flight refresh and schedulers
//!
//! Time is injected through [`Clock`] so every TTL and expiry rule can be
//! exercised deterministically.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod email;
mod error;
pub mod service;
pub mod storage;
pub mod time;
pub mod tokens;

pub use cache::{CheckResult, EmailStorageIndex, EmailStore, ListCache};
pub use email::{Attachment, DateRange, Email, EmailFilters, Folder, RawMessage, apply_filters};
pub use error::{Error, Result};
pub use service::{EmailProvider, HttpEmailProvider, LoadOptions, LoadSupervisor, MailLoader};
pub use storage::{
    FileStore, KeyValueStore, KeyringStore, MemoryStore, SharedStore, StorageError, StorageResult,
};
pub use time::{Clock, MockClock, SharedClock, SystemClock};
pub use tokens::{FocusTrigger, LogisticsTokens, RefreshScheduler, SchedulerConfig, TokenStore};
