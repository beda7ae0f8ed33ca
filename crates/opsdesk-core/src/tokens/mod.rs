//! Short-lived credential stores and their refresh schedulers.
//!
//! - [`TokenStore`]: the persisted record for one endpoint, with a
//!   single-flight [`TokenStore::refresh`]
//! - [`RefreshScheduler`]: keeps a store fresh on a timer and on focus regain
//! - [`LogisticsTokens`]: one store per freight carrier

mod logistics;
mod scheduler;
pub(crate) mod store;

pub use logistics::LogisticsTokens;
pub use scheduler::{DEFAULT_INTERVAL, FocusTrigger, RefreshScheduler, SchedulerConfig};
pub use store::{TokenStore, storage_key};
