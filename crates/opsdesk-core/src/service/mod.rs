//! Email loading services.
//!
//! [`MailLoader`] drives a folder view: it fetches from an [`EmailProvider`],
//! reuses the caches in [`crate::cache`], and applies client-side filters.
//! [`LoadSupervisor`] makes sure only the newest load for a view can land.

mod http;
mod loader;
mod provider;
mod task;

pub use http::HttpEmailProvider;
pub use loader::{DEFAULT_LIMIT, LoadOptions, MailLoader};
pub use provider::EmailProvider;
pub use task::LoadSupervisor;
