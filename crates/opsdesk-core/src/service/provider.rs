//! Email provider read API.

use std::future::Future;
use std::sync::Arc;

use crate::email::{Folder, RawMessage};
use crate::error::Result;

/// Remote source of provider messages.
///
/// One call is one network round-trip; the provider handles its own
/// pagination and returns messages newest first.
pub trait EmailProvider: Send + Sync {
    /// Fetches up to `limit` messages from `folder`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    fn fetch(&self, folder: Folder, limit: usize) -> impl Future<Output = Result<Vec<RawMessage>>> + Send;
}

impl<P: EmailProvider> EmailProvider for Arc<P> {
    fn fetch(&self, folder: Folder, limit: usize) -> impl Future<Output = Result<Vec<RawMessage>>> + Send {
        self.as_ref().fetch(folder, limit)
    }
}
