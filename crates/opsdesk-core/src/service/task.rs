//! Cancellable load tasks.
//!
//! Each folder view owns a [`LoadSupervisor`]. Starting a load cancels the
//! previous one, so a slow, superseded response can never overwrite the
//! caches or the view after a newer request has started.

use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Hands out one live cancellation token at a time.
#[derive(Debug, Default)]
pub struct LoadSupervisor {
    current: Mutex<Option<CancellationToken>>,
}

impl LoadSupervisor {
    /// Creates a supervisor with no load in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the in-flight load, if any, and returns a token for the next one.
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let previous = match self.current.lock() {
            Ok(mut current) => current.replace(token.clone()),
            Err(poisoned) => poisoned.into_inner().replace(token.clone()),
        };
        if let Some(previous) = previous {
            if !previous.is_cancelled() {
                debug!("Superseding in-flight load");
                previous.cancel();
            }
        }
        token
    }

    /// Cancels the in-flight load without starting another.
    pub fn cancel(&self) {
        let current = match self.current.lock() {
            Ok(mut current) => current.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(token) = current {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_cancels_previous() {
        let supervisor = LoadSupervisor::new();
        let first = supervisor.begin();
        let second = supervisor.begin();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn test_cancel() {
        let supervisor = LoadSupervisor::new();
        let token = supervisor.begin();
        supervisor.cancel();
        assert!(token.is_cancelled());

        // Nothing in flight: no-op.
        supervisor.cancel();
        assert!(!supervisor.begin().is_cancelled());
    }
}
