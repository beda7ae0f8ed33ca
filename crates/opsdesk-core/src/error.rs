//! Error types for the core library.

use thiserror::Error;

use crate::storage::StorageError;

/// Phrases providers use when a session or grant has lapsed.
const AUTH_MARKERS: [&str; 6] = [
    "unauthorized",
    "unauthenticated",
    "invalid_grant",
    "token expired",
    "session expired",
    "not authenticated",
];

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected our session.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// The provider answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// A provider message failed validation.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Token endpoint failure.
    #[error("Auth error: {0}")]
    Auth(#[from] opsdesk_auth::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The operation was superseded or aborted.
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for expected "please sign in again" failures.
    ///
    /// Callers use this to keep routine session expiry out of error logs.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::Unauthorized(_) => true,
            Self::Api { status, message } => {
                matches!(status, 401 | 403) || mentions_auth(message)
            }
            Self::Auth(e) => e.is_unauthorized() || mentions_auth(&e.to_string()),
            Self::Http(e) => e
                .status()
                .is_some_and(|s| matches!(s.as_u16(), 401 | 403)),
            _ => false,
        }
    }

    /// Returns true if the operation was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

fn mentions_auth(message: &str) -> bool {
    let lower = message.to_lowercase();
    AUTH_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_classification() {
        assert!(Error::Unauthorized("session".into()).is_auth_error());
        assert!(
            Error::Api {
                status: 401,
                message: String::new()
            }
            .is_auth_error()
        );
        assert!(
            Error::Api {
                status: 500,
                message: "Gmail: invalid_grant (Token has been expired or revoked.)".into()
            }
            .is_auth_error()
        );
        assert!(Error::Auth(opsdesk_auth::Error::status(403, "forbidden")).is_auth_error());
    }

    #[test]
    fn test_other_errors_are_not_auth() {
        assert!(
            !Error::Api {
                status: 502,
                message: "bad gateway".into()
            }
            .is_auth_error()
        );
        assert!(!Error::Cancelled.is_auth_error());
        assert!(!Error::InvalidMessage("no date".into()).is_auth_error());
        assert!(Error::Cancelled.is_cancelled());
    }
}
