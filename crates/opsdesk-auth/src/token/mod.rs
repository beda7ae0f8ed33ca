//! Token types and expiry bookkeeping.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Seconds subtracted from a token's declared lifetime before it counts as stale.
pub const SAFETY_BUFFER_SECS: u64 = 60;

/// A token as returned by an endpoint, before it is stamped and stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// Bearer token string.
    pub access_token: String,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Declared lifetime in seconds.
    pub expires_in: u64,
}

impl TokenGrant {
    /// Creates a new grant.
    #[must_use]
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in,
        }
    }

    /// Stamps the grant with the time it was obtained.
    #[must_use]
    pub fn issue(self, timestamp_millis: i64) -> TokenRecord {
        TokenRecord {
            token: self.access_token,
            token_type: self.token_type,
            expires_in: self.expires_in,
            timestamp: timestamp_millis,
        }
    }
}

/// A persisted short-lived credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    /// Bearer token string.
    pub token: String,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Declared lifetime in seconds.
    pub expires_in: u64,
    /// When the token was obtained (epoch milliseconds).
    pub timestamp: i64,
}

impl TokenRecord {
    /// Seconds elapsed since the token was obtained, as a fraction.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn age_secs_at(&self, now_millis: i64) -> f64 {
        now_millis.saturating_sub(self.timestamp) as f64 / 1000.0
    }

    /// Checks whether the token is stale at `now_millis`.
    ///
    /// The threshold is `max_age_secs` when given, otherwise the declared
    /// lifetime minus [`SAFETY_BUFFER_SECS`].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn is_expired_at(&self, now_millis: i64, max_age_secs: Option<u64>) -> bool {
        let threshold =
            max_age_secs.unwrap_or_else(|| self.expires_in.saturating_sub(SAFETY_BUFFER_SECS));
        self.age_secs_at(now_millis) >= threshold as f64
    }

    /// Instant at which the provider considers the token expired.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let lifetime_ms = i64::try_from(self.expires_in).ok()?.checked_mul(1000)?;
        Utc.timestamp_millis_opt(self.timestamp.checked_add(lifetime_ms)?)
            .single()
    }

    /// Time left before the provider's expiry, or zero once it has passed.
    #[must_use]
    pub fn remaining_at(&self, now_millis: i64) -> Duration {
        let lifetime_ms = i64::try_from(self.expires_in)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let left = self
            .timestamp
            .saturating_add(lifetime_ms)
            .saturating_sub(now_millis);
        u64::try_from(left).map_or(Duration::ZERO, Duration::from_millis)
    }

    /// Returns the `Authorization` header value.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}
