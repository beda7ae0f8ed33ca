//! Cache data models.
//!
//! These are the on-disk shapes; field names are camelCase so entries written
//! by one backend are readable by any other.

use serde::{Deserialize, Serialize};

use crate::email::Folder;

/// A single cached email.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedEmail<T> {
    /// Cached projection.
    pub email: T,
    /// When the entry was written (epoch milliseconds).
    pub timestamp: i64,
    /// Email id the entry belongs to.
    pub email_id: String,
}

/// Which ids were written for which folder.
///
/// The index is advisory: entries expire independently, so it may list ids
/// whose entry is already gone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStorageIndex {
    /// Ids written for the inbox.
    #[serde(default)]
    pub inbox: Vec<String>,
    /// Ids written for sent mail.
    #[serde(default)]
    pub sent: Vec<String>,
    /// Last index update (epoch milliseconds).
    #[serde(default)]
    pub last_updated: i64,
}

impl EmailStorageIndex {
    /// Ids recorded for `folder`.
    #[must_use]
    pub fn ids(&self, folder: Folder) -> &[String] {
        match folder {
            Folder::Inbox => &self.inbox,
            Folder::Sent => &self.sent,
        }
    }

    pub(crate) fn ids_mut(&mut self, folder: Folder) -> &mut Vec<String> {
        match folder {
            Folder::Inbox => &mut self.inbox,
            Folder::Sent => &mut self.sent,
        }
    }
}

/// A cached list result for one filter signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEmailList<T> {
    /// Cached items, in display order.
    pub data: Vec<T>,
    /// When the list was written (epoch milliseconds).
    pub timestamp: i64,
    /// Filter signature the list was stored under.
    pub filters: String,
}

/// Partition of ids by cache validity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckResult {
    /// Ids with a live cache entry.
    pub cached: Vec<String>,
    /// Ids that must be fetched.
    pub missing: Vec<String>,
}
