//! Client-side list filters and their canonical cache signature.

use std::collections::BTreeMap;

use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::Email;

/// Date window applied to an email's local calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DateRange {
    /// Today only.
    Today,
    /// Yesterday only.
    Yesterday,
    /// From `days` days ago through today.
    LastDays {
        /// Number of days to look back.
        days: u32,
    },
    /// Explicit bounds; either side may be open.
    Custom {
        /// First day included.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<NaiveDate>,
        /// Last day included.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<NaiveDate>,
    },
}

impl DateRange {
    /// Resolves the range to inclusive `(from, to)` bounds relative to `today`.
    #[must_use]
    pub fn bounds(self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match self {
            Self::Today => (Some(today), Some(today)),
            Self::Yesterday => {
                let day = today.checked_sub_days(Days::new(1));
                (day, day)
            }
            Self::LastDays { days } => (
                today.checked_sub_days(Days::new(u64::from(days))),
                Some(today),
            ),
            Self::Custom { from, to } => (from, to),
        }
    }

    /// Returns true if `day` falls inside the range.
    #[must_use]
    pub fn contains(self, day: NaiveDate, today: NaiveDate) -> bool {
        let (from, to) = self.bounds(today);
        from.is_none_or(|from| day >= from) && to.is_none_or(|to| day <= to)
    }
}

/// Filters for a folder listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailFilters {
    /// Case-insensitive substring matched against subject, sender,
    /// recipients, preview and snippet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Exact match on whether the email has attachments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_attachments: Option<bool>,
    /// Date window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    /// Number of items to load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl EmailFilters {
    /// Sets the search text.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Sets the attachment filter.
    #[must_use]
    pub const fn with_attachments(mut self, has_attachments: bool) -> Self {
        self.has_attachments = Some(has_attachments);
        self
    }

    /// Sets the date window.
    #[must_use]
    pub const fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Sets the item limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Canonical JSON signature: keys sorted at every level, `null` and
    /// empty-string values dropped. Equal filters always produce equal
    /// signatures.
    #[must_use]
    pub fn signature(&self) -> String {
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        canonical(&value).map_or_else(|| "{}".to_string(), |v| v.to_string())
    }

    /// Returns true if `email` passes every active filter.
    #[must_use]
    pub fn matches(&self, email: &Email, today: NaiveDate) -> bool {
        if let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = needle.to_lowercase();
            let hit = [
                email.subject.as_str(),
                email.from.as_str(),
                email.to.as_str(),
                email.preview.as_str(),
                email.snippet.as_str(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if let Some(wanted) = self.has_attachments {
            if email.has_attachments != wanted {
                return false;
            }
        }

        if let Some(range) = self.date_range {
            let day = email.date.with_timezone(&Local).date_naive();
            if !range.contains(day, today) {
                return false;
            }
        }

        true
    }
}

/// Rebuilds `value` with sorted object keys, dropping `null` and `""`.
fn canonical(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> = map
                .iter()
                .filter_map(|(k, v)| canonical(v).map(|v| (k, v)))
                .collect();
            Some(Value::Object(
                sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect(),
            ))
        }
        Value::Array(items) => Some(Value::Array(items.iter().filter_map(canonical).collect())),
        other => Some(other.clone()),
    }
}

/// Applies `filters` to `emails`, preserving order.
#[must_use]
pub fn apply_filters(emails: Vec<Email>, filters: &EmailFilters, today: NaiveDate) -> Vec<Email> {
    emails
        .into_iter()
        .filter(|email| filters.matches(email, today))
        .collect()
}
