//! Email domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Logical email collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Folder {
    /// Received mail.
    Inbox,
    /// Sent mail.
    Sent,
}

impl Folder {
    /// Lowercase identifier used in storage keys and URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Sent => "sent",
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Folder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inbox" => Ok(Self::Inbox),
            "sent" => Ok(Self::Sent),
            other => Err(Error::Config(format!("unknown folder: {other}"))),
        }
    }
}

/// An email attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Filename.
    pub filename: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Base64 payload; absent in lightweight projections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_base64: Option<String>,
}

/// Projection of a provider message.
///
/// The same id exists in two shapes: *full* (bodies and attachment payloads
/// present) for the reading pane and *lightweight* (content stripped) for
/// lists. Both share every other field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    /// Provider message id.
    pub id: String,
    /// Provider thread id.
    pub thread_id: String,
    /// Folder the message was loaded from.
    pub folder: Folder,
    /// Subject line.
    pub subject: String,
    /// Sender.
    pub from: String,
    /// Recipients.
    pub to: String,
    /// CC recipients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    /// BCC recipients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcc: Option<String>,
    /// Received time for inbox mail, sent time for sent mail.
    pub date: DateTime<Utc>,
    /// Short plain-text preview.
    pub preview: String,
    /// Provider snippet.
    pub snippet: String,
    /// Plain text body.
    pub text_body: Option<String>,
    /// HTML body.
    pub html_body: Option<String>,
    /// Number of attachments.
    pub attachments_count: usize,
    /// Whether the message has attachments.
    pub has_attachments: bool,
    /// Attachment metadata (and payloads in full projections).
    pub attachments: Vec<Attachment>,
}

impl Email {
    /// Returns the content-stripped projection of this email.
    #[must_use]
    pub fn to_lightweight(&self) -> Self {
        Self {
            text_body: None,
            html_body: None,
            attachments: self
                .attachments
                .iter()
                .map(|a| Attachment {
                    content_base64: None,
                    ..a.clone()
                })
                .collect(),
            ..self.clone()
        }
    }

    /// Consumes the email and returns its lightweight projection.
    #[must_use]
    pub fn into_lightweight(mut self) -> Self {
        self.text_body = None;
        self.html_body = None;
        for attachment in &mut self.attachments {
            attachment.content_base64 = None;
        }
        self
    }

    /// Returns true if any body or attachment payload is present.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.text_body.is_some()
            || self.html_body.is_some()
            || self.attachments.iter().any(|a| a.content_base64.is_some())
    }
}
