//! Provider wire format and its projection into [`Email`].

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::model::{Attachment, Email, Folder};
use crate::error::{Error, Result};

/// Maximum preview length in characters.
const PREVIEW_CHARS: usize = 200;

/// Subject used when the header is missing or blank.
const NO_SUBJECT: &str = "(no subject)";

/// A message header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

/// Attachment as sent by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttachment {
    /// Filename.
    pub filename: String,
    /// MIME type.
    #[serde(default)]
    pub mime_type: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Base64 payload.
    #[serde(default)]
    pub content_base64: Option<String>,
}

/// Message as returned by the email provider read API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    /// Provider message id.
    pub id: String,
    /// Provider thread id.
    #[serde(default)]
    pub thread_id: String,
    /// Message headers.
    #[serde(default)]
    pub headers: Vec<Header>,
    /// Epoch milliseconds, as a decimal string.
    #[serde(default)]
    pub internal_date: Option<String>,
    /// Provider snippet.
    #[serde(default)]
    pub snippet: String,
    /// Plain text body.
    #[serde(default)]
    pub text_body: Option<String>,
    /// HTML body.
    #[serde(default)]
    pub html_body: Option<String>,
    /// Attachments.
    #[serde(default)]
    pub attachments: Vec<RawAttachment>,
}

impl RawMessage {
    /// Case-insensitive header lookup; blank values count as absent.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.trim())
            .filter(|v| !v.is_empty())
    }

    /// Resolves the message time: `internalDate` first, then the `Date` header.
    fn date(&self) -> Option<DateTime<Utc>> {
        self.internal_date
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .or_else(|| {
                self.header("Date")
                    .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                    .map(|d| d.with_timezone(&Utc))
            })
    }
}

/// Collapses whitespace and truncates to [`PREVIEW_CHARS`] characters.
fn preview_of(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => collapsed[..idx].to_string(),
        None => collapsed,
    }
}

impl Email {
    /// Builds the full projection of a provider message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMessage`] if the id is empty or no date can be
    /// resolved from `internalDate` or the `Date` header.
    pub fn from_raw(raw: RawMessage, folder: Folder) -> Result<Self> {
        if raw.id.trim().is_empty() {
            return Err(Error::InvalidMessage("message without id".into()));
        }
        let date = raw
            .date()
            .ok_or_else(|| Error::InvalidMessage(format!("message {} has no usable date", raw.id)))?;

        let subject = raw.header("Subject").unwrap_or(NO_SUBJECT).to_string();
        let from = raw.header("From").unwrap_or_default().to_string();
        let to = raw.header("To").unwrap_or_default().to_string();
        let cc = raw.header("Cc").map(str::to_string);
        let bcc = raw.header("Bcc").map(str::to_string);

        let preview = raw
            .text_body
            .as_deref()
            .map(preview_of)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| preview_of(&raw.snippet));

        let attachments: Vec<Attachment> = raw
            .attachments
            .into_iter()
            .map(|a| Attachment {
                filename: a.filename,
                mime_type: a.mime_type,
                size: a.size,
                content_base64: a.content_base64,
            })
            .collect();

        Ok(Self {
            thread_id: if raw.thread_id.is_empty() {
                raw.id.clone()
            } else {
                raw.thread_id
            },
            id: raw.id,
            folder,
            subject,
            from,
            to,
            cc,
            bcc,
            date,
            preview,
            snippet: raw.snippet,
            text_body: raw.text_body,
            html_body: raw.html_body,
            attachments_count: attachments.len(),
            has_attachments: !attachments.is_empty(),
            attachments,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreadable_literal)]
mod tests {
    use super::*;

    fn header(name: &str, value: &str) -> Header {
        Header {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    fn raw() -> RawMessage {
        RawMessage {
            id: "m1".to_string(),
            thread_id: "t1".to_string(),
            headers: vec![
                header("from", "Dock 4 <dock4@example.com>"),
                header("To", "orders@example.com"),
                header("CC", "ops@example.com"),
                header("Subject", "BOL for PO 1182"),
            ],
            internal_date: Some("1741953600000".to_string()),
            snippet: "Attached is the bill of lading".to_string(),
            text_body: Some("Attached   is the\nbill of lading.".to_string()),
            html_body: Some("<p>Attached is the bill of lading.</p>".to_string()),
            attachments: vec![RawAttachment {
                filename: "bol.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                size: 2048,
                content_base64: Some("JVBERi0=".to_string()),
            }],
        }
    }

    #[test]
    fn test_full_projection() {
        let email = Email::from_raw(raw(), Folder::Inbox).unwrap();
        assert_eq!(email.from, "Dock 4 <dock4@example.com>");
        assert_eq!(email.cc.as_deref(), Some("ops@example.com"));
        assert_eq!(email.bcc, None);
        assert_eq!(email.date.timestamp_millis(), 1741953600000);
        assert_eq!(email.preview, "Attached is the bill of lading.");
        assert_eq!(email.attachments_count, 1);
        assert!(email.has_attachments);
        assert!(email.is_full());
    }

    #[test]
    fn test_lightweight_shares_metadata() {
        let full = Email::from_raw(raw(), Folder::Sent).unwrap();
        let light = full.to_lightweight();

        assert!(!light.is_full());
        assert_eq!(light.text_body, None);
        assert_eq!(light.html_body, None);
        assert_eq!(light.attachments[0].content_base64, None);
        assert_eq!(light.attachments[0].filename, "bol.pdf");

        let restripped = Email {
            text_body: full.text_body.clone(),
            html_body: full.html_body.clone(),
            attachments: full.attachments.clone(),
            ..light.clone()
        };
        assert_eq!(restripped, full);
        assert_eq!(full.clone().into_lightweight(), light);
    }

    #[test]
    fn test_date_header_fallback() {
        let mut message = raw();
        message.internal_date = Some("not-a-number".to_string());
        message.headers.push(header("Date", "Fri, 14 Mar 2025 12:00:00 +0000"));

        let email = Email::from_raw(message, Folder::Inbox).unwrap();
        assert_eq!(email.date.timestamp_millis(), 1741953600000);
    }

    #[test]
    fn test_rejects_undated_message() {
        let mut message = raw();
        message.internal_date = None;
        assert!(matches!(
            Email::from_raw(message, Folder::Inbox),
            Err(Error::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_rejects_missing_id() {
        let mut message = raw();
        message.id = " ".to_string();
        assert!(Email::from_raw(message, Folder::Inbox).is_err());
    }

    #[test]
    fn test_defaults_for_sparse_message() {
        let message: RawMessage =
            serde_json::from_str(r#"{"id":"m9","internalDate":"0","snippet":"hi"}"#).unwrap();
        let email = Email::from_raw(message, Folder::Inbox).unwrap();
        assert_eq!(email.subject, "(no subject)");
        assert_eq!(email.thread_id, "m9");
        assert_eq!(email.preview, "hi");
        assert!(!email.has_attachments);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let text = "é".repeat(300);
        assert_eq!(preview_of(&text).chars().count(), 200);
    }
}
