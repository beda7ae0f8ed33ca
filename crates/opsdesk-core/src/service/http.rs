//! HTTP client for the automation backend's email endpoints.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::provider::EmailProvider;
use crate::email::{Folder, RawMessage};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Email provider backed by `GET {base}/api/emails/{folder}?limit=N`.
#[derive(Debug, Clone)]
pub struct HttpEmailProvider {
    base_url: Url,
    http_client: Client,
}

impl HttpEmailProvider {
    /// Creates a provider for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or cannot be a base.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("{base_url} cannot be a base URL")));
        }
        Ok(Self {
            base_url,
            http_client: Client::new(),
        })
    }

    /// Uses a caller-provided HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    /// Endpoint URL for `folder`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be joined.
    pub fn folder_url(&self, folder: Folder, limit: usize) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config("base URL cannot have path segments".into()))?
            .pop_if_empty()
            .extend(["api", "emails", folder.as_str()]);
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }
}

/// Turns a failed response into the matching error.
fn status_error(status: StatusCode, body: &str) -> Error {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error
        .or(parsed.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        Error::Unauthorized(message)
    } else {
        Error::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Decodes each message independently so one malformed entry does not
/// discard the whole page.
fn decode_messages(values: Vec<Value>) -> Vec<RawMessage> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<RawMessage>(value) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!("Skipping malformed provider message: {e}");
                None
            }
        })
        .collect()
}

impl EmailProvider for HttpEmailProvider {
    async fn fetch(&self, folder: Folder, limit: usize) -> Result<Vec<RawMessage>> {
        let url = self.folder_url(folder, limit)?;
        debug!("GET {url}");

        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)?;
        Ok(decode_messages(parsed.messages))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_url() {
        let provider = HttpEmailProvider::new("http://localhost:8000/").unwrap();
        assert_eq!(
            provider.folder_url(Folder::Inbox, 25).unwrap().as_str(),
            "http://localhost:8000/api/emails/inbox?limit=25"
        );

        let nested = HttpEmailProvider::new("https://ops.example.com/automation").unwrap();
        assert_eq!(
            nested.folder_url(Folder::Sent, 10).unwrap().as_str(),
            "https://ops.example.com/automation/api/emails/sent?limit=10"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(HttpEmailProvider::new("mailto:ops@example.com").is_err());
    }

    #[test]
    fn test_status_error_classification() {
        let err = status_error(StatusCode::UNAUTHORIZED, r#"{"error":"Gmail session expired"}"#);
        assert!(matches!(&err, Error::Unauthorized(msg) if msg == "Gmail session expired"));
        assert!(err.is_auth_error());

        let err = status_error(StatusCode::BAD_GATEWAY, "<html>upstream</html>");
        assert!(matches!(
            err,
            Error::Api { status: 502, ref message } if message == "Bad Gateway"
        ));
    }

    #[test]
    fn test_decode_skips_malformed_messages() {
        let values = vec![
            serde_json::json!({"id": "a", "internalDate": "1"}),
            serde_json::json!({"threadId": "no-id"}),
            serde_json::json!({"id": "b", "headers": [{"name": "Subject", "value": "x"}]}),
        ];
        let decoded = decode_messages(values);
        let ids: Vec<&str> = decoded.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
