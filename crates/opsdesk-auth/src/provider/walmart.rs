//! Walmart Marketplace client-credentials token endpoint.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use tracing::debug;
use url::Url;

use super::{TokenEndpoint, read_body, require};
use crate::error::Result;
use crate::parse::parse_walmart_xml;
use crate::token::TokenGrant;

/// Production token URL.
pub const DEFAULT_TOKEN_URL: &str = "https://marketplace.walmartapis.com/v3/token";

/// Service name header value expected by the Marketplace gateway.
const SERVICE_NAME: &str = "Walmart Marketplace";

/// Walmart Marketplace token endpoint.
#[derive(Debug, Clone)]
pub struct WalmartEndpoint {
    /// Token endpoint URL.
    pub token_url: Url,
    client_id: String,
    client_secret: String,
    http_client: Client,
}

impl WalmartEndpoint {
    /// Creates an endpoint for the given application credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or a credential is blank.
    pub fn new(
        token_url: impl AsRef<str>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        require("Walmart client id", &client_id)?;
        require("Walmart client secret", &client_secret)?;

        Ok(Self {
            token_url: Url::parse(token_url.as_ref())?,
            client_id,
            client_secret,
            http_client: Client::new(),
        })
    }

    /// Creates an endpoint against the production token URL.
    ///
    /// # Errors
    ///
    /// Returns an error if a credential is blank.
    pub fn production(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        Self::new(DEFAULT_TOKEN_URL, client_id, client_secret)
    }

    /// Uses a caller-provided HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(raw.as_bytes()))
    }
}

fn correlation_id() -> String {
    format!("{:032x}", rand::thread_rng().r#gen::<u128>())
}

impl TokenEndpoint for WalmartEndpoint {
    fn name(&self) -> &str {
        "walmart"
    }

    async fn request_token(&self) -> Result<TokenGrant> {
        let correlation = correlation_id();
        debug!(correlation = %correlation, "requesting Walmart token");

        let response = self
            .http_client
            .post(self.token_url.clone())
            .header(AUTHORIZATION, self.basic_auth())
            .header(ACCEPT, "application/xml")
            .header("WM_SVC.NAME", SERVICE_NAME)
            .header("WM_QOS.CORRELATION_ID", correlation)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let body = read_body(response).await?;
        parse_walmart_xml(&body)
    }
}
