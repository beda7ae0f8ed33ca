//! Carrier token endpoint exposed by the automation backend.

use std::fmt;
use std::str::FromStr;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{TokenEndpoint, read_body, require};
use crate::error::{Error, Result};
use crate::parse::parse_logistics_json;
use crate::token::TokenGrant;

/// Freight carriers with their own short-lived API tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Carrier {
    /// Estes Express Lines.
    Estes,
    /// XPO Logistics.
    Xpo,
}

impl Carrier {
    /// All supported carriers.
    pub const ALL: [Self; 2] = [Self::Estes, Self::Xpo];

    /// Lowercase identifier used in URLs and storage keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Estes => "estes",
            Self::Xpo => "xpo",
        }
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Carrier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "estes" => Ok(Self::Estes),
            "xpo" => Ok(Self::Xpo),
            other => Err(Error::InvalidConfig(format!("unknown carrier: {other}"))),
        }
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    carrier: Carrier,
    username: &'a str,
    password: &'a str,
}

/// Token endpoint for one carrier.
#[derive(Debug, Clone)]
pub struct LogisticsEndpoint {
    /// Token endpoint URL.
    pub token_url: Url,
    /// Carrier this endpoint issues tokens for.
    pub carrier: Carrier,
    name: String,
    username: String,
    password: String,
    http_client: Client,
}

impl LogisticsEndpoint {
    /// Creates an endpoint for `carrier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or a credential is blank.
    pub fn new(
        token_url: impl AsRef<str>,
        carrier: Carrier,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let username = username.into();
        let password = password.into();
        require("logistics username", &username)?;
        require("logistics password", &password)?;

        Ok(Self {
            token_url: Url::parse(token_url.as_ref())?,
            carrier,
            name: format!("logistics-{carrier}"),
            username,
            password,
            http_client: Client::new(),
        })
    }

    /// Uses a caller-provided HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }
}

impl TokenEndpoint for LogisticsEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn request_token(&self) -> Result<TokenGrant> {
        debug!(carrier = %self.carrier, "requesting carrier token");

        let response = self
            .http_client
            .post(self.token_url.clone())
            .json(&TokenRequest {
                carrier: self.carrier,
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await?;

        let body = read_body(response).await?;
        parse_logistics_json(&body)
    }
}
