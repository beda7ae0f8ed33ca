//! Token endpoint configurations.

mod logistics;
mod walmart;

pub use logistics::{Carrier, LogisticsEndpoint};
pub use walmart::WalmartEndpoint;

use std::future::Future;

use crate::error::{Error, Result};
use crate::token::TokenGrant;

/// A remote endpoint that issues short-lived bearer tokens.
///
/// Credentials are part of the endpoint's configuration; callers never pass
/// user input through this trait.
pub trait TokenEndpoint: Send + Sync {
    /// Human-readable endpoint name used in logs.
    fn name(&self) -> &str;

    /// Requests a fresh token.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status or an
    /// unparsable body.
    fn request_token(&self) -> impl Future<Output = Result<TokenGrant>> + Send;
}

/// Reads a response body, turning non-success statuses into [`Error::Status`].
pub(crate) async fn read_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(Error::status(status.as_u16(), &body));
    }
    Ok(body)
}

/// Rejects blank credential values.
pub(crate) fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidConfig(format!("{field} is empty")));
    }
    Ok(())
}
