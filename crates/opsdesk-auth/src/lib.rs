//! # opsdesk-auth
//!
//! Short-lived credential plumbing for the back office integrations.
//!
//! ## Features
//!
//! - **Token records**: issue timestamp, declared lifetime and a 60 second
//!   safety buffer for expiry checks
//! - **Strict parsing**: Walmart `OAuthTokenDTO` XML and the automation
//!   backend's carrier token envelope are validated once at the boundary
//! - **Endpoints**: Walmart Marketplace client credentials, Estes and XPO
//!   carrier logins
//!
//! ## Quick Start
//!
//! ```ignore
//! use opsdesk_auth::{TokenEndpoint, WalmartEndpoint};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoint = WalmartEndpoint::production("client_id", "client_secret")?;
//!     let grant = endpoint.request_token().await?;
//!
//!     let record = grant.issue(chrono::Utc::now().timestamp_millis());
//!     println!("Authorization: {}", record.authorization());
//!     Ok(())
//! }
//! ```
//!
//! Persisting records and deciding when to refresh is the job of
//! `opsdesk-core`'s token stores.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod parse;
pub mod provider;
pub mod token;

pub use error::{Error, Result};
pub use parse::{parse_logistics_json, parse_walmart_xml};
pub use provider::{Carrier, LogisticsEndpoint, TokenEndpoint, WalmartEndpoint};
pub use token::{SAFETY_BUFFER_SECS, TokenGrant, TokenRecord};
