//! Application configuration.
//!
//! Read from `<config dir>/opsdesk/config.json` when present, then
//! overridden by environment variables. Credentials normally come from the
//! environment and are never prompted for.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use opsdesk_auth::Carrier;
use serde::{Deserialize, Serialize};

/// Where token records are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    /// Same JSON file as the email caches.
    #[default]
    File,
    /// Platform credential store.
    Keyring,
}

/// Cache tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Per-email entry lifetime in seconds.
    pub email_ttl_secs: u64,
    /// List entry lifetime in seconds.
    pub list_ttl_secs: u64,
    /// Items loaded when no `--limit` is given.
    pub page_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            email_ttl_secs: 300,
            list_ttl_secs: 180,
            page_size: opsdesk_core::service::DEFAULT_LIMIT,
        }
    }
}

impl CacheConfig {
    pub const fn email_ttl(&self) -> Duration {
        Duration::from_secs(self.email_ttl_secs)
    }

    pub const fn list_ttl(&self) -> Duration {
        Duration::from_secs(self.list_ttl_secs)
    }
}

/// Walmart Marketplace client credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalmartConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Overrides the production token URL.
    pub token_url: Option<String>,
}

/// Carrier logins on the automation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticsConfig {
    pub token_url: String,
    pub username: String,
    pub password: String,
    pub carriers: Vec<Carrier>,
}

impl Default for LogisticsConfig {
    fn default() -> Self {
        Self {
            token_url: String::new(),
            username: String::new(),
            password: String::new(),
            carriers: Carrier::ALL.to_vec(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the automation backend serving `/api/emails/*`.
    pub email_api_url: String,
    pub cache: CacheConfig,
    /// Token refresh timer period in seconds.
    pub refresh_interval_secs: u64,
    /// Storage file; defaults to the platform data directory.
    pub storage_path: Option<PathBuf>,
    pub token_backend: TokenBackend,
    pub walmart: Option<WalmartConfig>,
    pub logistics: Option<LogisticsConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            email_api_url: "http://localhost:8000".into(),
            cache: CacheConfig::default(),
            refresh_interval_secs: opsdesk_core::tokens::DEFAULT_INTERVAL.as_secs(),
            storage_path: None,
            token_backend: TokenBackend::default(),
            walmart: None,
            logistics: None,
        }
    }
}

impl AppConfig {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("opsdesk")
            .join("config.json")
    }

    /// Loads `path` (or the default location) and applies the environment.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.map_or_else(Self::default_path, Path::to_path_buf);
        let mut config = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overrides fields from `lookup` (normally the process environment).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("OPSDESK_EMAIL_API_URL") {
            self.email_api_url = url;
        }

        let walmart_id = var("WALMART_CLIENT_ID");
        let walmart_secret = var("WALMART_CLIENT_SECRET");
        let walmart_url = var("WALMART_TOKEN_URL");
        if walmart_id.is_some() || walmart_secret.is_some() || walmart_url.is_some() {
            let walmart = self.walmart.get_or_insert_with(WalmartConfig::default);
            if let Some(id) = walmart_id {
                walmart.client_id = id;
            }
            if let Some(secret) = walmart_secret {
                walmart.client_secret = secret;
            }
            if walmart_url.is_some() {
                walmart.token_url = walmart_url;
            }
        }

        let logistics_url = var("LOGISTICS_TOKEN_URL");
        let logistics_user = var("LOGISTICS_USERNAME");
        let logistics_password = var("LOGISTICS_PASSWORD");
        if logistics_url.is_some() || logistics_user.is_some() || logistics_password.is_some() {
            let logistics = self.logistics.get_or_insert_with(LogisticsConfig::default);
            if let Some(url) = logistics_url {
                logistics.token_url = url;
            }
            if let Some(user) = logistics_user {
                logistics.username = user;
            }
            if let Some(password) = logistics_password {
                logistics.password = password;
            }
        }
    }

    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.cache.email_ttl(), Duration::from_secs(300));
        assert_eq!(config.cache.list_ttl(), Duration::from_secs(180));
        assert_eq!(config.refresh_interval(), Duration::from_secs(600));
        assert!(config.walmart.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"cache": {"page_size": 20}, "token_backend": "keyring"}"#).unwrap();
        assert_eq!(config.cache.page_size, 20);
        assert_eq!(config.cache.email_ttl_secs, 300);
        assert_eq!(config.token_backend, TokenBackend::Keyring);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("OPSDESK_EMAIL_API_URL", "https://automation.example.com"),
            ("WALMART_CLIENT_ID", "id"),
            ("WALMART_CLIENT_SECRET", "secret"),
            ("LOGISTICS_TOKEN_URL", "https://automation.example.com/api/logistics/token"),
            ("LOGISTICS_USERNAME", "ops"),
            ("LOGISTICS_PASSWORD", ""),
        ]));

        assert_eq!(config.email_api_url, "https://automation.example.com");
        let walmart = config.walmart.unwrap();
        assert_eq!(walmart.client_id, "id");
        assert_eq!(walmart.token_url, None);

        let logistics = config.logistics.unwrap();
        assert_eq!(logistics.username, "ops");
        assert_eq!(logistics.password, "");
        assert_eq!(logistics.carriers, Carrier::ALL.to_vec());
    }

    #[test]
    fn test_env_merges_with_file_values() {
        let mut config: AppConfig = serde_json::from_str(
            r#"{"walmart": {"client_id": "from-file", "token_url": "https://sandbox.example.com/v3/token"}}"#,
        )
        .unwrap();
        config.apply_env(env(&[("WALMART_CLIENT_SECRET", "from-env")]));

        let walmart = config.walmart.unwrap();
        assert_eq!(walmart.client_id, "from-file");
        assert_eq!(walmart.client_secret, "from-env");
        assert!(walmart.token_url.is_some());
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("opsdesk-config-missing").join("config.json");
        let config = AppConfig::load(Some(&path)).await.unwrap();
        assert_eq!(config.cache, CacheConfig::default());
    }
}
