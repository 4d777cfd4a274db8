//! Per-deployment reqwest client cache.

use std::time::Duration;

use dashmap::DashMap;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;

use crate::config::{ConfigError, ServerConfig, normalize_deploy_key};
use crate::constants::CONNECT_TIMEOUT_SECS;
use crate::error::ClientError;
use crate::user_agent::default_user_agent;

/// Builds one [`Client`] per deployment key and reuses it afterwards.
///
/// Clients carry the deployment's bearer token as a default header, so a
/// cached client is only valid for the server it was built from.
#[derive(Debug, Default)]
pub struct ClientFactory {
    clients: DashMap<String, Client>,
}

impl ClientFactory {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached client for `deploy_key`, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the API key cannot be sent as a
    /// header and [`ClientError::ClientBuild`] when reqwest rejects the
    /// configuration.
    pub fn client_for(&self, deploy_key: &str, server: &ServerConfig) -> Result<Client, ClientError> {
        let key = normalize_deploy_key(deploy_key);
        if let Some(client) = self.clients.get(key) {
            return Ok(client.clone());
        }
        let entry = self
            .clients
            .entry(key.to_string())
            .or_try_insert_with(|| build_client(key, server))?;
        Ok(entry.clone())
    }

    /// Drops the cached client for `deploy_key`, if any.
    pub fn evict(&self, deploy_key: &str) -> bool {
        self.clients
            .remove(normalize_deploy_key(deploy_key))
            .is_some()
    }

    /// Number of cached clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

fn build_client(deploy_key: &str, server: &ServerConfig) -> Result<Client, ClientError> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", server.api_key.trim())).map_err(
        |_| {
            ConfigError::Invalid {
                field: format!("servers.{deploy_key}.api_key"),
                message: "contains characters not allowed in an HTTP header".to_string(),
            }
        },
    )?;
    auth.set_sensitive(true);
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);

    debug!(
        deploy_key,
        address = %server.address,
        timeout_ms = server.timeout_ms,
        "building HTTP client"
    );
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .read_timeout(server.timeout())
        .user_agent(default_user_agent())
        .default_headers(headers)
        .gzip(true)
        .build()
        .map_err(|source| ClientError::ClientBuild {
            deploy_key: deploy_key.to_string(),
            source,
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn server() -> ServerConfig {
        ServerConfig::new("http://127.0.0.1:9380", "ragflow-key")
    }

    #[test]
    fn test_client_is_built_once_per_key() {
        let factory = ClientFactory::new();
        factory.client_for("keyA", &server()).unwrap();
        factory.client_for("keyA", &server()).unwrap();
        assert_eq!(factory.len(), 1);
        factory.client_for("keyB", &server()).unwrap();
        assert_eq!(factory.len(), 2);
    }

    #[test]
    fn test_blank_key_shares_global_entry() {
        let factory = ClientFactory::new();
        factory.client_for("", &server()).unwrap();
        factory.client_for("global", &server()).unwrap();
        assert_eq!(factory.len(), 1);
        assert!(factory.evict(" "));
        assert!(factory.is_empty());
    }

    #[test]
    fn test_api_key_with_newline_is_config_error() {
        let factory = ClientFactory::new();
        let bad = ServerConfig::new("http://127.0.0.1:9380", "abc\ndef");
        let err = factory.client_for("keyA", &bad).unwrap_err();
        assert!(matches!(err, ClientError::Config(ConfigError::Invalid { .. })));
        assert!(factory.is_empty());
    }
}
