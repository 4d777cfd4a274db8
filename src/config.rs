//! Deployment configuration.
//!
//! A [`ClientProperties`] maps deployment keys to servers (address, API key,
//! read timeout, codec limits) and names datasets by alias. It is read from a
//! TOML file:
//!
//! ```toml
//! [servers.global]
//! address = "http://127.0.0.1:9380"
//! api_key = "ragflow-xxxx"
//! timeout_ms = 30000
//!
//! [servers.global.codec]
//! max_in_memory_size = 262144
//!
//! [datasets.handbook]
//! dataset_id = "b2a62730759d11ef987d0242ac120004"
//!
//! [download]
//! relay_capacity = 8192
//! close_timeout_ms = 10000
//! ```
//!
//! Lookup order for the default file: `$RAGFLOW_CLIENT_CONFIG`, then
//! `$XDG_CONFIG_HOME/ragflow-client/config.toml`, then
//! `$HOME/.config/ragflow-client/config.toml`.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::constants::{
    DEFAULT_CLOSE_TIMEOUT, DEFAULT_DEPLOY_KEY, DEFAULT_MAX_IN_MEMORY_SIZE, DEFAULT_RELAY_CAPACITY,
    DEFAULT_TIMEOUT_MS, MAX_TIMEOUT_MS, MIN_RELAY_CAPACITY,
};
use crate::error::ClientError;

/// Environment variable that points at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "RAGFLOW_CLIENT_CONFIG";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config text is not valid TOML for this schema.
    #[error("failed to parse config {origin}: {source}")]
    Parse {
        /// Where the text came from (a path or `<string>`).
        origin: String,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is outside its accepted range or format.
    #[error("Invalid config value for `{field}`: {message}")]
    Invalid {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// No `[servers.*]` table is present.
    #[error("config defines no servers; add at least one [servers.<deploy_key>] table")]
    NoServers,
}

impl ConfigError {
    fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Client-wide configuration: servers per deployment key and dataset aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientProperties {
    /// Servers keyed by deployment key.
    pub servers: BTreeMap<String, ServerConfig>,
    /// Dataset aliases.
    pub datasets: BTreeMap<String, DatasetConfig>,
    /// Streamed download tuning.
    pub download: DownloadSettings,
}

/// One remote deployment.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base address, e.g. `http://127.0.0.1:9380`.
    pub address: String,
    /// Bearer token sent with every request.
    pub api_key: String,
    /// Read timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Response body limits.
    #[serde(default)]
    pub codec: CodecConfig,
}

// Keeps the API key out of logs.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("address", &self.address)
            .field("api_key", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .field("codec", &self.codec)
            .finish()
    }
}

/// Limits applied when buffering response bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Maximum bytes buffered in memory; `<= 0` selects the default (256 KiB).
    pub max_in_memory_size: i64,
}

impl CodecConfig {
    /// Effective buffer limit in bytes.
    #[must_use]
    pub fn effective_max_in_memory_size(&self) -> usize {
        usize::try_from(self.max_in_memory_size)
            .ok()
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_MAX_IN_MEMORY_SIZE)
    }
}

/// A named dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Remote dataset id.
    pub dataset_id: String,
}

/// Tuning for the stream-to-blocking bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Largest segment handed to a blocking reader at once.
    pub relay_capacity: usize,
    /// How long `close()` waits for the stream pump to stop.
    pub close_timeout_ms: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            relay_capacity: DEFAULT_RELAY_CAPACITY,
            close_timeout_ms: u64::try_from(DEFAULT_CLOSE_TIMEOUT.as_millis())
                .unwrap_or(10_000),
        }
    }
}

impl DownloadSettings {
    /// Close timeout as a [`Duration`].
    #[must_use]
    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl ServerConfig {
    /// Creates a server entry with default timeout and codec limits.
    pub fn new(address: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            api_key: api_key.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            codec: CodecConfig::default(),
        }
    }

    /// Sets the read timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets the in-memory body limit.
    #[must_use]
    pub fn with_max_in_memory_size(mut self, max_in_memory_size: i64) -> Self {
        self.codec.max_in_memory_size = max_in_memory_size;
        self
    }

    /// Read timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed base address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address is not an http(s) URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.address.trim())
            .map_err(|e| ConfigError::invalid("address", format!("'{}': {e}", self.address)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "address",
                format!("'{}': expected an http or https URL", self.address),
            ));
        }
        Ok(url)
    }

    fn validate(&self, deploy_key: &str) -> Result<(), ConfigError> {
        let prefix = format!("servers.{deploy_key}");
        if self.address.trim().is_empty() {
            return Err(ConfigError::invalid(
                format!("{prefix}.address"),
                "must not be blank",
            ));
        }
        self.base_url().map_err(|e| match e {
            ConfigError::Invalid { message, .. } => {
                ConfigError::invalid(format!("{prefix}.address"), message)
            }
            other => other,
        })?;
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::invalid(
                format!("{prefix}.api_key"),
                "must not be blank",
            ));
        }
        if !(1..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::invalid(
                format!("{prefix}.timeout_ms"),
                format!("{}. Expected range: 1..={MAX_TIMEOUT_MS}", self.timeout_ms),
            ));
        }
        Ok(())
    }
}

impl ClientProperties {
    /// Creates empty properties; add servers with [`with_server`](Self::with_server).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a server under `deploy_key`.
    #[must_use]
    pub fn with_server(mut self, deploy_key: impl Into<String>, server: ServerConfig) -> Self {
        self.servers.insert(deploy_key.into(), server);
        self
    }

    /// Adds or replaces a dataset alias.
    #[must_use]
    pub fn with_dataset(mut self, alias: impl Into<String>, dataset_id: impl Into<String>) -> Self {
        self.datasets.insert(
            alias.into(),
            DatasetConfig {
                dataset_id: dataset_id.into(),
            },
        );
        self
    }

    /// Replaces the download bridge settings.
    #[must_use]
    pub fn with_download(mut self, download: DownloadSettings) -> Self {
        self.download = download;
        self
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and any error from
    /// [`validate`](Self::validate).
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Self::parse(raw, "<string>")
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, otherwise
    /// the same errors as [`from_toml_str`](Self::from_toml_str).
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, &format!("'{}'", path.display()))
    }

    /// Loads the default config file if one exists.
    ///
    /// Returns `Ok(None)` when no path can be resolved or the file is absent.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`from_path`](Self::from_path) for an
    /// existing file.
    pub fn load_default() -> Result<Option<Self>, ConfigError> {
        let Some(path) = resolve_default_config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            debug!(path = %path.display(), "no client config file");
            return Ok(None);
        }
        Self::from_path(&path).map(Some)
    }

    fn parse(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        let properties: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        properties.validate()?;
        Ok(properties)
    }

    /// Checks every server, dataset alias and the download settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoServers`] or the first [`ConfigError::Invalid`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::NoServers);
        }
        for (deploy_key, server) in &self.servers {
            server.validate(deploy_key)?;
        }
        for (alias, dataset) in &self.datasets {
            if dataset.dataset_id.trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("datasets.{alias}.dataset_id"),
                    "must not be blank",
                ));
            }
        }
        if self.download.relay_capacity < MIN_RELAY_CAPACITY {
            return Err(ConfigError::invalid(
                "download.relay_capacity",
                format!(
                    "{}. Expected at least {MIN_RELAY_CAPACITY}",
                    self.download.relay_capacity
                ),
            ));
        }
        if !(1..=MAX_TIMEOUT_MS).contains(&self.download.close_timeout_ms) {
            return Err(ConfigError::invalid(
                "download.close_timeout_ms",
                format!(
                    "{}. Expected range: 1..={MAX_TIMEOUT_MS}",
                    self.download.close_timeout_ms
                ),
            ));
        }
        Ok(())
    }

    /// Resolves the server for `deploy_key`; a blank key selects `global`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnknownDeployKey`] when no server is configured
    /// under the (normalized) key.
    pub fn resolve_server(&self, deploy_key: &str) -> Result<&ServerConfig, ClientError> {
        let key = normalize_deploy_key(deploy_key);
        self.servers
            .get(key)
            .ok_or_else(|| ClientError::unknown_deploy_key(key))
    }

    /// Resolves a dataset alias to its remote id.
    #[must_use]
    pub fn resolve_dataset(&self, alias: &str) -> Option<&str> {
        self.datasets
            .get(alias.trim())
            .map(|dataset| dataset.dataset_id.as_str())
    }
}

/// Maps a blank deployment key to [`DEFAULT_DEPLOY_KEY`].
#[must_use]
pub fn normalize_deploy_key(deploy_key: &str) -> &str {
    let trimmed = deploy_key.trim();
    if trimmed.is_empty() {
        DEFAULT_DEPLOY_KEY
    } else {
        trimmed
    }
}

/// Resolves the default config file path from the environment.
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    resolve_config_path_with(env_var_non_empty_os)
}

fn resolve_config_path_with(lookup: impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
    if let Some(explicit) = lookup(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(explicit));
    }
    if let Some(xdg_config_home) = lookup("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("ragflow-client")
                .join("config.toml"),
        );
    }

    let home = lookup("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("ragflow-client")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = std::env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL_CONFIG: &str = r#"
[servers.global]
address = "http://127.0.0.1:9380"
api_key = "ragflow-global"

[servers.keyA]
address = "https://kb.example.com/ragflow"
api_key = "ragflow-a"
timeout_ms = 5000

[servers.keyA.codec]
max_in_memory_size = 1048576

[datasets.handbook]
dataset_id = "b2a62730759d11ef987d0242ac120004"

[download]
relay_capacity = 4096
close_timeout_ms = 2000
"#;

    #[test]
    fn test_parse_full_config() {
        let props = ClientProperties::from_toml_str(FULL_CONFIG).unwrap();
        let a = props.resolve_server("keyA").unwrap();
        assert_eq!(a.timeout_ms, 5000);
        assert_eq!(a.codec.effective_max_in_memory_size(), 1_048_576);
        assert_eq!(props.download.relay_capacity, 4096);
        assert_eq!(props.download.close_timeout(), Duration::from_millis(2000));
        assert_eq!(
            props.resolve_dataset("handbook"),
            Some("b2a62730759d11ef987d0242ac120004")
        );
    }

    #[test]
    fn test_defaults_apply_when_omitted() {
        let props = ClientProperties::from_toml_str(
            "[servers.global]\naddress = \"http://localhost:9380\"\napi_key = \"k\"\n",
        )
        .unwrap();
        let server = props.resolve_server("global").unwrap();
        assert_eq!(server.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(
            server.codec.effective_max_in_memory_size(),
            DEFAULT_MAX_IN_MEMORY_SIZE
        );
        assert_eq!(props.download, DownloadSettings::default());
    }

    #[test]
    fn test_non_positive_max_in_memory_size_uses_default() {
        let codec = CodecConfig {
            max_in_memory_size: -5,
        };
        assert_eq!(
            codec.effective_max_in_memory_size(),
            DEFAULT_MAX_IN_MEMORY_SIZE
        );
    }

    #[test]
    fn test_blank_deploy_key_resolves_global() {
        let props = ClientProperties::from_toml_str(FULL_CONFIG).unwrap();
        let server = props.resolve_server("   ").unwrap();
        assert_eq!(server.api_key, "ragflow-global");
    }

    #[test]
    fn test_unknown_deploy_key_is_error() {
        let props = ClientProperties::from_toml_str(FULL_CONFIG).unwrap();
        let err = props.resolve_server("keyZ").unwrap_err();
        assert!(matches!(err, ClientError::UnknownDeployKey { ref deploy_key } if deploy_key == "keyZ"));
    }

    #[test]
    fn test_validate_rejects_empty_servers() {
        let err = ClientProperties::from_toml_str("").unwrap_err();
        assert!(matches!(err, ConfigError::NoServers));
    }

    #[test]
    fn test_validate_rejects_blank_api_key() {
        let props =
            ClientProperties::new().with_server("global", ServerConfig::new("http://h", " "));
        let err = props.validate().unwrap_err();
        assert!(err.to_string().contains("servers.global.api_key"));
    }

    #[test]
    fn test_validate_rejects_non_http_address() {
        let props =
            ClientProperties::new().with_server("global", ServerConfig::new("ftp://h", "k"));
        let err = props.validate().unwrap_err();
        assert!(err.to_string().contains("servers.global.address"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let props = ClientProperties::new().with_server(
            "global",
            ServerConfig::new("http://h", "k").with_timeout_ms(0),
        );
        let err = props.validate().unwrap_err();
        assert!(err.to_string().contains("Expected range: 1..=3600000"));
    }

    #[test]
    fn test_validate_rejects_tiny_relay_capacity() {
        let props = ClientProperties::new()
            .with_server("global", ServerConfig::new("http://h", "k"))
            .with_download(DownloadSettings {
                relay_capacity: 16,
                close_timeout_ms: 1000,
            });
        let err = props.validate().unwrap_err();
        assert!(err.to_string().contains("download.relay_capacity"));
    }

    #[test]
    fn test_parse_error_reports_origin() {
        let err = ClientProperties::from_toml_str("[servers.global\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("<string>"));
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL_CONFIG.as_bytes()).unwrap();
        let props = ClientProperties::from_path(file.path()).unwrap();
        assert_eq!(props.servers.len(), 2);
    }

    #[test]
    fn test_from_path_missing_file_is_read_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = ClientProperties::from_path(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let server = ServerConfig::new("http://h", "super-secret");
        let rendered = format!("{server:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_config_path_prefers_explicit_env() {
        let path = resolve_config_path_with(|name| match name {
            CONFIG_PATH_ENV => Some(OsString::from("/etc/ragflow.toml")),
            "HOME" => Some(OsString::from("/home/u")),
            _ => None,
        });
        assert_eq!(path, Some(PathBuf::from("/etc/ragflow.toml")));
    }

    #[test]
    fn test_config_path_uses_xdg_then_home() {
        let xdg = resolve_config_path_with(|name| match name {
            "XDG_CONFIG_HOME" => Some(OsString::from("/xdg")),
            "HOME" => Some(OsString::from("/home/u")),
            _ => None,
        });
        assert_eq!(xdg, Some(PathBuf::from("/xdg/ragflow-client/config.toml")));

        let home = resolve_config_path_with(|name| match name {
            "HOME" => Some(OsString::from("/home/u")),
            _ => None,
        });
        assert_eq!(
            home,
            Some(PathBuf::from("/home/u/.config/ragflow-client/config.toml"))
        );

        assert_eq!(resolve_config_path_with(|_| None), None);
    }
}
