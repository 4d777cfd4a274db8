//! Async dataset and document clients.
//!
//! Both clients are cheap to clone and share one [`ClientContext`]: the
//! validated configuration, the per-deployment HTTP client cache and the
//! transport used for downloads.
//!
//! Every `dataset_id` argument may also name a `[datasets.<alias>]` entry of
//! the configuration; the alias is replaced by its configured id.
//!
//! # Example
//!
//! ```no_run
//! use ragflow_client::client::DatasetClient;
//! use ragflow_client::config::{ClientProperties, ServerConfig};
//! use ragflow_client::query::PageQuery;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let properties = ClientProperties::new()
//!     .with_server("global", ServerConfig::new("http://127.0.0.1:9380", "ragflow-key"));
//! let datasets = DatasetClient::new(properties)?;
//! for dataset in datasets.list_datasets("global", &PageQuery::new().page_size(10)).await? {
//!     println!("{} {}", dataset.id, dataset.name);
//! }
//! # Ok(())
//! # }
//! ```

mod dataset;
mod document;

use std::fmt;
use std::io;
use std::sync::Arc;

pub use dataset::DatasetClient;
pub use document::DocumentClient;

use crate::config::ClientProperties;
use crate::download::{BridgeSettings, Executor};
use crate::error::ClientError;
use crate::transport::{DownloadTransport, HttpTransport};

/// State shared by the dataset and document clients.
#[derive(Clone)]
pub struct ClientContext {
    properties: Arc<ClientProperties>,
    http: HttpTransport,
    download_transport: Arc<dyn DownloadTransport>,
    executor: Option<Executor>,
    bridge: BridgeSettings,
}

impl ClientContext {
    /// Validates `properties` and builds the HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the configuration is invalid.
    pub fn new(properties: ClientProperties) -> Result<Self, ClientError> {
        properties.validate()?;
        let bridge = BridgeSettings::from(&properties.download);
        let properties = Arc::new(properties);
        let http = HttpTransport::new(Arc::clone(&properties));
        Ok(Self {
            download_transport: Arc::new(http.clone()),
            properties,
            http,
            executor: None,
            bridge,
        })
    }

    /// Replaces the transport that issues download requests.
    #[must_use]
    pub fn with_download_transport(mut self, transport: Arc<dyn DownloadTransport>) -> Self {
        self.download_transport = transport;
        self
    }

    /// Runtime that drives download bodies consumed from blocking code.
    ///
    /// Without one, downloads capture the runtime they were requested on.
    #[must_use]
    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = Some(executor);
        self
    }

    #[must_use]
    pub fn properties(&self) -> &ClientProperties {
        &self.properties
    }

    /// Remote id for `dataset`: the configured alias target, or `dataset`
    /// itself when no alias matches.
    pub(crate) fn dataset_id<'a>(&'a self, dataset: &'a str) -> &'a str {
        self.properties.resolve_dataset(dataset).unwrap_or(dataset)
    }

    pub(crate) fn http(&self) -> &HttpTransport {
        &self.http
    }

    pub(crate) fn download_transport(&self) -> &dyn DownloadTransport {
        self.download_transport.as_ref()
    }

    pub(crate) fn bridge_settings(&self) -> BridgeSettings {
        self.bridge
    }

    pub(crate) fn executor(&self) -> Result<Executor, ClientError> {
        self.executor
            .clone()
            .or_else(Executor::current)
            .ok_or_else(|| ClientError::Runtime {
                source: io::Error::other("no tokio runtime available to drive the download body"),
            })
    }
}

impl fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientContext")
            .field("properties", &self.properties)
            .field("executor", &self.executor)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

/// Rejects a blank identifier argument.
pub(crate) fn require_id(field: &str, value: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        return Err(ClientError::invalid_argument(format!("{field} must not be blank")));
    }
    Ok(())
}

/// Rejects an empty or blank-containing id list.
pub(crate) fn require_ids(field: &str, ids: &[String]) -> Result<(), ClientError> {
    if ids.is_empty() {
        return Err(ClientError::invalid_argument(format!("{field} must not be empty")));
    }
    if ids.iter().any(|id| id.trim().is_empty()) {
        return Err(ClientError::invalid_argument(format!(
            "{field} must not contain blank ids"
        )));
    }
    Ok(())
}
