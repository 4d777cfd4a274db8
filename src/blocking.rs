//! Blocking facade over the async clients.
//!
//! Each facade owns (a share of) a dedicated multi-thread tokio runtime and
//! drives the async client with `block_on`. Download handles obtained here
//! keep that runtime alive until they are dropped.
//!
//! Do not call these methods from inside an async execution context; use the
//! [`client`](crate::client) module there instead.

use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::client::{self, ClientContext};
use crate::config::ClientProperties;
use crate::constants::BLOCKING_RUNTIME_WORKERS;
use crate::download::{DownloadHandle, Executor};
use crate::error::ClientError;
use crate::model::{
    CreateDatasetPayload, Dataset, DeleteDatasetsPayload, Document, DocumentPage, DocumentUpload,
    KnowledgeGraph, ParsingStatus, UpdateDatasetPayload, UpdateDocumentPayload,
};
use crate::query::{DocumentQuery, PageQuery};

const RUNTIME_THREAD_NAME: &str = "ragflow-client-io";

#[derive(Debug, Clone)]
struct Shared {
    context: Arc<ClientContext>,
    runtime: Arc<Runtime>,
}

impl Shared {
    fn new(context: ClientContext) -> Result<Self, ClientError> {
        let runtime = Arc::new(
            Builder::new_multi_thread()
                .worker_threads(BLOCKING_RUNTIME_WORKERS)
                .thread_name(RUNTIME_THREAD_NAME)
                .enable_all()
                .build()
                .map_err(|source| ClientError::Runtime { source })?,
        );
        let context = context.with_executor(Executor::owned(Arc::clone(&runtime)));
        Ok(Self {
            context: Arc::new(context),
            runtime,
        })
    }
}

/// Blocking [`client::DatasetClient`].
#[derive(Debug, Clone)]
pub struct DatasetClient {
    inner: client::DatasetClient,
    shared: Shared,
}

impl DatasetClient {
    /// Validates `properties` and starts a dedicated runtime.
    ///
    /// # Errors
    ///
    /// [`ClientError::Config`] for invalid properties, [`ClientError::Runtime`]
    /// when the runtime cannot start.
    pub fn new(properties: ClientProperties) -> Result<Self, ClientError> {
        Self::with_context(ClientContext::new(properties)?)
    }

    /// # Errors
    ///
    /// [`ClientError::Runtime`] when the runtime cannot start.
    pub fn with_context(context: ClientContext) -> Result<Self, ClientError> {
        Ok(Self::from_shared(Shared::new(context)?))
    }

    fn from_shared(shared: Shared) -> Self {
        Self {
            inner: client::DatasetClient::from_context(Arc::clone(&shared.context)),
            shared,
        }
    }

    /// Document client sharing this client's runtime and connections.
    #[must_use]
    pub fn document_client(&self) -> DocumentClient {
        DocumentClient::from_shared(self.shared.clone())
    }

    /// See [`client::DatasetClient::create_dataset`].
    ///
    /// # Errors
    ///
    /// As the async client.
    pub fn create_dataset(
        &self,
        deploy_key: &str,
        payload: &CreateDatasetPayload,
    ) -> Result<Dataset, ClientError> {
        self.shared
            .runtime
            .block_on(self.inner.create_dataset(deploy_key, payload))
    }

    /// See [`client::DatasetClient::delete_datasets`].
    ///
    /// # Errors
    ///
    /// As the async client.
    pub fn delete_datasets(
        &self,
        deploy_key: &str,
        payload: &DeleteDatasetsPayload,
    ) -> Result<(), ClientError> {
        self.shared
            .runtime
            .block_on(self.inner.delete_datasets(deploy_key, payload))
    }

    /// See [`client::DatasetClient::update_dataset`].
    ///
    /// # Errors
    ///
    /// As the async client.
    pub fn update_dataset(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        payload: &UpdateDatasetPayload,
    ) -> Result<(), ClientError> {
        self.shared
            .runtime
            .block_on(self.inner.update_dataset(deploy_key, dataset_id, payload))
    }

    /// See [`client::DatasetClient::list_datasets`].
    ///
    /// # Errors
    ///
    /// As the async client.
    pub fn list_datasets(
        &self,
        deploy_key: &str,
        query: &PageQuery,
    ) -> Result<Vec<Dataset>, ClientError> {
        self.shared
            .runtime
            .block_on(self.inner.list_datasets(deploy_key, query))
    }

    /// See [`client::DatasetClient::get_knowledge_graph`].
    ///
    /// # Errors
    ///
    /// As the async client.
    pub fn get_knowledge_graph(
        &self,
        deploy_key: &str,
        dataset_id: &str,
    ) -> Result<KnowledgeGraph, ClientError> {
        self.shared
            .runtime
            .block_on(self.inner.get_knowledge_graph(deploy_key, dataset_id))
    }

    /// See [`client::DatasetClient::delete_knowledge_graph`].
    ///
    /// # Errors
    ///
    /// As the async client.
    pub fn delete_knowledge_graph(
        &self,
        deploy_key: &str,
        dataset_id: &str,
    ) -> Result<bool, ClientError> {
        self.shared
            .runtime
            .block_on(self.inner.delete_knowledge_graph(deploy_key, dataset_id))
    }
}

/// Blocking [`client::DocumentClient`].
///
/// # Example
///
/// ```no_run
/// use ragflow_client::blocking::DocumentClient;
/// use ragflow_client::config::{ClientProperties, ServerConfig};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let properties = ClientProperties::new()
///     .with_server("keyA", ServerConfig::new("http://127.0.0.1:9380", "ragflow-key"));
/// let client = DocumentClient::new(properties)?;
/// let handle = client.download_document("keyA", "ds1", "doc1", Some("report.pdf"))?;
/// let bytes = handle.read_all_bytes()?;
/// println!("{} bytes", bytes.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DocumentClient {
    inner: client::DocumentClient,
    shared: Shared,
}

impl DocumentClient {
    /// Validates `properties` and starts a dedicated runtime.
    ///
    /// # Errors
    ///
    /// [`ClientError::Config`] for invalid properties, [`ClientError::Runtime`]
    /// when the runtime cannot start.
    pub fn new(properties: ClientProperties) -> Result<Self, ClientError> {
        Self::with_context(ClientContext::new(properties)?)
    }

    /// Uses `context`, e.g. one with a custom download transport.
    ///
    /// # Errors
    ///
    /// [`ClientError::Runtime`] when the runtime cannot start.
    pub fn with_context(context: ClientContext) -> Result<Self, ClientError> {
        Ok(Self::from_shared(Shared::new(context)?))
    }

    fn from_shared(shared: Shared) -> Self {
        Self {
            inner: client::DocumentClient::from_context(Arc::clone(&shared.context)),
            shared,
        }
    }

    /// Dataset client sharing this client's runtime and connections.
    #[must_use]
    pub fn dataset_client(&self) -> DatasetClient {
        DatasetClient::from_shared(self.shared.clone())
    }

    /// See [`client::DocumentClient::upload_documents`].
    ///
    /// # Errors
    ///
    /// As the async client.
    pub fn upload_documents(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        uploads: Vec<DocumentUpload>,
    ) -> Result<Vec<Document>, ClientError> {
        self.shared
            .runtime
            .block_on(self.inner.upload_documents(deploy_key, dataset_id, uploads))
    }

    /// See [`client::DocumentClient::update_document`].
    ///
    /// # Errors
    ///
    /// As the async client.
    pub fn update_document(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        document_id: &str,
        payload: &UpdateDocumentPayload,
    ) -> Result<(), ClientError> {
        self.shared.runtime.block_on(self.inner.update_document(
            deploy_key,
            dataset_id,
            document_id,
            payload,
        ))
    }

    /// Requests a document; see [`client::DocumentClient::download_document`].
    ///
    /// The returned handle is consumed with blocking calls on this runtime.
    ///
    /// # Errors
    ///
    /// As the async client.
    pub fn download_document(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        document_id: &str,
        filename: Option<&str>,
    ) -> Result<DownloadHandle, ClientError> {
        self.shared.runtime.block_on(self.inner.download_document(
            deploy_key,
            dataset_id,
            document_id,
            filename,
        ))
    }

    /// See [`client::DocumentClient::list_documents`].
    ///
    /// # Errors
    ///
    /// As the async client.
    pub fn list_documents(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        query: &DocumentQuery,
    ) -> Result<DocumentPage, ClientError> {
        self.shared
            .runtime
            .block_on(self.inner.list_documents(deploy_key, dataset_id, query))
    }

    /// See [`client::DocumentClient::delete_documents`].
    ///
    /// # Errors
    ///
    /// As the async client.
    pub fn delete_documents(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        document_ids: &[String],
    ) -> Result<(), ClientError> {
        self.shared
            .runtime
            .block_on(self.inner.delete_documents(deploy_key, dataset_id, document_ids))
    }

    /// See [`client::DocumentClient::parse_documents`].
    ///
    /// # Errors
    ///
    /// As the async client.
    pub fn parse_documents(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        document_ids: &[String],
    ) -> Result<(), ClientError> {
        self.shared
            .runtime
            .block_on(self.inner.parse_documents(deploy_key, dataset_id, document_ids))
    }

    /// See [`client::DocumentClient::stop_parsing_documents`].
    ///
    /// # Errors
    ///
    /// As the async client.
    pub fn stop_parsing_documents(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        document_ids: &[String],
    ) -> Result<(), ClientError> {
        self.shared.runtime.block_on(self.inner.stop_parsing_documents(
            deploy_key,
            dataset_id,
            document_ids,
        ))
    }

    /// See [`client::DocumentClient::parsing_status`].
    ///
    /// # Errors
    ///
    /// As the async client.
    pub fn parsing_status(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        document_id: &str,
    ) -> Result<ParsingStatus, ClientError> {
        self.shared
            .runtime
            .block_on(self.inner.parsing_status(deploy_key, dataset_id, document_id))
    }
}
