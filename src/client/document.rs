//! Document management and downloads.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{ClientContext, require_id, require_ids};
use crate::api::ApiRoute;
use crate::config::ClientProperties;
use crate::download::{Classification, DownloadHandle, ResponseClassifier};
use crate::error::ClientError;
use crate::model::{
    DeleteDocumentsPayload, Document, DocumentIdsPayload, DocumentPage, DocumentUpload,
    ParsingStatus, UpdateDocumentPayload,
};
use crate::query::DocumentQuery;
use crate::transport::{ApiRequest, QueryParams};

/// Uploads, lists, parses and downloads documents of a dataset.
#[derive(Debug, Clone)]
pub struct DocumentClient {
    context: Arc<ClientContext>,
}

impl DocumentClient {
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when `properties` is invalid.
    pub fn new(properties: ClientProperties) -> Result<Self, ClientError> {
        Ok(Self::from_context(Arc::new(ClientContext::new(properties)?)))
    }

    #[must_use]
    pub fn from_context(context: Arc<ClientContext>) -> Self {
        Self { context }
    }

    #[must_use]
    pub fn context(&self) -> &Arc<ClientContext> {
        &self.context
    }

    /// Uploads files as one multipart request with a `file` part per upload.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for a blank dataset id or an empty
    /// upload list; no request is sent in either case.
    #[instrument(skip(self, uploads), fields(files = uploads.len()))]
    pub async fn upload_documents(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        uploads: Vec<DocumentUpload>,
    ) -> Result<Vec<Document>, ClientError> {
        let dataset_id = self.context.dataset_id(dataset_id);
        require_id("dataset_id", dataset_id)?;
        if uploads.is_empty() {
            return Err(ClientError::invalid_argument("no documents to upload"));
        }
        let params = [("dataset_id", dataset_id)];
        let request = ApiRequest::new(deploy_key, ApiRoute::UploadDocuments)
            .path(&params)
            .multipart(uploads);
        let documents = self
            .context
            .http()
            .execute::<Vec<Document>>(request)
            .await?
            .unwrap_or_default();
        info!(uploaded = documents.len(), "documents uploaded");
        Ok(documents)
    }

    /// Updates the fields set in `payload`.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for blank ids or an invalid payload.
    #[instrument(skip(self, payload))]
    pub async fn update_document(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        document_id: &str,
        payload: &UpdateDocumentPayload,
    ) -> Result<(), ClientError> {
        let dataset_id = self.context.dataset_id(dataset_id);
        require_id("dataset_id", dataset_id)?;
        require_id("document_id", document_id)?;
        payload.validate()?;
        let params = [("dataset_id", dataset_id), ("document_id", document_id)];
        let request = ApiRequest::new(deploy_key, ApiRoute::UpdateDocument)
            .path(&params)
            .json(payload)?;
        self.context.http().execute::<Value>(request).await?;
        Ok(())
    }

    /// Requests a document and classifies the response into a handle.
    ///
    /// A refusal by the service is not an error: it yields
    /// [`DownloadHandle::Failed`] carrying the service's code and message.
    /// `filename` names the payload when given and non-blank, otherwise the
    /// document id does.
    ///
    /// The body of a streaming handle is driven by the context's executor, or
    /// by the runtime this call runs on.
    ///
    /// # Errors
    ///
    /// - [`ClientError::UnknownDeployKey`] before any network call
    /// - [`ClientError::InvalidArgument`] for blank ids
    /// - [`ClientError::Transport`] / [`ClientError::Timeout`] when no
    ///   response arrives
    /// - [`ClientError::Runtime`] when no runtime can drive the body
    #[instrument(skip(self, filename))]
    pub async fn download_document(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        document_id: &str,
        filename: Option<&str>,
    ) -> Result<DownloadHandle, ClientError> {
        let server = self.context.properties().resolve_server(deploy_key)?;
        let classifier = ResponseClassifier::new(server.codec.effective_max_in_memory_size());
        let executor = self.context.executor()?;

        let dataset_id = self.context.dataset_id(dataset_id);
        let params = [("dataset_id", dataset_id), ("document_id", document_id)];
        let response = self
            .context
            .download_transport()
            .issue_download_request(deploy_key, ApiRoute::DownloadDocument, &params)
            .await?;

        match classifier.classify(response, document_id, filename).await {
            Classification::Failed(metadata) => {
                debug!(
                    code = metadata.code(),
                    message = metadata.message(),
                    "download refused"
                );
                Ok(DownloadHandle::failed(metadata))
            }
            Classification::Streaming(metadata, body) => {
                debug!(
                    filename = metadata.filename().unwrap_or_default(),
                    content_type = metadata.content_type().unwrap_or_default(),
                    "download streaming"
                );
                Ok(DownloadHandle::streaming(
                    metadata,
                    body,
                    executor,
                    self.context.bridge_settings(),
                ))
            }
        }
    }

    /// Lists one page of documents.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for a blank dataset id, otherwise
    /// transport and envelope errors.
    #[instrument(skip(self, query))]
    pub async fn list_documents(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        query: &DocumentQuery,
    ) -> Result<DocumentPage, ClientError> {
        let dataset_id = self.context.dataset_id(dataset_id);
        require_id("dataset_id", dataset_id)?;
        let params = [("dataset_id", dataset_id)];
        let request = ApiRequest::new(deploy_key, ApiRoute::ListDocuments)
            .path(&params)
            .query(QueryParams::Documents(query));
        Ok(self
            .context
            .http()
            .execute::<DocumentPage>(request)
            .await?
            .unwrap_or_default())
    }

    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for a blank dataset id or an empty id
    /// list.
    #[instrument(skip(self, document_ids), fields(count = document_ids.len()))]
    pub async fn delete_documents(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        document_ids: &[String],
    ) -> Result<(), ClientError> {
        let dataset_id = self.context.dataset_id(dataset_id);
        require_id("dataset_id", dataset_id)?;
        require_ids("document_ids", document_ids)?;
        let params = [("dataset_id", dataset_id)];
        let payload = DeleteDocumentsPayload {
            ids: document_ids.to_vec(),
        };
        let request = ApiRequest::new(deploy_key, ApiRoute::DeleteDocuments)
            .path(&params)
            .json(&payload)?;
        self.context.http().execute::<Value>(request).await?;
        Ok(())
    }

    /// Starts chunking the listed documents.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for a blank dataset id or an empty id
    /// list.
    #[instrument(skip(self, document_ids), fields(count = document_ids.len()))]
    pub async fn parse_documents(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        document_ids: &[String],
    ) -> Result<(), ClientError> {
        self.send_document_ids(deploy_key, ApiRoute::ParseDocuments, dataset_id, document_ids)
            .await
    }

    /// Stops chunking the listed documents.
    ///
    /// # Errors
    ///
    /// Same as [`parse_documents`](Self::parse_documents).
    #[instrument(skip(self, document_ids), fields(count = document_ids.len()))]
    pub async fn stop_parsing_documents(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        document_ids: &[String],
    ) -> Result<(), ClientError> {
        self.send_document_ids(
            deploy_key,
            ApiRoute::StopParsingDocuments,
            dataset_id,
            document_ids,
        )
        .await
    }

    async fn send_document_ids(
        &self,
        deploy_key: &str,
        route: ApiRoute,
        dataset_id: &str,
        document_ids: &[String],
    ) -> Result<(), ClientError> {
        let dataset_id = self.context.dataset_id(dataset_id);
        require_id("dataset_id", dataset_id)?;
        require_ids("document_ids", document_ids)?;
        let params = [("dataset_id", dataset_id)];
        let payload = DocumentIdsPayload {
            document_ids: document_ids.to_vec(),
        };
        let request = ApiRequest::new(deploy_key, route)
            .path(&params)
            .json(&payload)?;
        self.context.http().execute::<Value>(request).await?;
        Ok(())
    }

    /// Reports the parsing state of one document.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidArgument`] for blank ids
    /// - [`ClientError::DocumentNotFound`] when the listing is empty
    #[instrument(skip(self))]
    pub async fn parsing_status(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        document_id: &str,
    ) -> Result<ParsingStatus, ClientError> {
        require_id("document_id", document_id)?;
        let page = self
            .list_documents(deploy_key, dataset_id, &DocumentQuery::by_id(document_id))
            .await?;
        let document = page.docs.into_iter().next().ok_or_else(|| {
            ClientError::document_not_found(self.context.dataset_id(dataset_id), document_id)
        })?;
        Ok(ParsingStatus {
            document_id: document_id.to_string(),
            status: document.run,
        })
    }
}
