//! Dataset management.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use super::{ClientContext, require_id, require_ids};
use crate::api::ApiRoute;
use crate::config::ClientProperties;
use crate::error::ClientError;
use crate::model::{
    CreateDatasetPayload, Dataset, DeleteDatasetsPayload, KnowledgeGraph, UpdateDatasetPayload,
};
use crate::query::PageQuery;
use crate::transport::{ApiRequest, QueryParams};

/// Creates, lists, updates and deletes datasets.
#[derive(Debug, Clone)]
pub struct DatasetClient {
    context: Arc<ClientContext>,
}

impl DatasetClient {
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

    /// Creates a dataset.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for an invalid payload (no request is
    /// sent), otherwise the errors of the transport and envelope decoding.
    #[instrument(skip(self, payload), fields(name = %payload.name))]
    pub async fn create_dataset(
        &self,
        deploy_key: &str,
        payload: &CreateDatasetPayload,
    ) -> Result<Dataset, ClientError> {
        payload.validate()?;
        let route = ApiRoute::CreateDataset;
        let request = ApiRequest::new(deploy_key, route).json(payload)?;
        let dataset: Dataset = self
            .context
            .http()
            .execute(request)
            .await?
            .ok_or(ClientError::MissingData { route })?;
        info!(dataset_id = %dataset.id, "dataset created");
        Ok(dataset)
    }

    /// Deletes the datasets named by `payload`, or all of them for
    /// [`DeleteDatasetsPayload::all`].
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for an empty id list.
    #[instrument(skip(self, payload))]
    pub async fn delete_datasets(
        &self,
        deploy_key: &str,
        payload: &DeleteDatasetsPayload,
    ) -> Result<(), ClientError> {
        if let Some(ids) = &payload.ids {
            require_ids("ids", ids)?;
        }
        let request = ApiRequest::new(deploy_key, ApiRoute::DeleteDatasets).json(payload)?;
        self.context.http().execute::<Value>(request).await?;
        Ok(())
    }

    /// Updates the fields set in `payload`.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for a blank id or an invalid payload.
    #[instrument(skip(self, payload))]
    pub async fn update_dataset(
        &self,
        deploy_key: &str,
        dataset_id: &str,
        payload: &UpdateDatasetPayload,
    ) -> Result<(), ClientError> {
        let dataset_id = self.context.dataset_id(dataset_id);
        require_id("dataset_id", dataset_id)?;
        payload.validate()?;
        let params = [("dataset_id", dataset_id)];
        let request = ApiRequest::new(deploy_key, ApiRoute::UpdateDataset)
            .path(&params)
            .json(payload)?;
        self.context.http().execute::<Value>(request).await?;
        Ok(())
    }

    /// Lists datasets; an absent `data` field is an empty page.
    ///
    /// # Errors
    ///
    /// Transport and envelope errors.
    #[instrument(skip(self, query))]
    pub async fn list_datasets(
        &self,
        deploy_key: &str,
        query: &PageQuery,
    ) -> Result<Vec<Dataset>, ClientError> {
        let request =
            ApiRequest::new(deploy_key, ApiRoute::ListDatasets).query(QueryParams::Page(query));
        Ok(self
            .context
            .http()
            .execute::<Vec<Dataset>>(request)
            .await?
            .unwrap_or_default())
    }

    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for a blank id, otherwise transport
    /// and envelope errors.
    #[instrument(skip(self))]
    pub async fn get_knowledge_graph(
        &self,
        deploy_key: &str,
        dataset_id: &str,
    ) -> Result<KnowledgeGraph, ClientError> {
        let dataset_id = self.context.dataset_id(dataset_id);
        require_id("dataset_id", dataset_id)?;
        let params = [("dataset_id", dataset_id)];
        let request = ApiRequest::new(deploy_key, ApiRoute::GetKnowledgeGraph).path(&params);
        Ok(self
            .context
            .http()
            .execute::<KnowledgeGraph>(request)
            .await?
            .unwrap_or_default())
    }

    /// Returns the service's `data` flag; `false` when absent.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for a blank id, otherwise transport
    /// and envelope errors.
    #[instrument(skip(self))]
    pub async fn delete_knowledge_graph(
        &self,
        deploy_key: &str,
        dataset_id: &str,
    ) -> Result<bool, ClientError> {
        let dataset_id = self.context.dataset_id(dataset_id);
        require_id("dataset_id", dataset_id)?;
        let params = [("dataset_id", dataset_id)];
        let request = ApiRequest::new(deploy_key, ApiRoute::DeleteKnowledgeGraph).path(&params);
        Ok(self
            .context
            .http()
            .execute::<bool>(request)
            .await?
            .unwrap_or(false))
    }
}
