//! Dataset payloads and response models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;
use super::parser_config::ParserConfig;
use crate::api::{ChunkMethod, Permission};
use crate::error::ClientError;

const MAX_DATASET_NAME_CHARS: usize = 128;

/// Body of a create-dataset request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateDatasetPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    pub permission: Permission,
    pub chunk_method: ChunkMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser_config: Option<ParserConfig>,
}

impl CreateDatasetPayload {
    /// Creates a payload with `me` permission and the `naive` chunk method.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar: None,
            description: None,
            embedding_model: None,
            permission: Permission::default(),
            chunk_method: ChunkMethod::default(),
            parser_config: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    #[must_use]
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    #[must_use]
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    #[must_use]
    pub fn chunk_method(mut self, chunk_method: ChunkMethod) -> Self {
        self.chunk_method = chunk_method;
        self
    }

    #[must_use]
    pub fn parser_config(mut self, parser_config: ParserConfig) -> Self {
        self.parser_config = Some(parser_config);
        self
    }

    /// Checks the payload before it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] for a blank or over-long name,
    /// an over-long embedding model name, or an invalid parser config.
    pub fn validate(&self) -> Result<(), ClientError> {
        validate_name(&self.name)?;
        validate_embedding_model(self.embedding_model.as_deref())?;
        if let Some(parser_config) = &self.parser_config {
            parser_config.validate()?;
        }
        Ok(())
    }
}

/// Body of an update-dataset request; unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateDatasetPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<Permission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_method: Option<ChunkMethod>,
    /// Ranking boost (0..=100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagerank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser_config: Option<ParserConfig>,
}

impl UpdateDatasetPayload {
    /// Checks the payload before it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] for an empty update or an
    /// out-of-range field.
    pub fn validate(&self) -> Result<(), ClientError> {
        if *self == Self::default() {
            return Err(ClientError::invalid_argument(
                "update payload must set at least one field",
            ));
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        validate_embedding_model(self.embedding_model.as_deref())?;
        if let Some(pagerank) = self.pagerank
            && pagerank > 100
        {
            return Err(ClientError::invalid_argument(format!(
                "pagerank must be within 0..=100, got {pagerank}"
            )));
        }
        if let Some(parser_config) = &self.parser_config {
            parser_config.validate()?;
        }
        Ok(())
    }
}

/// Body of a delete-datasets request.
///
/// `ids: None` is sent as `null`, which the service treats as every dataset
/// owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteDatasetsPayload {
    pub ids: Option<Vec<String>>,
}

impl DeleteDatasetsPayload {
    /// Deletes the listed datasets.
    #[must_use]
    pub fn ids(ids: Vec<String>) -> Self {
        Self { ids: Some(ids) }
    }

    /// Deletes every dataset owned by the caller.
    #[must_use]
    pub fn all() -> Self {
        Self { ids: None }
    }
}

/// A dataset as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub description: Option<String>,
    pub chunk_method: Option<String>,
    pub chunk_count: Option<u64>,
    pub document_count: Option<u64>,
    pub token_num: Option<u64>,
    pub embedding_model: Option<String>,
    pub language: Option<String>,
    pub pagerank: Option<u32>,
    pub permission: Option<String>,
    pub similarity_threshold: Option<f64>,
    pub vector_similarity_weight: Option<f64>,
    pub status: Option<String>,
    pub tenant_id: Option<String>,
    pub created_by: Option<String>,
    #[serde(deserialize_with = "lenient::i64_opt")]
    pub create_time: Option<i64>,
    pub create_date: Option<String>,
    #[serde(deserialize_with = "lenient::i64_opt")]
    pub update_time: Option<i64>,
    pub update_date: Option<String>,
    pub parser_config: Option<ParserConfig>,
    /// Fields this client does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Knowledge graph and mind map of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeGraph {
    pub graph: Option<Graph>,
    pub mind_map: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Graph {
    pub directed: Option<bool>,
    pub multigraph: Option<bool>,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub graph: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphNode {
    pub id: String,
    pub entity_name: Option<String>,
    pub entity_type: Option<String>,
    pub description: Option<String>,
    pub pagerank: Option<f64>,
    pub rank: Option<i64>,
    pub source_id: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub src_id: Option<String>,
    pub tgt_id: Option<String>,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub weight: Option<f64>,
    pub source_id: Vec<String>,
}

fn validate_name(name: &str) -> Result<(), ClientError> {
    if name.trim().is_empty() {
        return Err(ClientError::invalid_argument("name must not be blank"));
    }
    let chars = name.chars().count();
    if chars > MAX_DATASET_NAME_CHARS {
        return Err(ClientError::invalid_argument(format!(
            "name must be at most {MAX_DATASET_NAME_CHARS} characters, got {chars}"
        )));
    }
    Ok(())
}

fn validate_embedding_model(model: Option<&str>) -> Result<(), ClientError> {
    match model {
        Some(model) if model.len() > 255 => Err(ClientError::invalid_argument(
            "embedding_model must be at most 255 bytes",
        )),
        _ => Ok(()),
    }
}
