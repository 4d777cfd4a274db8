//! Document payloads and response models.

use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;
use super::parser_config::ParserConfig;
use crate::api::ChunkMethod;
use crate::error::ClientError;

const PARSING_DONE: &str = "DONE";
const PARSING_DONE_STATUS: &str = "3";
const PARSING_CANCELLED: &str = "CANCEL";
const PARSING_CANCELLED_STATUS: &str = "2";

/// A document as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub id: String,
    pub name: String,
    /// Owning dataset.
    pub dataset_id: Option<String>,
    pub chunk_method: Option<String>,
    pub chunk_count: Option<u64>,
    pub token_count: Option<u64>,
    pub size: Option<u64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub location: Option<String>,
    pub source_type: Option<String>,
    pub thumbnail: Option<String>,
    /// Parsing state, e.g. `UNSTART`, `RUNNING`, `DONE`.
    pub run: Option<String>,
    pub progress: Option<f64>,
    #[serde(rename = "progress_msg")]
    pub progress_message: Option<String>,
    pub process_begin_at: Option<String>,
    pub process_duration: Option<f64>,
    pub status: Option<String>,
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

impl Document {
    /// Whether parsing has finished.
    #[must_use]
    pub fn is_parse_done(&self) -> bool {
        self.run.as_deref().is_some_and(is_done_state)
    }
}

/// One page of a document listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentPage {
    pub docs: Vec<Document>,
    pub total: u64,
}

/// A file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    /// File name reported to the service.
    pub file_name: String,
    pub content: Bytes,
}

impl DocumentUpload {
    /// Wraps in-memory content.
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Reads a local file; the file name is the path's last component.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] when the path has no file name
    /// or cannot be read.
    pub fn from_path(path: &Path) -> Result<Self, ClientError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ClientError::invalid_argument(format!("'{}' has no file name", path.display()))
            })?
            .to_string();
        let content = std::fs::read(path).map_err(|e| {
            ClientError::invalid_argument(format!("cannot read '{}': {e}", path.display()))
        })?;
        Ok(Self::new(file_name, content))
    }
}

/// Body of an update-document request; unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateDocumentPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "meta_fields", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_method: Option<ChunkMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser_config: Option<ParserConfig>,
}

impl UpdateDocumentPayload {
    /// Checks the payload before it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] for a name outside 1..=255
    /// characters, a dataset-only chunk method, or an invalid parser config.
    pub fn validate(&self) -> Result<(), ClientError> {
        if let Some(name) = &self.name {
            let chars = name.chars().count();
            if !(1..=255).contains(&chars) {
                return Err(ClientError::invalid_argument(
                    "document name length must be between 1 and 255 characters",
                ));
            }
        }
        if let Some(method) = self.chunk_method
            && !method.applies_to_documents()
        {
            return Err(ClientError::invalid_argument(format!(
                "chunk method '{method}' cannot be set on a document"
            )));
        }
        if let Some(parser_config) = &self.parser_config {
            parser_config.validate()?;
        }
        Ok(())
    }
}

/// Body of a delete-documents request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteDocumentsPayload {
    pub ids: Vec<String>,
}

/// Body of parse and stop-parsing requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentIdsPayload {
    pub document_ids: Vec<String>,
}

/// Parsing state of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsingStatus {
    pub document_id: String,
    /// Raw `run` value reported by the service.
    pub status: Option<String>,
}

impl ParsingStatus {
    /// `DONE` (any case) or `3`.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status.as_deref().is_some_and(is_done_state)
    }

    /// `CANCEL` (any case) or `2`.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref().is_some_and(|run| {
            run.eq_ignore_ascii_case(PARSING_CANCELLED) || run == PARSING_CANCELLED_STATUS
        })
    }
}

fn is_done_state(run: &str) -> bool {
    run.eq_ignore_ascii_case(PARSING_DONE) || run == PARSING_DONE_STATUS
}
