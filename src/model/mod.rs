//! Request payloads and response models for the dataset and document APIs.
//!
//! Response models are tolerant: unknown fields are kept in an `extra` map and
//! numeric timestamps may arrive as numbers or digit strings.

mod dataset;
mod document;
mod parser_config;

pub use dataset::{
    CreateDatasetPayload, Dataset, DeleteDatasetsPayload, Graph, GraphEdge, GraphNode,
    KnowledgeGraph, UpdateDatasetPayload,
};
pub use document::{
    DeleteDocumentsPayload, Document, DocumentIdsPayload, DocumentPage, DocumentUpload,
    ParsingStatus, UpdateDocumentPayload,
};
pub use parser_config::{GraphRag, ParserConfig, Raptor};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::api::ErrorCode;

/// Envelope wrapping every non-download response: `{code, message?, data?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Business code; `0` on success.
    #[serde(deserialize_with = "lenient::i64_required")]
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Whether the envelope reports success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        ErrorCode::is_ok(self.code)
    }
}

/// Parses a JSON value as an integer code.
///
/// Accepts integers and strings matching `-?\d+`; anything else yields `None`.
#[must_use]
pub fn parse_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            let digits = s.strip_prefix('-').unwrap_or(s);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            s.parse().ok()
        }
        _ => None,
    }
}

pub(crate) mod lenient {
    use super::{Deserialize, Deserializer, Value, parse_code};

    pub(crate) fn i64_required<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        parse_code(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("expected integer code, got {value}")))
    }

    pub(crate) fn i64_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(parse_code))
    }
}
