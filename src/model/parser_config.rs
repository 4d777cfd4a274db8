//! Chunking parser configuration shared by datasets and documents.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Parser settings applied when the service chunks a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Keywords generated per chunk (0..=32).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_keywords: Option<u32>,
    /// Questions generated per chunk (0..=10).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_questions: Option<u32>,
    /// Target tokens per chunk (1..=2048).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_token_num: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html4excel: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_recognize: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_kb_ids: Option<Vec<String>>,
    /// Pages per parsing task (>= 1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raptor: Option<Raptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphrag: Option<GraphRag>,
}

/// Recursive abstractive summarization settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Raptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_raptor: Option<bool>,
    /// 1..=1024
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cluster: Option<u32>,
    /// 1..=2048
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_token: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    /// 0.0..=1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

/// Knowledge graph extraction settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphRag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_graphrag: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community: Option<bool>,
}

impl ParserConfig {
    /// Checks numeric ranges before the config is sent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] naming the first field out of range.
    pub fn validate(&self) -> Result<(), ClientError> {
        check_range("parser_config.auto_keywords", self.auto_keywords, 0, 32)?;
        check_range("parser_config.auto_questions", self.auto_questions, 0, 10)?;
        check_range("parser_config.chunk_token_num", self.chunk_token_num, 1, 2048)?;
        check_range("parser_config.task_page_size", self.task_page_size, 1, u32::MAX)?;
        if let Some(raptor) = &self.raptor {
            check_range("parser_config.raptor.max_cluster", raptor.max_cluster, 1, 1024)?;
            check_range("parser_config.raptor.max_token", raptor.max_token, 1, 2048)?;
            if let Some(threshold) = raptor.threshold
                && !(0.0..=1.0).contains(&threshold)
            {
                return Err(ClientError::invalid_argument(format!(
                    "parser_config.raptor.threshold must be within 0..=1, got {threshold}"
                )));
            }
        }
        Ok(())
    }
}

fn check_range(field: &str, value: Option<u32>, min: u32, max: u32) -> Result<(), ClientError> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(ClientError::invalid_argument(format!(
            "{field} must be within {min}..={max}, got {v}"
        ))),
        _ => Ok(()),
    }
}
