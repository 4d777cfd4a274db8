//! Service vocabulary: routes, business error codes, chunk methods and permissions.
//!
//! Every remote operation is addressed through an [`ApiRoute`], which knows its
//! HTTP method and path template. Path templates use `{name}` placeholders that
//! [`ApiRoute::resolve_url`] substitutes (percent-encoded) against a deployment's
//! base address.

use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ClientError;

/// Remote endpoints used by the dataset and document clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiRoute {
    CreateDataset,
    DeleteDatasets,
    UpdateDataset,
    ListDatasets,
    GetKnowledgeGraph,
    DeleteKnowledgeGraph,
    UploadDocuments,
    UpdateDocument,
    DownloadDocument,
    ListDocuments,
    DeleteDocuments,
    ParseDocuments,
    StopParsingDocuments,
}

impl ApiRoute {
    /// Path template, relative to the deployment address.
    #[must_use]
    pub const fn template(self) -> &'static str {
        match self {
            Self::CreateDataset | Self::DeleteDatasets | Self::ListDatasets => "/api/v1/datasets",
            Self::UpdateDataset => "/api/v1/datasets/{dataset_id}",
            Self::GetKnowledgeGraph | Self::DeleteKnowledgeGraph => {
                "/api/v1/datasets/{dataset_id}/knowledge_graph"
            }
            Self::UploadDocuments | Self::ListDocuments | Self::DeleteDocuments => {
                "/api/v1/datasets/{dataset_id}/documents"
            }
            Self::UpdateDocument | Self::DownloadDocument => {
                "/api/v1/datasets/{dataset_id}/documents/{document_id}"
            }
            Self::ParseDocuments | Self::StopParsingDocuments => {
                "/api/v1/datasets/{dataset_id}/chunks"
            }
        }
    }

    /// HTTP method the service expects for this route.
    #[must_use]
    pub fn method(self) -> Method {
        match self {
            Self::CreateDataset | Self::UploadDocuments | Self::ParseDocuments => Method::POST,
            Self::DeleteDatasets
            | Self::DeleteKnowledgeGraph
            | Self::DeleteDocuments
            | Self::StopParsingDocuments => Method::DELETE,
            Self::UpdateDataset | Self::UpdateDocument => Method::PUT,
            Self::ListDatasets
            | Self::GetKnowledgeGraph
            | Self::DownloadDocument
            | Self::ListDocuments => Method::GET,
        }
    }

    /// Joins this route onto `base`, substituting `{name}` placeholders from `params`.
    ///
    /// Any path already present on `base` is kept as a prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] when a placeholder has no
    /// matching parameter, when a parameter is blank, or when `base` cannot
    /// carry a path (e.g. `mailto:` URLs).
    pub fn resolve_url(self, base: &Url, params: &[(&str, &str)]) -> Result<Url, ClientError> {
        let mut url = base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                ClientError::invalid_argument(format!("address '{base}' cannot be a base URL"))
            })?;
            segments.pop_if_empty();
            for segment in self.template().split('/').filter(|s| !s.is_empty()) {
                match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Some(name) => {
                        let value = params
                            .iter()
                            .find(|(key, _)| *key == name)
                            .map(|(_, value)| value.trim())
                            .filter(|value| !value.is_empty())
                            .ok_or_else(|| {
                                ClientError::invalid_argument(format!(
                                    "missing path parameter `{name}` for {self}"
                                ))
                            })?;
                        segments.push(value);
                    }
                    None => {
                        segments.push(segment);
                    }
                }
            }
        }
        Ok(url)
    }
}

impl fmt::Display for ApiRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.template())
    }
}

/// Business codes returned in the `code` field of service responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Ok,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalServerError,
    InvalidChunkId,
    ChunkUpdateFailed,
}

impl ErrorCode {
    const ALL: [Self; 8] = [
        Self::Ok,
        Self::BadRequest,
        Self::Unauthorized,
        Self::Forbidden,
        Self::NotFound,
        Self::InternalServerError,
        Self::InvalidChunkId,
        Self::ChunkUpdateFailed,
    ];

    /// Numeric wire value.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Ok => 0,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::InternalServerError => 500,
            Self::InvalidChunkId => 1001,
            Self::ChunkUpdateFailed => 1002,
        }
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::BadRequest => "Invalid request parameters",
            Self::Unauthorized => "Unauthorized access",
            Self::Forbidden => "Access denied",
            Self::NotFound => "Resource not found",
            Self::InternalServerError => "Server internal error",
            Self::InvalidChunkId => "Invalid Chunk ID",
            Self::ChunkUpdateFailed => "Chunk update failed",
        }
    }

    /// Looks up a known code; unknown service codes yield `None`.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|known| known.code() == code)
    }

    /// Returns true when `code` is the success code.
    #[must_use]
    pub const fn is_ok(code: i64) -> bool {
        code == Self::Ok.code()
    }
}

/// Chunking strategies understood by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkMethod {
    #[default]
    Naive,
    Book,
    Email,
    Laws,
    Manual,
    One,
    Paper,
    Picture,
    Presentation,
    Qa,
    Table,
    Tag,
}

impl ChunkMethod {
    /// Wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::Book => "book",
            Self::Email => "email",
            Self::Laws => "laws",
            Self::Manual => "manual",
            Self::One => "one",
            Self::Paper => "paper",
            Self::Picture => "picture",
            Self::Presentation => "presentation",
            Self::Qa => "qa",
            Self::Table => "table",
            Self::Tag => "tag",
        }
    }

    /// Whether the method may be set on an individual document.
    ///
    /// `tag` is a dataset-level method only.
    #[must_use]
    pub const fn applies_to_documents(self) -> bool {
        !matches!(self, Self::Tag)
    }
}

impl fmt::Display for ChunkMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkMethod {
    type Err = ClientError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "naive" => Ok(Self::Naive),
            "book" => Ok(Self::Book),
            "email" => Ok(Self::Email),
            "laws" => Ok(Self::Laws),
            "manual" => Ok(Self::Manual),
            "one" => Ok(Self::One),
            "paper" => Ok(Self::Paper),
            "picture" => Ok(Self::Picture),
            "presentation" => Ok(Self::Presentation),
            "qa" => Ok(Self::Qa),
            "table" => Ok(Self::Table),
            "tag" => Ok(Self::Tag),
            other => Err(ClientError::invalid_argument(format!(
                "invalid chunk method '{other}'. Must be one of: naive, book, email, laws, manual, one, paper, picture, presentation, qa, table, or tag"
            ))),
        }
    }
}

/// Who can access a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    Me,
    Team,
}

impl Permission {
    /// Wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Me => "me",
            Self::Team => "team",
        }
    }
}

impl FromStr for Permission {
    type Err = ClientError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "me" => Ok(Self::Me),
            "team" => Ok(Self::Team),
            other => Err(ClientError::invalid_argument(format!(
                "permission value not allowed: '{other}'. Must be 'me' or 'team'"
            ))),
        }
    }
}
