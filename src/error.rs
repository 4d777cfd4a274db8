//! Error type for dataset and document client operations.
//!
//! Download consumption errors live in [`crate::download::DownloadError`];
//! this type covers everything up to the point a handle is produced.

use thiserror::Error;

use crate::api::ApiRoute;
use crate::config::ConfigError;

/// Errors returned by the dataset and document clients.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No server is configured under the requested deployment key.
    #[error("unknown deploy key '{deploy_key}': no server configured for it")]
    UnknownDeployKey {
        /// The deployment key that failed to resolve.
        deploy_key: String,
    },

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Network-level error (DNS, connection refused, TLS, reset).
    #[error("network error calling {route}: {source}")]
    Transport {
        /// The route that failed.
        route: ApiRoute,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before the service answered.
    #[error("timeout calling {route}")]
    Timeout {
        /// The route that timed out.
        route: ApiRoute,
    },

    /// The service answered with a non-zero business code.
    #[error("service error {code}: {message}")]
    Api {
        /// Business (or HTTP status) code.
        code: i64,
        /// Message reported by the service.
        message: String,
    },

    /// The response body could not be read after headers arrived.
    #[error("failed reading response body for {route}: {source}")]
    BodyRead {
        /// The route whose body failed.
        route: ApiRoute,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The response body exceeded the deployment's in-memory limit.
    #[error("response body for {route} exceeds {limit} bytes")]
    ResponseTooLarge {
        /// The route whose body was too large.
        route: ApiRoute,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The service reported success but omitted the expected `data` field.
    #[error("response for {route} carried no data")]
    MissingData {
        /// The route whose response was empty.
        route: ApiRoute,
    },

    /// A caller-supplied argument was rejected before any request was sent.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the argument.
        message: String,
    },

    /// A request or response body could not be (de)serialized.
    #[error("malformed payload for {route}: {source}")]
    Serialization {
        /// The route whose payload failed.
        route: ApiRoute,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A parsing-status lookup found no document with the given id.
    #[error("document '{document_id}' not found in dataset '{dataset_id}'")]
    DocumentNotFound {
        /// Dataset that was searched.
        dataset_id: String,
        /// Document id that was not found.
        document_id: String,
    },

    /// The HTTP client for a deployment could not be built.
    #[error("failed to build HTTP client for deploy key '{deploy_key}': {source}")]
    ClientBuild {
        /// The deployment key whose client failed to build.
        deploy_key: String,
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// The runtime backing the blocking clients could not be started.
    #[error("failed to start blocking client runtime: {source}")]
    Runtime {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// Creates an unknown deploy key error.
    pub fn unknown_deploy_key(deploy_key: impl Into<String>) -> Self {
        Self::UnknownDeployKey {
            deploy_key: deploy_key.into(),
        }
    }

    /// Maps a reqwest error into [`ClientError::Timeout`] or [`ClientError::Transport`].
    #[must_use]
    pub fn transport(route: ApiRoute, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { route }
        } else {
            Self::Transport { route, source }
        }
    }

    /// Creates a business error.
    pub fn api(code: i64, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(route: ApiRoute, source: serde_json::Error) -> Self {
        Self::Serialization { route, source }
    }

    /// Creates a document-not-found error.
    pub fn document_not_found(
        dataset_id: impl Into<String>,
        document_id: impl Into<String>,
    ) -> Self {
        Self::DocumentNotFound {
            dataset_id: dataset_id.into(),
            document_id: document_id.into(),
        }
    }

    /// Returns the business code when this is an [`ClientError::Api`] error.
    #[must_use]
    pub fn api_code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
