//! HTTP transport seam.
//!
//! [`DownloadTransport`] is the only thing the download path needs from the
//! network: status, headers and a lazy [`ChunkStream`]. [`HttpTransport`] is
//! the reqwest-backed implementation and also carries the JSON/multipart
//! request plumbing used by the dataset and document clients.

mod factory;
mod http;

pub use factory::ClientFactory;
pub use http::HttpTransport;
pub(crate) use http::{ApiRequest, QueryParams};

use std::fmt;
use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use thiserror::Error;

use crate::api::ApiRoute;
use crate::error::ClientError;

/// Lazy sequence of body chunks. Dropping it cancels the underlying request.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

/// Status, headers and the undrained body of a response.
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ChunkStream,
}

impl TransportResponse {
    /// Bundles a response from its parts.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: ChunkStream) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Issues download requests and hands back the streamed response.
///
/// Implementations must not buffer the body; connect and timeout failures
/// are reported as `Err` before any response exists.
#[async_trait]
pub trait DownloadTransport: Send + Sync {
    /// Sends `route` to the server configured under `deploy_key`.
    async fn issue_download_request(
        &self,
        deploy_key: &str,
        route: ApiRoute,
        path_params: &[(&str, &str)],
    ) -> Result<TransportResponse, ClientError>;
}

/// Why a body could not be buffered.
#[derive(Debug, Error)]
pub(crate) enum DrainError {
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("failed reading response body: {source}")]
    Read {
        #[source]
        source: io::Error,
    },
}

/// Collects `body` into memory, failing once more than `limit` bytes arrive.
pub(crate) async fn drain_bounded(mut body: ChunkStream, limit: usize) -> Result<Bytes, DrainError> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|source| DrainError::Read { source })?;
        if buffer.len() + chunk.len() > limit {
            return Err(DrainError::TooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.freeze())
}
