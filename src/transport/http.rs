//! reqwest-backed transport.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::{ChunkStream, ClientFactory, DownloadTransport, DrainError, TransportResponse, drain_bounded};
use crate::api::{ApiRoute, ErrorCode};
use crate::config::ClientProperties;
use crate::error::ClientError;
use crate::model::{ApiResponse, DocumentUpload};
use crate::query::{DocumentQuery, PageQuery};

/// Query string attached to a request.
#[derive(Debug, Clone, Copy)]
pub(crate) enum QueryParams<'a> {
    None,
    Page(&'a PageQuery),
    Documents(&'a DocumentQuery),
}

/// Request body.
#[derive(Debug)]
pub(crate) enum RequestBody {
    Empty,
    Json(Value),
    Multipart(Vec<DocumentUpload>),
}

/// One call against the service API.
#[derive(Debug)]
pub(crate) struct ApiRequest<'a> {
    pub deploy_key: &'a str,
    pub route: ApiRoute,
    pub path_params: &'a [(&'a str, &'a str)],
    pub query: QueryParams<'a>,
    pub body: RequestBody,
}

impl<'a> ApiRequest<'a> {
    pub(crate) fn new(deploy_key: &'a str, route: ApiRoute) -> Self {
        Self {
            deploy_key,
            route,
            path_params: &[],
            query: QueryParams::None,
            body: RequestBody::Empty,
        }
    }

    pub(crate) fn path(mut self, path_params: &'a [(&'a str, &'a str)]) -> Self {
        self.path_params = path_params;
        self
    }

    pub(crate) fn query(mut self, query: QueryParams<'a>) -> Self {
        self.query = query;
        self
    }

    /// Serializes `payload` as the JSON body.
    pub(crate) fn json(mut self, payload: &impl serde::Serialize) -> Result<Self, ClientError> {
        let value =
            serde_json::to_value(payload).map_err(|e| ClientError::serialization(self.route, e))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub(crate) fn multipart(mut self, uploads: Vec<DocumentUpload>) -> Self {
        self.body = RequestBody::Multipart(uploads);
        self
    }
}

/// Sends API requests to the deployment selected by each call's deploy key.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    properties: Arc<ClientProperties>,
    factory: Arc<ClientFactory>,
}

impl HttpTransport {
    /// Creates a transport with its own client cache.
    #[must_use]
    pub fn new(properties: Arc<ClientProperties>) -> Self {
        Self::with_factory(properties, Arc::new(ClientFactory::new()))
    }

    /// Creates a transport that shares `factory` with other transports.
    #[must_use]
    pub fn with_factory(properties: Arc<ClientProperties>, factory: Arc<ClientFactory>) -> Self {
        Self {
            properties,
            factory,
        }
    }

    /// Resolves the deployment, builds the URL and fetches the cached client.
    fn prepare(
        &self,
        deploy_key: &str,
        route: ApiRoute,
        path_params: &[(&str, &str)],
    ) -> Result<(Client, Url, usize), ClientError> {
        let server = self.properties.resolve_server(deploy_key)?;
        let base = server.base_url()?;
        let url = route.resolve_url(&base, path_params)?;
        let client = self.factory.client_for(deploy_key, server)?;
        Ok((client, url, server.codec.effective_max_in_memory_size()))
    }

    /// Sends `request` and unwraps the `{code, message, data}` envelope.
    ///
    /// Returns `Ok(None)` when the service succeeds without a `data` field.
    ///
    /// # Errors
    ///
    /// - [`ClientError::UnknownDeployKey`] before any network call
    /// - [`ClientError::Transport`] / [`ClientError::Timeout`] on network failure
    /// - [`ClientError::Api`] for a non-zero business code or an error status
    /// - [`ClientError::Serialization`] for an undecodable success body
    #[instrument(skip(self, request), fields(deploy_key = request.deploy_key, route = %request.route))]
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        request: ApiRequest<'_>,
    ) -> Result<Option<T>, ClientError> {
        let route = request.route;
        let (client, mut url, max_in_memory_size) =
            self.prepare(request.deploy_key, route, request.path_params)?;
        match request.query {
            QueryParams::None => {}
            QueryParams::Page(query) => query.apply_to(&mut url),
            QueryParams::Documents(query) => query.apply_to(&mut url),
        }

        let mut builder = client.request(route.method(), url);
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(uploads) => builder.multipart(multipart_form(uploads)),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::transport(route, e))?;
        let status = response.status();
        debug!(status = status.as_u16(), "response received");

        let body = drain_bounded(response_stream(response), max_in_memory_size)
            .await
            .map_err(|e| match e {
                DrainError::Read { source } => read_error(route, source),
                DrainError::TooLarge { limit } => ClientError::ResponseTooLarge { route, limit },
            })?;
        decode_envelope(route, status, &body)
    }
}

#[async_trait]
impl DownloadTransport for HttpTransport {
    #[instrument(skip(self, path_params), fields(route = %route))]
    async fn issue_download_request(
        &self,
        deploy_key: &str,
        route: ApiRoute,
        path_params: &[(&str, &str)],
    ) -> Result<TransportResponse, ClientError> {
        let (client, url, _) = self.prepare(deploy_key, route, path_params)?;
        let response = client
            .request(route.method(), url)
            .send()
            .await
            .map_err(|e| ClientError::transport(route, e))?;
        let status = response.status();
        let headers = response.headers().clone();
        debug!(status = status.as_u16(), "download response headers received");
        Ok(TransportResponse::new(status, headers, response_stream(response)))
    }
}

/// Adapts a reqwest body into a [`ChunkStream`].
fn response_stream(response: Response) -> ChunkStream {
    Box::pin(response.bytes_stream().map(|chunk| chunk.map_err(body_error)))
}

fn body_error(error: reqwest::Error) -> io::Error {
    let kind = if error.is_timeout() {
        io::ErrorKind::TimedOut
    } else {
        io::ErrorKind::Other
    };
    io::Error::new(kind, error)
}

// Body read failures surface as io errors wrapping the reqwest error.
fn read_error(route: ApiRoute, source: io::Error) -> ClientError {
    match source.into_inner().map(|inner| inner.downcast::<reqwest::Error>()) {
        Some(Ok(reqwest_error)) => ClientError::transport(route, *reqwest_error),
        Some(Err(other)) => ClientError::BodyRead {
            route,
            source: io::Error::other(other),
        },
        None => ClientError::BodyRead {
            route,
            source: io::Error::other("response body read failed"),
        },
    }
}

fn multipart_form(uploads: Vec<DocumentUpload>) -> Form {
    uploads.into_iter().fold(Form::new(), |form, upload| {
        form.part(
            "file",
            Part::bytes(upload.content.to_vec()).file_name(upload.file_name),
        )
    })
}

/// Decodes the service envelope, mapping failures to [`ClientError`].
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    route: ApiRoute,
    status: StatusCode,
    body: &[u8],
) -> Result<Option<T>, ClientError> {
    let http_failure = || {
        ClientError::api(
            i64::from(status.as_u16()),
            format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ),
        )
    };

    if body.iter().all(u8::is_ascii_whitespace) {
        return if status.is_success() {
            Ok(None)
        } else {
            Err(http_failure())
        };
    }

    let envelope: ApiResponse<T> = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => return Err(ClientError::serialization(route, e)),
        Err(_) => return Err(http_failure()),
    };

    if !envelope.is_ok() {
        let message = envelope
            .message
            .filter(|m| !m.trim().is_empty())
            .or_else(|| ErrorCode::from_code(envelope.code).map(|c| c.description().to_string()))
            .unwrap_or_else(|| format!("service returned code {}", envelope.code));
        return Err(ClientError::api(envelope.code, message));
    }
    if !status.is_success() {
        return Err(http_failure());
    }
    Ok(envelope.data)
}
