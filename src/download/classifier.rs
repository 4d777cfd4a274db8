//! Decides whether a download response is a binary payload or a JSON error.
//!
//! The service may answer a download with `200 OK` and a JSON error body, so
//! the decision looks at the declared content type as well as the status:
//!
//! | status | content type | outcome                                    |
//! |--------|--------------|--------------------------------------------|
//! | 2xx    | not JSON     | success, body handed over untouched        |
//! | 2xx    | JSON         | business error (`code` from body, or 400)  |
//! | other  | JSON         | error, `code`/`message` from body          |
//! | other  | not JSON     | error from status and reason phrase        |
//!
//! Error bodies are buffered up to the deployment's in-memory limit. Failures
//! while buffering or parsing them are folded into the error metadata;
//! classification itself never fails.

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::metadata::DownloadMetadata;
use crate::api::ErrorCode;
use crate::constants::DEFAULT_CONTENT_TYPE;
use crate::model::parse_code;
use crate::transport::{ChunkStream, TransportResponse, drain_bounded};

pub(crate) const UNEXPECTED_ZERO_CODE: &str =
    "Unexpected JSON response with code=0. Expected binary file stream.";
pub(crate) const INVALID_OR_MISSING_CODE: &str =
    "Invalid or missing 'code' in JSON response. Expected binary file stream.";

/// Result of classification.
pub(crate) enum Classification {
    /// Refused download; the body has already been consumed or dropped.
    Failed(DownloadMetadata),
    /// Binary payload with its untouched body.
    Streaming(DownloadMetadata, ChunkStream),
}

impl Classification {
    #[cfg(test)]
    pub(crate) fn metadata(&self) -> &DownloadMetadata {
        match self {
            Self::Failed(metadata) | Self::Streaming(metadata, _) => metadata,
        }
    }
}

/// Classifies download responses for one deployment.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResponseClassifier {
    max_in_memory_size: usize,
}

impl ResponseClassifier {
    pub(crate) fn new(max_in_memory_size: usize) -> Self {
        Self { max_in_memory_size }
    }

    /// Classifies `response`.
    ///
    /// `document_id` names the payload unless `filename` is given and non-blank.
    pub(crate) async fn classify(
        &self,
        response: TransportResponse,
        document_id: &str,
        filename: Option<&str>,
    ) -> Classification {
        let TransportResponse {
            status,
            headers,
            body,
        } = response;
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let json = is_json_content_type(&content_type);
        debug!(
            status = status.as_u16(),
            content_type = %content_type,
            json,
            "classifying download response"
        );

        if !status.is_success() {
            if json {
                return Classification::Failed(self.error_status_json(status, body).await);
            }
            drop(body);
            return Classification::Failed(DownloadMetadata::failure(
                status_code(status),
                format!("HTTP {}: {}", status.as_u16(), reason(status)),
            ));
        }

        if json {
            return Classification::Failed(self.success_status_json(status, body).await);
        }

        let name = filename
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(document_id);
        Classification::Streaming(
            DownloadMetadata::success(name, Some(content_type)),
            body,
        )
    }

    async fn error_status_json(&self, status: StatusCode, body: ChunkStream) -> DownloadMetadata {
        let fallback = format!("HTTP {} {}", status.as_u16(), reason(status));
        let map = match self.read_json_map(status, body).await {
            BodyMap::Parsed(map) => map,
            BodyMap::Empty => return empty_body(status),
            BodyMap::Unusable => return DownloadMetadata::failure(status_code(status), fallback),
        };
        match map.get("code").and_then(parse_code) {
            Some(code) if !ErrorCode::is_ok(code) => {
                DownloadMetadata::failure(code, message_or(&map, fallback))
            }
            Some(_) => {
                warn!(
                    status = status.as_u16(),
                    "error status carried a JSON body with code=0"
                );
                DownloadMetadata::failure(status_code(status), UNEXPECTED_ZERO_CODE)
            }
            None => DownloadMetadata::failure(status_code(status), message_or(&map, fallback)),
        }
    }

    async fn success_status_json(&self, status: StatusCode, body: ChunkStream) -> DownloadMetadata {
        let map = match self.read_json_map(status, body).await {
            BodyMap::Parsed(map) => map,
            BodyMap::Empty => return empty_body(status),
            BodyMap::Unusable => {
                return DownloadMetadata::failure(
                    ErrorCode::BadRequest.code(),
                    INVALID_OR_MISSING_CODE,
                );
            }
        };
        match map.get("code").and_then(parse_code) {
            Some(code) if !ErrorCode::is_ok(code) => {
                let fallback = ErrorCode::from_code(code).map_or_else(
                    || format!("Download rejected with code {code}"),
                    |known| known.description().to_string(),
                );
                DownloadMetadata::failure(code, message_or(&map, fallback))
            }
            Some(_) => {
                warn!("download answered with JSON code=0 instead of a file stream");
                DownloadMetadata::failure(ErrorCode::BadRequest.code(), UNEXPECTED_ZERO_CODE)
            }
            None => {
                warn!("download answered with JSON lacking a usable code");
                DownloadMetadata::failure(ErrorCode::BadRequest.code(), INVALID_OR_MISSING_CODE)
            }
        }
    }

    async fn read_json_map(&self, status: StatusCode, body: ChunkStream) -> BodyMap {
        let bytes = match drain_bounded(body, self.max_in_memory_size).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(status = status.as_u16(), error = %e, "could not buffer JSON error body");
                return BodyMap::Unusable;
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return BodyMap::Empty;
        }
        match serde_json::from_slice::<Map<String, Value>>(&bytes) {
            Ok(map) => BodyMap::Parsed(map),
            Err(e) => {
                warn!(status = status.as_u16(), error = %e, "malformed JSON error body");
                BodyMap::Unusable
            }
        }
    }
}

enum BodyMap {
    Parsed(Map<String, Value>),
    Empty,
    Unusable,
}

/// `application/json` or any `+json` subtype, ignoring case and parameters.
pub(crate) fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.split_once('/') {
        Some(("application", "json")) => true,
        Some((_, subtype)) => subtype.ends_with("+json"),
        None => false,
    }
}

fn empty_body(status: StatusCode) -> DownloadMetadata {
    DownloadMetadata::failure(
        status_code(status),
        format!("HTTP {} with empty response body", status.as_u16()),
    )
}

fn message_or(map: &Map<String, Value>, fallback: String) -> String {
    map.get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.trim().is_empty())
        .map_or(fallback, str::to_string)
}

fn status_code(status: StatusCode) -> i64 {
    i64::from(status.as_u16())
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}
