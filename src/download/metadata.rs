//! Immutable description of a classified download.

use crate::api::ErrorCode;

/// Outcome of classifying a download response.
///
/// `code == 0` exactly when the handle carries a binary payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadMetadata {
    code: i64,
    message: String,
    filename: Option<String>,
    content_type: Option<String>,
}

impl DownloadMetadata {
    /// Metadata for a successful binary payload.
    pub(crate) fn success(filename: impl Into<String>, content_type: Option<String>) -> Self {
        Self {
            code: ErrorCode::Ok.code(),
            message: "OK".to_string(),
            filename: Some(filename.into()),
            content_type,
        }
    }

    /// Metadata for a refused download. A zero `code` is coerced to 400.
    pub(crate) fn failure(code: i64, message: impl Into<String>) -> Self {
        let code = if ErrorCode::is_ok(code) {
            ErrorCode::BadRequest.code()
        } else {
            code
        };
        Self {
            code,
            message: message.into(),
            filename: None,
            content_type: None,
        }
    }

    /// Business code; `0` on success.
    #[must_use]
    pub fn code(&self) -> i64 {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Caller-supplied file name, or the document id.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// `Content-Type` reported with the payload.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        ErrorCode::is_ok(self.code)
    }
}
