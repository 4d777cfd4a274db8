//! Error types for consuming a download handle.

use std::io;

use thiserror::Error;

/// Errors raised while consuming a [`DownloadHandle`](super::DownloadHandle).
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The service refused the download; carries the business code and message.
    #[error("Download failed: {message} (code {code})")]
    Failed {
        /// Business (or HTTP status) code.
        code: i64,
        /// Message reported by the service.
        message: String,
    },

    /// The handle's body was already handed out.
    #[error("download body already consumed; a handle can be consumed only once")]
    AlreadyConsumed,

    /// The handle or reader was closed.
    #[error("download handle is closed")]
    Closed,

    /// The upstream body failed after consumption started.
    #[error("download stream failed: {source}")]
    Stream {
        /// The upstream error.
        #[source]
        source: io::Error,
    },

    /// Writing to the caller's sink failed.
    #[error("failed writing download to sink: {source}")]
    Sink {
        /// The sink error.
        #[source]
        source: io::Error,
    },
}

impl DownloadError {
    /// Creates a business failure error.
    pub fn failed(code: i64, message: impl Into<String>) -> Self {
        Self::Failed {
            code,
            message: message.into(),
        }
    }

    /// Creates an upstream stream error.
    #[must_use]
    pub fn stream(source: io::Error) -> Self {
        Self::Stream { source }
    }

    /// Creates a sink write error.
    #[must_use]
    pub fn sink(source: io::Error) -> Self {
        Self::Sink { source }
    }

    /// Returns true for misuse errors (second consumption, use after close).
    #[must_use]
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::AlreadyConsumed | Self::Closed)
    }
}

impl From<DownloadError> for io::Error {
    fn from(error: DownloadError) -> Self {
        let kind = match &error {
            DownloadError::Stream { source } | DownloadError::Sink { source } => source.kind(),
            DownloadError::Closed => io::ErrorKind::BrokenPipe,
            DownloadError::Failed { .. } | DownloadError::AlreadyConsumed => io::ErrorKind::Other,
        };
        io::Error::new(kind, error)
    }
}
